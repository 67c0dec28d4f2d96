use anyhow::{Context, bail};
use clap::Parser;
use routecheck::{HarnessConfig, SimulatedClusterFactory, SuiteRunner, TestCase, default_suite};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "routecheck")]
#[command(about = "Checks read routing per consistency level against a replicated tablet")]
struct Args {
    /// JSON harness config; missing keys take defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    replication_factor: Option<usize>,
    #[arg(long)]
    rows: Option<usize>,
    #[arg(long)]
    ops: Option<u64>,
    #[arg(long)]
    replication_lag_ms: Option<u64>,
    /// Run only the named case; repeatable.
    #[arg(long)]
    only: Vec<String>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("routecheck=info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let cases = select_cases(&args.only)?;

    let runner = SuiteRunner::new(Arc::new(SimulatedClusterFactory::new()), config);
    let report = runner.run(&cases).await;

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("serialize suite report")?;
        println!("{rendered}");
    } else {
        println!("{report}");
    }

    if !report.all_passed() {
        bail!("{} case(s) failed", report.failed().count());
    }
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("load config from {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    if let Some(rf) = args.replication_factor {
        config = config.replication_factor(rf);
    }
    if let Some(rows) = args.rows {
        config = config.num_rows(rows);
    }
    if let Some(ops) = args.ops {
        config = config.num_ops(ops);
    }
    if let Some(lag) = args.replication_lag_ms {
        config.replication_lag_ms = lag;
    }
    config.validate().context("invalid harness config")?;
    Ok(config)
}

fn select_cases(only: &[String]) -> anyhow::Result<Vec<TestCase>> {
    let suite = default_suite();
    if only.is_empty() {
        return Ok(suite);
    }
    let mut selected = Vec::with_capacity(only.len());
    for name in only {
        match suite.iter().find(|case| case.name == name.as_str()) {
            Some(case) => selected.push(*case),
            None => bail!(
                "unknown case '{}' (known: {})",
                name,
                suite.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
            ),
        }
    }
    Ok(selected)
}
