use super::{ClusterFactory, HarnessConfig, ScenarioOutcome, TestCase, TestContext};
use crate::core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Level, event, info_span};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub outcome: Option<ScenarioOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|case| case.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|case| !case.passed)
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.name == name)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            let status = if case.passed { "PASS" } else { "FAIL" };
            write!(f, "{:<4} {:<28} {:>7}ms", status, case.name, case.elapsed_ms)?;
            if let Some(error) = &case.error {
                write!(f, "  {}", error)?;
            }
            writeln!(f)?;
        }
        let failed = self.failed().count();
        write!(
            f,
            "{} passed, {} failed ({} .. {})",
            self.cases.len() - failed,
            failed,
            self.started_at.format("%H:%M:%S%.3f"),
            self.finished_at.format("%H:%M:%S%.3f")
        )
    }
}

/// Runs cases one after another, each against its own cluster.
///
/// A failing case never stops the suite; its error is recorded and the next case
/// starts from a fresh setup.
pub struct SuiteRunner {
    factory: Arc<dyn ClusterFactory>,
    config: HarnessConfig,
}

impl SuiteRunner {
    pub fn new(factory: Arc<dyn ClusterFactory>, config: HarnessConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub async fn run(&self, cases: &[TestCase]) -> SuiteReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            let span = info_span!("case", name = case.name);
            let report = self.run_case(case).instrument(span).await;
            reports.push(report);
        }
        SuiteReport {
            started_at,
            finished_at: Utc::now(),
            cases: reports,
        }
    }

    async fn run_case(&self, case: &TestCase) -> CaseReport {
        let started = Instant::now();
        let result = self.execute(case).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(outcome) => {
                event!(Level::INFO, elapsed_ms, "case passed");
                CaseReport {
                    name: case.name.to_string(),
                    passed: true,
                    error: None,
                    elapsed_ms,
                    outcome: Some(outcome),
                }
            }
            Err(err) => {
                event!(Level::ERROR, elapsed_ms, error = %err, "case failed");
                CaseReport {
                    name: case.name.to_string(),
                    passed: false,
                    error: Some(err.to_string()),
                    elapsed_ms,
                    outcome: None,
                }
            }
        }
    }

    async fn execute(&self, case: &TestCase) -> Result<ScenarioOutcome> {
        let mut ctx = TestContext::setup(self.factory.as_ref(), &self.config).await?;
        let result = (case.run)(&mut ctx).await;
        let teardown = ctx.teardown().await;
        match (result, teardown) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(teardown_err)) => {
                event!(Level::WARN, error = %teardown_err, "teardown after failed case");
                Err(err)
            }
        }
    }
}
