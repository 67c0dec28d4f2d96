use async_trait::async_trait;
use futures::future::BoxFuture;
use routecheck::cluster::{
    ControlPlane, ManagedCluster, QueryExecutor, ReadRoutingFault, SimulatedCluster,
    SimulatedClusterConfig,
};
use routecheck::harness::{
    CaseReport, ClusterFactory, HarnessConfig, ScenarioOutcome, SimulatedClusterFactory,
    SuiteReport, SuiteRunner, TestCase, TestContext, default_suite,
};
use routecheck::{
    ConsistencyLevel, ConsistencyLevelDispatcher, HarnessError, Result, RoutingPolicy,
};
use std::sync::Arc;
use std::time::Duration;

fn config() -> HarnessConfig {
    HarnessConfig::default()
        .table_name("test_consistency")
        .num_rows(200)
        .num_ops(100)
        .convergence_rounds(3)
        .convergence_timeout(Duration::from_secs(5))
        .replication_lag(Duration::from_millis(20))
}

async fn run_suite(factory: SimulatedClusterFactory, config: HarnessConfig) -> SuiteReport {
    SuiteRunner::new(Arc::new(factory), config)
        .run(&default_suite())
        .await
}

fn case<'a>(report: &'a SuiteReport, name: &str) -> &'a CaseReport {
    report
        .case(name)
        .unwrap_or_else(|| panic!("case {name} missing from report"))
}

#[tokio::test]
async fn default_suite_passes_on_correct_routing() {
    let report = run_suite(SimulatedClusterFactory::new(), config()).await;
    assert!(report.all_passed(), "{report}");
    assert_eq!(report.cases.len(), 3);
    assert!(report.finished_at >= report.started_at);

    let leader = case(&report, "read_from_leader").outcome.clone().unwrap();
    assert_eq!(
        leader.verifications[0].policy,
        ConsistencyLevelDispatcher::classify(ConsistencyLevel::LocalOne)
    );
    assert_eq!(
        leader.verifications[0].policy,
        ConsistencyLevelDispatcher::classify(ConsistencyLevel::Quorum)
    );
    assert_eq!(leader.verifications[0].observed_total, 100);

    let followers = case(&report, "read_from_followers").outcome.clone().unwrap();
    assert_eq!(followers.convergence.len(), 3);
    assert!(followers.convergence.iter().all(|poll| poll.succeeded()));
    assert_eq!(
        followers.verifications[0].policy,
        ConsistencyLevelDispatcher::classify(ConsistencyLevel::One)
    );
    assert_eq!(followers.verifications[0].policy, RoutingPolicy::AnyReplica);

    let invalid = case(&report, "invalid_consistency_levels").outcome.clone().unwrap();
    assert_eq!(invalid.rejected_levels.len(), 8);
}

#[tokio::test]
async fn leader_reads_on_follower_are_detected() {
    let report = run_suite(
        SimulatedClusterFactory::with_fault(ReadRoutingFault::LeaderReadsOnFollower),
        config().replication_lag(Duration::ZERO),
    )
    .await;
    let leader = case(&report, "read_from_leader");
    assert!(!leader.passed);
    assert!(
        leader.error.as_deref().unwrap().contains("Routing violation"),
        "{:?}",
        leader.error
    );
    assert!(case(&report, "invalid_consistency_levels").passed);
    assert!(!report.all_passed());
}

#[tokio::test]
async fn pinned_any_replica_reads_are_detected() {
    let report = run_suite(
        SimulatedClusterFactory::with_fault(ReadRoutingFault::AnyReadsPinnedToLeader),
        config(),
    )
    .await;
    assert!(case(&report, "read_from_leader").passed);
    let followers = case(&report, "read_from_followers");
    assert!(!followers.passed);
    assert!(followers.error.as_deref().unwrap().contains("Routing violation"));
}

#[tokio::test]
async fn served_unsupported_levels_are_detected() {
    let report = run_suite(
        SimulatedClusterFactory::with_fault(ReadRoutingFault::AcceptUnsupportedLevels),
        config(),
    )
    .await;
    let invalid = case(&report, "invalid_consistency_levels");
    assert!(!invalid.passed);
    assert!(invalid.error.as_deref().unwrap().contains("must be rejected"));
    assert_eq!(report.failed().count(), 1);
}

#[tokio::test]
async fn followers_case_runs_against_a_prepared_context() {
    let mut ctx = TestContext::setup(&SimulatedClusterFactory::new(), &config())
        .await
        .unwrap();
    assert_eq!(ctx.tablet.replication_factor(), 3);

    let rows = ctx
        .read_all_rows(routecheck::ConsistencyLevel::Quorum)
        .await
        .unwrap();
    assert_eq!(rows, 200);

    let outcome = (default_suite()[1].run)(&mut ctx).await.unwrap();
    assert_eq!(outcome.verifications[0].total_ops_issued, 100);
    ctx.teardown().await.unwrap();
}

/// A factory whose clusters never come up.
struct FailingFactory;

#[async_trait]
impl ClusterFactory for FailingFactory {
    async fn start(&self, _config: &HarnessConfig) -> Result<Box<dyn ManagedCluster>> {
        Err(HarnessError::Connectivity("cluster unreachable".to_string()))
    }
}

#[tokio::test]
async fn setup_failure_is_reported_per_case() {
    let cases: Vec<TestCase> = default_suite().into_iter().take(2).collect();
    let report = SuiteRunner::new(Arc::new(FailingFactory), config())
        .run(&cases)
        .await;
    assert_eq!(report.cases.len(), 2);
    for case in &report.cases {
        assert!(!case.passed);
        assert!(case.error.as_deref().unwrap().contains("cluster unreachable"));
        assert!(case.outcome.is_none());
    }
}

#[tokio::test]
async fn invalid_config_fails_setup() {
    let err = TestContext::setup(&SimulatedClusterFactory::new(), &config().num_ops(0))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, HarnessError::ConfigError(_)));
}

#[tokio::test]
async fn zero_convergence_rounds_fails_setup() {
    let err = TestContext::setup(
        &SimulatedClusterFactory::new(),
        &config().convergence_rounds(0),
    )
    .await
    .err()
    .unwrap();
    assert!(
        matches!(err, HarnessError::ConfigError(ref msg) if msg.contains("convergence_rounds"))
    );
}

/// A reference cluster whose shutdown always fails after stopping the real one.
struct StubbornCluster(SimulatedCluster);

#[async_trait]
impl ManagedCluster for StubbornCluster {
    fn control_plane(&self) -> Arc<dyn ControlPlane> {
        self.0.control_plane()
    }

    fn executor(&self) -> Arc<dyn QueryExecutor> {
        self.0.executor()
    }

    async fn shutdown(&self) -> Result<()> {
        self.0.shutdown().await?;
        Err(HarnessError::Connectivity("teardown refused".to_string()))
    }
}

struct StubbornFactory;

#[async_trait]
impl ClusterFactory for StubbornFactory {
    async fn start(&self, config: &HarnessConfig) -> Result<Box<dyn ManagedCluster>> {
        let cluster = SimulatedCluster::start(
            SimulatedClusterConfig::new(config.replication_factor)
                .replication_lag(config.replication_lag_duration()),
        )
        .await?;
        Ok(Box::new(StubbornCluster(cluster)))
    }
}

fn failing_body(_ctx: &mut TestContext) -> BoxFuture<'_, Result<ScenarioOutcome>> {
    Box::pin(async { Err(HarnessError::ExecutionError("body failed".to_string())) })
}

fn passing_body(_ctx: &mut TestContext) -> BoxFuture<'_, Result<ScenarioOutcome>> {
    Box::pin(async { Ok(ScenarioOutcome::default()) })
}

#[tokio::test]
async fn body_error_wins_over_teardown_error() {
    let cases = [
        TestCase::new("failing_body", failing_body),
        TestCase::new("passing_body", passing_body),
    ];
    let report = SuiteRunner::new(Arc::new(StubbornFactory), config().num_rows(5))
        .run(&cases)
        .await;

    let failing = case(&report, "failing_body");
    assert!(!failing.passed);
    let error = failing.error.as_deref().unwrap();
    assert!(error.contains("body failed"), "{error}");
    assert!(!error.contains("teardown refused"), "{error}");

    // With a clean body the teardown failure is the case's error.
    let passing = case(&report, "passing_body");
    assert!(!passing.passed);
    assert!(passing.error.as_deref().unwrap().contains("teardown refused"));
}

#[tokio::test]
async fn too_few_ops_for_spread_is_a_config_error() {
    let report = SuiteRunner::new(
        Arc::new(SimulatedClusterFactory::new()),
        config().num_ops(20),
    )
    .run(&default_suite()[1..2])
    .await;
    let followers = case(&report, "read_from_followers");
    assert!(followers.error.as_deref().unwrap().contains("Configuration error"));
}

#[test]
fn report_renders_one_line_per_case() {
    let report = SuiteReport {
        started_at: chrono::Utc::now(),
        finished_at: chrono::Utc::now(),
        cases: vec![
            CaseReport {
                name: "read_from_leader".to_string(),
                passed: true,
                error: None,
                elapsed_ms: 12,
                outcome: None,
            },
            CaseReport {
                name: "read_from_followers".to_string(),
                passed: false,
                error: Some("boom".to_string()),
                elapsed_ms: 34,
                outcome: None,
            },
        ],
    };
    let rendered = report.to_string();
    assert!(rendered.contains("PASS read_from_leader"));
    assert!(rendered.contains("FAIL read_from_followers"));
    assert!(rendered.contains("boom"));
    assert!(rendered.contains("1 passed, 1 failed"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["cases"][1]["error"], "boom");
}
