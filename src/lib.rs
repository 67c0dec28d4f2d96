// ============================================================================
// routecheck: consistency-level read routing checks
// ============================================================================

pub mod cluster;
pub mod convergence;
pub mod core;
pub mod harness;
pub mod metrics;
pub mod routing;
pub mod topology;

pub use convergence::{ConvergencePredicate, ConvergenceWaiter, PollOutcome, RowCountPredicate};
pub use core::{HarnessError, HostPort, ObservedCounters, Replica, ReplicaRole, Result, Tablet};
pub use harness::{
    ClusterFactory, HarnessConfig, SimulatedClusterFactory, SuiteReport, SuiteRunner, TestCase,
    TestContext, default_suite,
};
pub use metrics::{MetricPoller, MetricPollerConfig};
pub use routing::{
    ConsistencyLevel, ConsistencyLevelDispatcher, RoutingPolicy, RoutingVerifier, SpreadThreshold,
    VerificationResult,
};
pub use topology::ClusterTopologyModel;
