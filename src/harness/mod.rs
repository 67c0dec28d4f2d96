pub mod config;
pub mod context;
pub mod runner;
pub mod scenarios;

pub use config::HarnessConfig;
pub use context::{ClusterFactory, SimulatedClusterFactory, TestContext, test_table_schema};
pub use runner::{CaseReport, SuiteReport, SuiteRunner};
pub use scenarios::{
    CaseFn, ScenarioOutcome, TestCase, default_suite, invalid_consistency_levels,
    read_from_followers, read_from_leader,
};
