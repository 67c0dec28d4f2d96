//! Collaborator interfaces the harness drives, plus an in-process reference cluster
//! implementing all of them.

pub mod control_plane;
pub mod diagnostics;
pub mod executor;
pub mod simulated;

pub use control_plane::{
    ColumnKind, ColumnSchema, ColumnType, ControlPlane, CreateTableOptions, ReplicaLocation,
    SortOrder, TableSchema, TableType, TabletLocation,
};
pub use diagnostics::{MetricEntity, MetricSample, NodeMetrics, TSERVER_READ_METRIC};
pub use executor::{QueryExecutor, QueryOutcome, Statement};
pub use simulated::{
    ReadRoutingFault, SimulatedCluster, SimulatedClusterConfig, TabletLeadershipChange,
    stable_tablet_for,
};

use crate::core::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A running cluster handed to one test case and shut down after it.
#[async_trait]
pub trait ManagedCluster: Send + Sync {
    fn control_plane(&self) -> Arc<dyn ControlPlane>;

    fn executor(&self) -> Arc<dyn QueryExecutor>;

    async fn shutdown(&self) -> Result<()>;
}
