use super::HarnessConfig;
use crate::cluster::{
    ColumnSchema, ColumnType, CreateTableOptions, ManagedCluster, QueryExecutor,
    ReadRoutingFault, SimulatedCluster, SimulatedClusterConfig, SortOrder, Statement,
    TableSchema, TableType,
};
use crate::convergence::ConvergenceWaiter;
use crate::core::{HarnessError, ObservedCounters, Result, Tablet};
use crate::metrics::{MetricPoller, MetricPollerConfig};
use crate::routing::{ConsistencyLevel, RoutingVerifier};
use crate::topology::ClusterTopologyModel;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{Level, event};

/// Starts a fresh cluster for each test case.
#[async_trait]
pub trait ClusterFactory: Send + Sync {
    async fn start(&self, config: &HarnessConfig) -> Result<Box<dyn ManagedCluster>>;
}

/// Builds reference clusters sized from the harness config.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClusterFactory {
    read_fault: ReadRoutingFault,
}

impl SimulatedClusterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(read_fault: ReadRoutingFault) -> Self {
        Self { read_fault }
    }
}

#[async_trait]
impl ClusterFactory for SimulatedClusterFactory {
    async fn start(&self, config: &HarnessConfig) -> Result<Box<dyn ManagedCluster>> {
        let cluster_config = SimulatedClusterConfig::new(config.replication_factor)
            .replication_lag(config.replication_lag_duration())
            .read_fault(self.read_fault);
        let cluster = SimulatedCluster::start(cluster_config).await?;
        Ok(Box::new(cluster))
    }
}

/// Schema of the table every case reads: `h` hash key, `r` ascending range key, `k`.
pub fn test_table_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSchema::new("h", ColumnType::Int32).hash_key(),
        ColumnSchema::new("r", ColumnType::Int32).range_key(SortOrder::Ascending),
        ColumnSchema::new("k", ColumnType::Int32),
    ])
}

/// Everything one test case needs, produced by `setup` and consumed by `teardown`.
pub struct TestContext {
    pub config: HarnessConfig,
    pub cluster: Box<dyn ManagedCluster>,
    pub executor: Arc<dyn QueryExecutor>,
    pub topology: ClusterTopologyModel,
    pub poller: MetricPoller,
    pub waiter: ConvergenceWaiter,
    pub verifier: RoutingVerifier,
    /// Snapshot taken at setup; cases re-discover before relying on roles.
    pub tablet: Tablet,
}

impl TestContext {
    /// Starts a cluster, creates the single-tablet table and inserts `num_rows` rows.
    pub async fn setup(factory: &dyn ClusterFactory, config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        let poller_config = MetricPollerConfig::default().request_timeout(config.metric_timeout());
        let poller = MetricPoller::new(poller_config)?;
        let verifier = RoutingVerifier::new(config.spread_threshold())?;

        let cluster = factory.start(config).await?;
        let prepared = Self::prepare(cluster.as_ref(), config).await;
        match prepared {
            Ok((executor, topology, tablet)) => Ok(Self {
                config: config.clone(),
                executor,
                topology,
                poller,
                waiter: ConvergenceWaiter::new(
                    config.poll_initial_interval(),
                    config.poll_max_interval(),
                ),
                verifier,
                tablet,
                cluster,
            }),
            Err(err) => {
                if let Err(shutdown_err) = cluster.shutdown().await {
                    event!(Level::WARN, error = %shutdown_err, "shutdown after failed setup");
                }
                Err(err)
            }
        }
    }

    async fn prepare(
        cluster: &dyn ManagedCluster,
        config: &HarnessConfig,
    ) -> Result<(Arc<dyn QueryExecutor>, ClusterTopologyModel, Tablet)> {
        let control_plane = cluster.control_plane();
        let executor = cluster.executor();
        let schema = test_table_schema();
        control_plane
            .create_table(
                &config.table_name,
                &schema,
                &CreateTableOptions::default()
                    .num_tablets(1)
                    .table_type(TableType::Yql),
            )
            .await?;

        let topology = ClusterTopologyModel::new(control_plane);
        let tablet = topology
            .discover_with_replication(&config.table_name, config.replication_factor)
            .await?;

        let columns = schema.column_names();
        for idx in 0..config.num_rows as i64 {
            let insert =
                Statement::insert(&config.table_name, columns.clone(), vec![idx, idx, idx]);
            executor.execute(&insert, ConsistencyLevel::Quorum).await?;
        }
        event!(
            Level::INFO,
            table = %config.table_name,
            tablet = %tablet.id,
            rows = config.num_rows,
            "test table ready"
        );
        Ok((executor, topology, tablet))
    }

    /// Fresh topology snapshot for the current phase.
    pub async fn rediscover(&mut self) -> Result<&Tablet> {
        self.tablet = self
            .topology
            .discover_with_replication(&self.config.table_name, self.config.replication_factor)
            .await?;
        Ok(&self.tablet)
    }

    /// Reads the configured counter from every replica of `tablet`, retrying transient
    /// failures up to `metric_fetch_attempts` times.
    pub async fn collect_counters(&self, tablet: &Tablet) -> Result<ObservedCounters> {
        let attempts = self.config.metric_fetch_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .poller
                .fetch_all(&tablet.replicas, &self.config.metric_name)
                .await
            {
                Ok(counters) => return Ok(counters),
                Err(err) if err.is_transient() && attempt < attempts => {
                    event!(
                        Level::WARN,
                        attempt,
                        error = %err,
                        "counter collection failed, retrying"
                    );
                    sleep(self.config.poll_initial_interval()).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Issues one full-table read and checks the returned row count.
    pub async fn read_all_rows(&self, level: ConsistencyLevel) -> Result<usize> {
        let statement = Statement::select_all(&self.config.table_name);
        let outcome = self.executor.execute(&statement, level).await?;
        if outcome.row_count != self.config.num_rows {
            return Err(HarnessError::RowCountMismatch {
                level: level.to_string(),
                expected: self.config.num_rows,
                actual: outcome.row_count,
            });
        }
        Ok(outcome.row_count)
    }

    pub async fn teardown(self) -> Result<()> {
        self.cluster.shutdown().await
    }
}
