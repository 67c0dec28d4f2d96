use crate::cluster::TSERVER_READ_METRIC;
use crate::core::{HarnessError, Result};
use crate::routing::SpreadThreshold;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Harness run configuration.
///
/// Loaded from JSON (missing keys take defaults) and adjusted with the builder methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Table created by each test case.
    pub table_name: String,

    /// Rows inserted during setup.
    pub num_rows: usize,

    /// Reads issued per verification step.
    pub num_ops: u64,

    /// Expected replicas of the single tablet.
    pub replication_factor: usize,

    /// Budget for one convergence wait.
    pub convergence_timeout_ms: u64,

    /// Successful convergence waits required before any-replica reads are counted.
    pub convergence_rounds: u32,

    pub poll_initial_interval_ms: u64,
    pub poll_max_interval_ms: u64,

    /// Counter read from every replica's diagnostics endpoint.
    pub metric_name: String,

    pub metric_timeout_ms: u64,

    /// Attempts at collecting counters before a connectivity failure is final.
    pub metric_fetch_attempts: u32,

    /// Each replica must serve more than `num_ops / min_share_divisor` any-replica reads.
    pub min_share_divisor: u64,

    /// Smallest `num_ops` for which the spread check is meaningful.
    pub min_spread_ops: u64,

    /// Follower lag of the reference cluster.
    pub replication_lag_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            table_name: "test_consistency".to_string(),
            num_rows: 1000,
            num_ops: 100,
            replication_factor: 3,
            convergence_timeout_ms: 10_000,
            convergence_rounds: 10,
            poll_initial_interval_ms: 25,
            poll_max_interval_ms: 400,
            metric_name: TSERVER_READ_METRIC.to_string(),
            metric_timeout_ms: 5_000,
            metric_fetch_attempts: 3,
            min_share_divisor: 10,
            min_spread_ops: 100,
            replication_lag_ms: 50,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            HarnessError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }

    pub fn num_rows(mut self, rows: usize) -> Self {
        self.num_rows = rows;
        self
    }

    pub fn num_ops(mut self, ops: u64) -> Self {
        self.num_ops = ops;
        self
    }

    pub fn replication_factor(mut self, replication_factor: usize) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    pub fn convergence_timeout(mut self, timeout: Duration) -> Self {
        self.convergence_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn convergence_rounds(mut self, rounds: u32) -> Self {
        self.convergence_rounds = rounds;
        self
    }

    pub fn metric_name(mut self, metric: &str) -> Self {
        self.metric_name = metric.to_string();
        self
    }

    pub fn min_share_divisor(mut self, divisor: u64) -> Self {
        self.min_share_divisor = divisor;
        self
    }

    pub fn replication_lag(mut self, lag: Duration) -> Self {
        self.replication_lag_ms = lag.as_millis() as u64;
        self
    }

    pub fn convergence_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout_ms)
    }

    pub fn poll_initial_interval(&self) -> Duration {
        Duration::from_millis(self.poll_initial_interval_ms)
    }

    pub fn poll_max_interval(&self) -> Duration {
        Duration::from_millis(self.poll_max_interval_ms)
    }

    pub fn metric_timeout(&self) -> Duration {
        Duration::from_millis(self.metric_timeout_ms)
    }

    pub fn replication_lag_duration(&self) -> Duration {
        Duration::from_millis(self.replication_lag_ms)
    }

    pub fn spread_threshold(&self) -> SpreadThreshold {
        SpreadThreshold {
            min_share_divisor: self.min_share_divisor,
            min_total_ops: self.min_spread_ops,
            min_replicas: self.replication_factor.min(3),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "table_name cannot be empty".to_string(),
            ));
        }
        if self.num_rows == 0 {
            return Err(HarnessError::ConfigError("num_rows must be > 0".to_string()));
        }
        if self.num_ops == 0 {
            return Err(HarnessError::ConfigError("num_ops must be > 0".to_string()));
        }
        if self.replication_factor == 0 {
            return Err(HarnessError::ConfigError(
                "replication_factor must be > 0".to_string(),
            ));
        }
        if self.convergence_rounds == 0 {
            return Err(HarnessError::ConfigError(
                "convergence_rounds must be > 0".to_string(),
            ));
        }
        if self.poll_initial_interval_ms == 0 {
            return Err(HarnessError::ConfigError(
                "poll_initial_interval_ms must be > 0".to_string(),
            ));
        }
        if self.poll_max_interval_ms < self.poll_initial_interval_ms {
            return Err(HarnessError::ConfigError(
                "poll_max_interval_ms cannot be below poll_initial_interval_ms".to_string(),
            ));
        }
        if self.metric_name.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "metric_name cannot be empty".to_string(),
            ));
        }
        if self.metric_fetch_attempts == 0 {
            return Err(HarnessError::ConfigError(
                "metric_fetch_attempts must be > 0".to_string(),
            ));
        }
        if self.min_share_divisor == 0 {
            return Err(HarnessError::ConfigError(
                "min_share_divisor must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
