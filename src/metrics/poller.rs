use super::payload::{MetricScope, extract_metric};
use crate::core::{HarnessError, ObservedCounters, Replica, Result};
use futures::future::join_all;
use reqwest::header::CACHE_CONTROL;
use std::time::Duration;
use tracing::{Level, event};

#[derive(Debug, Clone)]
pub struct MetricPollerConfig {
    /// `http` or `https`.
    pub scheme: String,
    pub path: String,
    /// Bound on a whole request, connect included.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for MetricPollerConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            path: "/metrics".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl MetricPollerConfig {
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(HarnessError::ConfigError(format!(
                "unsupported diagnostics scheme '{}'",
                self.scheme
            )));
        }
        if !self.path.starts_with('/') {
            return Err(HarnessError::ConfigError(format!(
                "diagnostics path '{}' must start with '/'",
                self.path
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(HarnessError::ConfigError(
                "request_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads named counters from replicas' diagnostics endpoints.
///
/// Every fetch is a fresh request over a fresh connection; nothing is cached and
/// nothing is retried here. Retrying transient failures is the caller's decision.
#[derive(Debug, Clone)]
pub struct MetricPoller {
    client: reqwest::Client,
    config: MetricPollerConfig,
}

impl MetricPoller {
    pub fn new(config: MetricPollerConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| HarnessError::ConfigError(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self, replica: &Replica) -> String {
        format!(
            "{}://{}{}",
            self.config.scheme,
            replica.diagnostics_address(),
            self.config.path
        )
    }

    /// Per-node value of `metric`: summed over the node's tablets, or read from the
    /// server entity when the node publishes it there.
    pub async fn fetch(&self, replica: &Replica, metric: &str) -> Result<u64> {
        self.fetch_scoped(replica, metric, &MetricScope::Node).await
    }

    /// Value of `metric` for a single tablet on the replica's node.
    pub async fn fetch_tablet(
        &self,
        replica: &Replica,
        tablet_id: &str,
        metric: &str,
    ) -> Result<u64> {
        let scope = MetricScope::Tablet(tablet_id.to_string());
        self.fetch_scoped(replica, metric, &scope).await
    }

    /// Fetches `metric` from all replicas concurrently.
    pub async fn fetch_all(&self, replicas: &[Replica], metric: &str) -> Result<ObservedCounters> {
        let fetches = replicas.iter().map(|replica| async move {
            let count = self.fetch(replica, metric).await?;
            Ok::<_, HarnessError>((replica.clone(), count))
        });
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_scoped(
        &self,
        replica: &Replica,
        metric: &str,
        scope: &MetricScope,
    ) -> Result<u64> {
        let url = self.endpoint(replica);
        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| HarnessError::Connectivity(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarnessError::Connectivity(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let payload = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| HarnessError::Connectivity(format!("GET {}: bad payload: {}", url, e)))?;

        let count = extract_metric(&payload, metric, scope).ok_or_else(|| {
            HarnessError::Connectivity(format!("metric '{}' not reported by {}", metric, url))
        })?;
        event!(Level::DEBUG, replica = %replica, metric, count, "metric fetched");
        Ok(count)
    }
}
