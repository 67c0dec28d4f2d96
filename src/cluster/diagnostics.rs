//! Per-node diagnostics endpoint.
//!
//! Serves the node's counters as a JSON array of metric entities on `GET /metrics`:
//!
//! ```json
//! [{"type": "tablet", "id": "<tablet id>", "attributes": {"table_name": "t"},
//!   "metrics": [{"name": "handler_latency_..._Read", "total_count": 42}]}]
//! ```

use crate::core::Result;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use http::header::CACHE_CONTROL;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Counter name of the tablet server's read handler.
pub const TSERVER_READ_METRIC: &str = "handler_latency_yb_tserver_TabletServerService_Read";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub metrics: Vec<MetricSample>,
}

#[derive(Debug, Clone)]
struct TabletCounters {
    table_name: String,
    reads: u64,
}

/// Counters owned by one node. Only the node mutates them; the harness only reads.
#[derive(Debug)]
pub struct NodeMetrics {
    server_id: String,
    read_metric: String,
    tablets: Mutex<BTreeMap<String, TabletCounters>>,
}

impl NodeMetrics {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self::with_read_metric(server_id, TSERVER_READ_METRIC)
    }

    pub fn with_read_metric(server_id: impl Into<String>, read_metric: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            read_metric: read_metric.into(),
            tablets: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn register_tablet(&self, tablet_id: &str, table_name: &str) -> Result<()> {
        let mut tablets = self.tablets.lock()?;
        tablets
            .entry(tablet_id.to_string())
            .or_insert_with(|| TabletCounters {
                table_name: table_name.to_string(),
                reads: 0,
            });
        Ok(())
    }

    /// Counts one served read and returns the new cumulative value.
    pub fn record_read(&self, tablet_id: &str) -> Result<u64> {
        let mut tablets = self.tablets.lock()?;
        let counters = tablets
            .entry(tablet_id.to_string())
            .or_insert_with(|| TabletCounters {
                table_name: String::new(),
                reads: 0,
            });
        counters.reads = counters.reads.saturating_add(1);
        Ok(counters.reads)
    }

    pub fn read_ops(&self, tablet_id: &str) -> Result<u64> {
        let tablets = self.tablets.lock()?;
        Ok(tablets.get(tablet_id).map(|c| c.reads).unwrap_or(0))
    }

    pub fn entities(&self) -> Result<Vec<MetricEntity>> {
        let tablets = self.tablets.lock()?;
        let mut entities = Vec::with_capacity(tablets.len() + 1);
        entities.push(MetricEntity {
            entity_type: "server".to_string(),
            id: self.server_id.clone(),
            attributes: BTreeMap::new(),
            metrics: vec![MetricSample {
                name: "tablets_hosted".to_string(),
                total_count: None,
                value: Some(tablets.len() as u64),
            }],
        });
        for (tablet_id, counters) in tablets.iter() {
            let mut attributes = BTreeMap::new();
            attributes.insert("table_name".to_string(), counters.table_name.clone());
            entities.push(MetricEntity {
                entity_type: "tablet".to_string(),
                id: tablet_id.clone(),
                attributes,
                metrics: vec![MetricSample {
                    name: self.read_metric.clone(),
                    total_count: Some(counters.reads),
                    value: None,
                }],
            });
        }
        Ok(entities)
    }
}

pub fn diagnostics_router(metrics: Arc<NodeMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<NodeMetrics>>) -> Response {
    match metrics.entities() {
        Ok(entities) => {
            debug!("Serving {} metric entities", entities.len());
            ([(CACHE_CONTROL, "no-store")], Json(entities)).into_response()
        }
        Err(err) => {
            error!("Metric snapshot failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Binds an ephemeral port on `host` and serves the diagnostics router on it.
pub async fn serve_diagnostics(
    host: &str,
    metrics: Arc<NodeMetrics>,
) -> Result<(u16, JoinHandle<()>)> {
    let listener = TcpListener::bind((host, 0)).await?;
    let port = listener.local_addr()?.port();
    debug!("Diagnostics endpoint listening on {}:{}", host, port);

    let router = diagnostics_router(metrics);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Diagnostics server error: {:?}", e);
        }
    });
    Ok((port, handle))
}
