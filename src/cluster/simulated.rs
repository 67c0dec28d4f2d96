//! In-process reference cluster.
//!
//! Stands in for a real replicated deployment: leaders commit synchronously, followers
//! see a commit only after `replication_lag`, and every node serves its read counters
//! over a real HTTP diagnostics endpoint. Routing faults can be injected to check that
//! the verifier notices misrouting.

use super::ManagedCluster;
use super::control_plane::{
    ControlPlane, CreateTableOptions, ReplicaLocation, TableSchema, TableType, TabletLocation,
};
use super::diagnostics::{NodeMetrics, serve_diagnostics};
use super::executor::{QueryExecutor, QueryOutcome, Statement};
use crate::core::{HarnessError, HostPort, ReplicaRole, Result};
use crate::routing::{ConsistencyLevel, ConsistencyLevelDispatcher, RoutingPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Level, event};

// Reference cluster internals are split by concern to keep them navigable.
include!("simulated/config.rs");
include!("simulated/tablet.rs");
include!("simulated/node.rs");
include!("simulated/cluster.rs");
include!("simulated/interfaces.rs");
