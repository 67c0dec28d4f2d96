pub mod error;
pub mod types;

pub use error::{HarnessError, Result};
pub use types::{HostPort, ObservedCounters, Replica, ReplicaRole, Tablet};
