pub mod payload;
pub mod poller;

pub use payload::{MetricScope, extract_metric};
pub use poller::{MetricPoller, MetricPollerConfig};
