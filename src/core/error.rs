use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Distribution not converged: {0}")]
    ConvergenceTimeout(String),

    #[error("Routing violation on {replica}: expected {expected} ops, observed {actual}")]
    RoutingViolation {
        replica: String,
        expected: String,
        actual: u64,
    },

    #[error("Consistency level {0} was served but must be rejected")]
    UnsupportedLevelAccepted(String),

    #[error("Protocol rejection: {0}")]
    ProtocolRejection(String),

    #[error("Unknown consistency level: {0}")]
    UnknownConsistencyLevel(String),

    #[error("Read at {level} returned {actual} rows, expected {expected}")]
    RowCountMismatch {
        level: String,
        expected: usize,
        actual: usize,
    },

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl HarnessError {
    /// Only network-level failures are worth retrying; everything else is a verdict.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl<T> From<std::sync::PoisonError<T>> for HarnessError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connectivity(err.to_string())
    }
}
