pub mod dispatcher;
pub mod verifier;

pub use dispatcher::{ConsistencyLevel, ConsistencyLevelDispatcher, RoutingPolicy};
pub use verifier::{RoutingVerifier, SpreadThreshold, VerificationResult};
