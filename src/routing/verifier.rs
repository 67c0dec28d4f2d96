use super::{ConsistencyLevel, RoutingPolicy};
use crate::cluster::QueryOutcome;
use crate::core::{HarnessError, HostPort, ObservedCounters, Result};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

/// Parameters of the statistical load-spread check for any-replica reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadThreshold {
    /// Each replica must serve more than `total_ops / min_share_divisor` reads.
    pub min_share_divisor: u64,
    /// Below this many reads the per-replica share is too noisy to judge.
    pub min_total_ops: u64,
    /// Spread is only meaningful with at least this many replicas.
    pub min_replicas: usize,
}

impl Default for SpreadThreshold {
    fn default() -> Self {
        Self {
            min_share_divisor: 10,
            min_total_ops: 100,
            min_replicas: 3,
        }
    }
}

impl SpreadThreshold {
    pub fn minimum_per_replica(&self, total_ops: u64) -> u64 {
        total_ops / self.min_share_divisor.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_share_divisor == 0 {
            return Err(HarnessError::ConfigError(
                "min_share_divisor must be >= 1".to_string(),
            ));
        }
        if self.min_replicas == 0 {
            return Err(HarnessError::ConfigError(
                "min_replicas must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a routing check that passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub policy: RoutingPolicy,
    pub total_ops_issued: u64,
    pub observed_total: u64,
    pub replicas: usize,
    pub leader: Option<HostPort>,
}

/// Checks observed per-replica counters against a routing policy.
///
/// Holds no state between calls; every verdict depends only on its inputs.
#[derive(Debug, Clone, Default)]
pub struct RoutingVerifier {
    threshold: SpreadThreshold,
}

impl RoutingVerifier {
    pub fn new(threshold: SpreadThreshold) -> Result<Self> {
        threshold.validate()?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> &SpreadThreshold {
        &self.threshold
    }

    pub fn verify(
        &self,
        policy: RoutingPolicy,
        total_ops_issued: u64,
        observed: &ObservedCounters,
    ) -> Result<VerificationResult> {
        if observed.is_empty() {
            return Err(HarnessError::RoutingViolation {
                replica: "<no replicas>".to_string(),
                expected: format!("{} ops across the tablet", total_ops_issued),
                actual: 0,
            });
        }

        let result = match policy {
            RoutingPolicy::LeaderOnly => self.verify_leader_only(total_ops_issued, observed)?,
            RoutingPolicy::AnyReplica => self.verify_any_replica(total_ops_issued, observed)?,
            RoutingPolicy::Unsupported => {
                // Counters are only inspected once a read was served, which is already the failure.
                return Err(HarnessError::UnsupportedLevelAccepted(format!(
                    "{} reads served under an unsupported level",
                    observed.total()
                )));
            }
        };

        event!(
            Level::DEBUG,
            policy = %policy,
            total_ops = total_ops_issued,
            observed_total = result.observed_total,
            "routing verified"
        );
        Ok(result)
    }

    /// Checks that a read attempted at an unsupported level was refused by the protocol.
    ///
    /// A served read is `UnsupportedLevelAccepted`; failures other than a protocol
    /// rejection are passed through unchanged.
    pub fn verify_rejection(
        &self,
        level: ConsistencyLevel,
        attempt: Result<QueryOutcome>,
    ) -> Result<()> {
        match attempt {
            Ok(outcome) => Err(HarnessError::UnsupportedLevelAccepted(format!(
                "{} ({} rows returned)",
                level, outcome.row_count
            ))),
            Err(HarnessError::ProtocolRejection(reason)) => {
                event!(
                    Level::DEBUG,
                    level = %level,
                    reason = %reason,
                    "level rejected as expected"
                );
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn verify_leader_only(
        &self,
        total_ops_issued: u64,
        observed: &ObservedCounters,
    ) -> Result<VerificationResult> {
        let leaders = observed
            .iter()
            .filter(|(replica, _)| replica.is_leader())
            .count();
        if leaders != 1 {
            return Err(HarnessError::Topology(format!(
                "leader-only verification needs exactly one leader, snapshot has {}",
                leaders
            )));
        }

        let mut leader = None;
        for (replica, count) in observed.iter() {
            let expected = if replica.is_leader() {
                leader = Some(replica.rpc_address());
                total_ops_issued
            } else {
                0
            };
            if count != expected {
                return Err(HarnessError::RoutingViolation {
                    replica: replica.to_string(),
                    expected: expected.to_string(),
                    actual: count,
                });
            }
        }

        Ok(VerificationResult {
            policy: RoutingPolicy::LeaderOnly,
            total_ops_issued,
            observed_total: observed.total(),
            replicas: observed.len(),
            leader,
        })
    }

    fn verify_any_replica(
        &self,
        total_ops_issued: u64,
        observed: &ObservedCounters,
    ) -> Result<VerificationResult> {
        if total_ops_issued < self.threshold.min_total_ops {
            return Err(HarnessError::ConfigError(format!(
                "spread check needs at least {} ops, got {}",
                self.threshold.min_total_ops, total_ops_issued
            )));
        }
        if observed.len() < self.threshold.min_replicas {
            return Err(HarnessError::ConfigError(format!(
                "spread check needs at least {} replicas, got {}",
                self.threshold.min_replicas,
                observed.len()
            )));
        }

        let observed_total = observed.total();
        if observed_total < total_ops_issued {
            return Err(HarnessError::RoutingViolation {
                replica: "all replicas".to_string(),
                expected: format!(">= {}", total_ops_issued),
                actual: observed_total,
            });
        }

        let minimum = self.threshold.minimum_per_replica(total_ops_issued);
        for (replica, count) in observed.iter() {
            event!(Level::INFO, replica = %replica, ops = count, "replica read share");
            if count <= minimum {
                return Err(HarnessError::RoutingViolation {
                    replica: replica.to_string(),
                    expected: format!("> {}", minimum),
                    actual: count,
                });
            }
        }

        Ok(VerificationResult {
            policy: RoutingPolicy::AnyReplica,
            total_ops_issued,
            observed_total,
            replicas: observed.len(),
            leader: observed
                .iter()
                .find(|(replica, _)| replica.is_leader())
                .map(|(replica, _)| replica.rpc_address()),
        })
    }
}
