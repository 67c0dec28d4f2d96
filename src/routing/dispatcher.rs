use crate::core::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-request read consistency directive, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl ConsistencyLevel {
    pub const ALL_LEVELS: [ConsistencyLevel; 11] = [
        Self::Any,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Quorum,
        Self::All,
        Self::LocalQuorum,
        Self::EachQuorum,
        Self::Serial,
        Self::LocalSerial,
        Self::LocalOne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::All => "ALL",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::Serial => "SERIAL",
            Self::LocalSerial => "LOCAL_SERIAL",
            Self::LocalOne => "LOCAL_ONE",
        }
    }

    /// Native protocol code of the level.
    pub fn code(&self) -> u16 {
        match self {
            Self::Any => 0x0000,
            Self::One => 0x0001,
            Self::Two => 0x0002,
            Self::Three => 0x0003,
            Self::Quorum => 0x0004,
            Self::All => 0x0005,
            Self::LocalQuorum => 0x0006,
            Self::EachQuorum => 0x0007,
            Self::Serial => 0x0008,
            Self::LocalSerial => 0x0009,
            Self::LocalOne => 0x000A,
        }
    }

    pub fn from_code(code: u16) -> Result<Self> {
        Self::ALL_LEVELS
            .iter()
            .copied()
            .find(|level| level.code() == code)
            .ok_or_else(|| HarnessError::UnknownConsistencyLevel(format!("0x{:04X}", code)))
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = HarnessError;

    fn from_str(raw: &str) -> Result<Self> {
        let token = raw.trim().to_ascii_uppercase();
        Self::ALL_LEVELS
            .iter()
            .copied()
            .find(|level| level.as_str() == token)
            .ok_or_else(|| HarnessError::UnknownConsistencyLevel(raw.trim().to_string()))
    }
}

/// Where a read at a given consistency level is allowed to be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingPolicy {
    /// Served exclusively by the tablet leader.
    LeaderOnly,
    /// Served by any replica, possibly stale until replication converges.
    AnyReplica,
    /// Rejected at the protocol boundary.
    Unsupported,
}

impl fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LeaderOnly => "leader-only",
            Self::AnyReplica => "any-replica",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Maps consistency levels onto routing policies.
///
/// This table is the contract the verifier checks observed counters against.
pub struct ConsistencyLevelDispatcher;

impl ConsistencyLevelDispatcher {
    pub fn classify(level: ConsistencyLevel) -> RoutingPolicy {
        match level {
            ConsistencyLevel::LocalOne | ConsistencyLevel::Quorum => RoutingPolicy::LeaderOnly,
            ConsistencyLevel::One => RoutingPolicy::AnyReplica,
            ConsistencyLevel::All
            | ConsistencyLevel::Any
            | ConsistencyLevel::EachQuorum
            | ConsistencyLevel::LocalQuorum
            | ConsistencyLevel::LocalSerial
            | ConsistencyLevel::Serial
            | ConsistencyLevel::Three
            | ConsistencyLevel::Two => RoutingPolicy::Unsupported,
        }
    }

    /// Classifies a raw token; an unknown token is a test-authoring error.
    pub fn classify_token(token: &str) -> Result<RoutingPolicy> {
        let level = token.parse::<ConsistencyLevel>()?;
        Ok(Self::classify(level))
    }

    /// The single policy shared by every level of a read workload.
    ///
    /// An empty workload, or one mixing levels with different routing, has no
    /// verifiable policy and is a test-authoring error.
    pub fn classify_all(levels: &[ConsistencyLevel]) -> Result<RoutingPolicy> {
        let Some((first, rest)) = levels.split_first() else {
            return Err(HarnessError::ConfigError(
                "read workload names no consistency level".to_string(),
            ));
        };
        let policy = Self::classify(*first);
        if let Some(other) = rest.iter().find(|level| Self::classify(**level) != policy) {
            return Err(HarnessError::ConfigError(format!(
                "{} and {} route differently ({} vs {})",
                first,
                other,
                policy,
                Self::classify(*other)
            )));
        }
        Ok(policy)
    }

    /// All levels that map onto `policy`, in protocol code order.
    pub fn levels_for(policy: RoutingPolicy) -> Vec<ConsistencyLevel> {
        ConsistencyLevel::ALL_LEVELS
            .iter()
            .copied()
            .filter(|level| Self::classify(*level) == policy)
            .collect()
    }
}
