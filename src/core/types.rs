use super::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A `host:port` pair identifying a node endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host:port`. The port is taken after the last colon.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (host, port) = raw.rsplit_once(':').ok_or_else(|| {
            HarnessError::ConfigError(format!("'{}' is not a host:port pair", raw))
        })?;
        if host.is_empty() {
            return Err(HarnessError::ConfigError(format!(
                "'{}' has an empty host",
                raw
            )));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| HarnessError::ConfigError(format!("'{}' has an invalid port", raw)))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReplicaRole {
    Leader,
    Follower,
}

impl ReplicaRole {
    /// Parses a raft peer role as reported by the control plane.
    ///
    /// Learners, non-participants and unknown roles yield `None`: such a replica has no
    /// determinable place in the read routing policy.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LEADER" => Some(Self::Leader),
            "FOLLOWER" => Some(Self::Follower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::Follower => "FOLLOWER",
        }
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One copy of a tablet, as observed at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Replica {
    pub host: String,
    pub rpc_port: u16,
    pub role: ReplicaRole,
    /// Port of the node's diagnostics (metrics) endpoint.
    pub web_port: u16,
}

impl Replica {
    pub fn new(host: impl Into<String>, rpc_port: u16, role: ReplicaRole, web_port: u16) -> Self {
        Self {
            host: host.into(),
            rpc_port,
            role,
            web_port,
        }
    }

    pub fn rpc_address(&self) -> HostPort {
        HostPort::new(self.host.clone(), self.rpc_port)
    }

    pub fn diagnostics_address(&self) -> HostPort {
        HostPort::new(self.host.clone(), self.web_port)
    }

    pub fn is_leader(&self) -> bool {
        self.role == ReplicaRole::Leader
    }
}

impl fmt::Display for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.rpc_port, self.role)
    }
}

/// A horizontal partition of a table and the replicas that host it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tablet {
    pub id: String,
    pub replicas: Vec<Replica>,
}

impl Tablet {
    pub fn new(id: impl Into<String>, replicas: Vec<Replica>) -> Self {
        Self {
            id: id.into(),
            replicas,
        }
    }

    pub fn replication_factor(&self) -> usize {
        self.replicas.len()
    }

    /// Returns the leader when exactly one replica holds that role.
    pub fn leader(&self) -> Option<&Replica> {
        let mut leaders = self.replicas.iter().filter(|replica| replica.is_leader());
        let leader = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(leader)
    }

    pub fn followers(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.iter().filter(|replica| !replica.is_leader())
    }
}

/// Cumulative read-operation counts per replica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedCounters {
    counts: BTreeMap<Replica, u64>,
}

impl ObservedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, replica: Replica, count: u64) {
        self.counts.insert(replica, count);
    }

    pub fn get(&self, replica: &Replica) -> Option<u64> {
        self.counts.get(replica).copied()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Replica, u64)> {
        self.counts.iter().map(|(replica, count)| (replica, *count))
    }

    /// Computes the per-replica increase since `baseline`.
    ///
    /// Counters are monotonic for the lifetime of a node, so a decrease means the node
    /// restarted underneath the test. Replicas missing from the baseline count from zero.
    pub fn delta_since(&self, baseline: &ObservedCounters) -> Result<ObservedCounters> {
        let mut delta = ObservedCounters::new();
        for (replica, current) in self.iter() {
            let before = baseline.get(replica).unwrap_or(0);
            if current < before {
                return Err(HarnessError::ExecutionError(format!(
                    "counter for {} went backwards ({} -> {}); node restarted mid-test",
                    replica, before, current
                )));
            }
            delta.record(replica.clone(), current - before);
        }
        Ok(delta)
    }
}

impl FromIterator<(Replica, u64)> for ObservedCounters {
    fn from_iter<I: IntoIterator<Item = (Replica, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(port: u16, role: ReplicaRole) -> Replica {
        Replica::new("127.0.0.1", port, role, port + 1000)
    }

    #[test]
    fn host_port_parses_and_formats() {
        let addr = HostPort::parse(" node-a:9100 ").unwrap();
        assert_eq!(addr, HostPort::new("node-a", 9100));
        assert_eq!(addr.to_string(), "node-a:9100");

        assert!(HostPort::parse("node-a").is_err());
        assert!(HostPort::parse(":9100").is_err());
        assert!(HostPort::parse("node-a:99999").is_err());
    }

    #[test]
    fn replica_role_parse_only_accepts_routable_roles() {
        assert_eq!(ReplicaRole::parse("LEADER"), Some(ReplicaRole::Leader));
        assert_eq!(ReplicaRole::parse(" follower "), Some(ReplicaRole::Follower));
        assert_eq!(ReplicaRole::parse("LEARNER"), None);
        assert_eq!(ReplicaRole::parse("UNKNOWN_ROLE"), None);
    }

    #[test]
    fn tablet_leader_requires_exactly_one() {
        let tablet = Tablet::new(
            "t1",
            vec![
                replica(1, ReplicaRole::Leader),
                replica(2, ReplicaRole::Follower),
            ],
        );
        assert_eq!(tablet.leader().unwrap().rpc_port, 1);
        assert_eq!(tablet.followers().count(), 1);

        let split = Tablet::new(
            "t2",
            vec![
                replica(1, ReplicaRole::Leader),
                replica(2, ReplicaRole::Leader),
            ],
        );
        assert!(split.leader().is_none());
    }

    #[test]
    fn delta_since_subtracts_baseline_and_rejects_resets() {
        let a = replica(1, ReplicaRole::Leader);
        let b = replica(2, ReplicaRole::Follower);
        let baseline: ObservedCounters = [(a.clone(), 5), (b.clone(), 0)].into_iter().collect();
        let current: ObservedCounters = [(a.clone(), 12), (b.clone(), 3)].into_iter().collect();

        let delta = current.delta_since(&baseline).unwrap();
        assert_eq!(delta.get(&a), Some(7));
        assert_eq!(delta.get(&b), Some(3));
        assert_eq!(delta.total(), 10);

        let reset: ObservedCounters = [(a, 1)].into_iter().collect();
        assert!(reset.delta_since(&baseline).is_err());
    }
}
