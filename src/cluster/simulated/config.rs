/// Deliberate misrouting the reference cluster can be told to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadRoutingFault {
    #[default]
    None,
    /// Leader-only reads are served by a follower.
    LeaderReadsOnFollower,
    /// Any-replica reads are all served by the leader.
    AnyReadsPinnedToLeader,
    /// Unsupported levels are served like leader-only reads instead of rejected.
    AcceptUnsupportedLevels,
}

#[derive(Debug, Clone)]
pub struct SimulatedClusterConfig {
    /// Number of tablet servers.
    pub num_nodes: usize,
    /// Replicas per tablet.
    pub replication_factor: usize,
    /// Host every node binds its diagnostics endpoint on.
    pub host: String,
    /// Rpc port of node 0; node `i` reports `base_rpc_port + i`.
    pub base_rpc_port: u16,
    /// Delay before a follower observes a committed row.
    pub replication_lag: Duration,
    pub read_fault: ReadRoutingFault,
}

impl Default for SimulatedClusterConfig {
    fn default() -> Self {
        Self {
            num_nodes: 3,
            replication_factor: 3,
            host: "127.0.0.1".to_string(),
            base_rpc_port: 9100,
            replication_lag: Duration::from_millis(50),
            read_fault: ReadRoutingFault::None,
        }
    }
}

impl SimulatedClusterConfig {
    /// Cluster of `num_nodes` servers where every tablet lives on every server.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            replication_factor: num_nodes,
            ..Self::default()
        }
    }

    pub fn replication_factor(mut self, replication_factor: usize) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn base_rpc_port(mut self, port: u16) -> Self {
        self.base_rpc_port = port;
        self
    }

    pub fn replication_lag(mut self, lag: Duration) -> Self {
        self.replication_lag = lag;
        self
    }

    pub fn read_fault(mut self, fault: ReadRoutingFault) -> Self {
        self.read_fault = fault;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_nodes == 0 {
            return Err(HarnessError::ConfigError(
                "num_nodes must be >= 1".to_string(),
            ));
        }
        if self.replication_factor == 0 || self.replication_factor > self.num_nodes {
            return Err(HarnessError::ConfigError(format!(
                "replication_factor {} must be between 1 and num_nodes {}",
                self.replication_factor, self.num_nodes
            )));
        }
        if self.host.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "host must not be empty".to_string(),
            ));
        }
        if usize::from(self.base_rpc_port) + self.num_nodes > usize::from(u16::MAX) {
            return Err(HarnessError::ConfigError(format!(
                "base_rpc_port {} leaves no room for {} nodes",
                self.base_rpc_port, self.num_nodes
            )));
        }
        Ok(())
    }
}
