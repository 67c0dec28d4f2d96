/// Computes a stable tablet index for a partition key using FNV-1a.
///
/// Keeps row placement identical across runs for a fixed tablet count.
pub fn stable_tablet_for(partition_key: i64, tablet_count: u32) -> u32 {
    if tablet_count == 0 {
        return 0;
    }
    let mut hash = 14695981039346656037u64;
    for byte in partition_key.to_le_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash % tablet_count as u64) as u32
}

/// Outcome of a leadership transfer on one tablet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletLeadershipChange {
    pub tablet_id: String,
    pub previous_leader: HostPort,
    pub next_leader: HostPort,
    pub epoch: u64,
    pub followers: Vec<HostPort>,
}

struct SimulatedTablet {
    id: String,
    /// Node indices hosting a replica; the leader is one of them.
    replicas: Vec<usize>,
    leader: usize,
    epoch: u64,
    /// Commit instants of every row, in commit order.
    commits: Vec<Instant>,
    /// Rows a node is known to hold regardless of lag (e.g. after it led the tablet).
    synced: HashMap<usize, usize>,
}

impl SimulatedTablet {
    fn new(id: String, replicas: Vec<usize>, leader: usize) -> Self {
        Self {
            id,
            replicas,
            leader,
            epoch: 1,
            commits: Vec::new(),
            synced: HashMap::new(),
        }
    }

    fn followers(&self) -> impl Iterator<Item = usize> + '_ {
        self.replicas
            .iter()
            .copied()
            .filter(move |node| *node != self.leader)
    }

    fn commit(&mut self, at: Instant) {
        self.commits.push(at);
    }

    /// Rows a replica on `node` would return at `now`.
    fn visible_rows(&self, node: usize, lag: Duration, now: Instant) -> usize {
        if node == self.leader {
            return self.commits.len();
        }
        let replicated = self
            .commits
            .partition_point(|committed| *committed + lag <= now);
        replicated.max(self.synced.get(&node).copied().unwrap_or(0))
    }

    fn role_of(&self, node: usize) -> ReplicaRole {
        if node == self.leader {
            ReplicaRole::Leader
        } else {
            ReplicaRole::Follower
        }
    }
}

struct SimulatedTable {
    schema: TableSchema,
    table_type: TableType,
    tablets: Vec<SimulatedTablet>,
}

impl SimulatedTable {
    fn tablet_for_row(&mut self, values: &[i64]) -> Result<&mut SimulatedTablet> {
        let hash_index = self.schema.hash_column_index().ok_or_else(|| {
            HarnessError::ExecutionError("table has no hash key column".to_string())
        })?;
        let partition_key = values.get(hash_index).copied().ok_or_else(|| {
            HarnessError::ExecutionError("insert is missing the hash key value".to_string())
        })?;
        let index = stable_tablet_for(partition_key, self.tablets.len() as u32) as usize;
        self.tablets.get_mut(index).ok_or_else(|| {
            HarnessError::ExecutionError(format!("tablet index {} out of range", index))
        })
    }
}
