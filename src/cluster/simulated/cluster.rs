struct ClusterInner {
    config: SimulatedClusterConfig,
    nodes: Vec<SimulatedNode>,
    tables: RwLock<HashMap<String, SimulatedTable>>,
    read_cursor: AtomicUsize,
}

/// A running reference cluster. Cheap to clone; clones share the same nodes.
#[derive(Clone)]
pub struct SimulatedCluster {
    inner: Arc<ClusterInner>,
}

impl SimulatedCluster {
    /// Starts every node's diagnostics endpoint.
    pub async fn start(config: SimulatedClusterConfig) -> Result<Self> {
        config.validate()?;
        let mut nodes = Vec::with_capacity(config.num_nodes);
        for index in 0..config.num_nodes {
            nodes.push(SimulatedNode::start(index, &config).await?);
        }
        event!(
            Level::INFO,
            nodes = config.num_nodes,
            replication_factor = config.replication_factor,
            "simulated cluster started"
        );
        Ok(Self {
            inner: Arc::new(ClusterInner {
                config,
                nodes,
                tables: RwLock::new(HashMap::new()),
                read_cursor: AtomicUsize::new(0),
            }),
        })
    }

    pub fn config(&self) -> &SimulatedClusterConfig {
        &self.inner.config
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn node_address(&self, index: usize) -> Option<HostPort> {
        self.inner
            .nodes
            .get(index)
            .map(|node| node.rpc_address.clone())
    }

    pub fn node_web_port(&self, index: usize) -> Option<u16> {
        self.inner.nodes.get(index).map(|node| node.web_port)
    }

    pub fn node_metrics(&self, index: usize) -> Option<Arc<NodeMetrics>> {
        self.inner
            .nodes
            .get(index)
            .map(|node| Arc::clone(&node.metrics))
    }

    pub async fn tablet_ids(&self, table: &str) -> Result<Vec<String>> {
        let tables = self.inner.tables.read().await;
        let table = Self::table_ref(&tables, table)?;
        Ok(table.tablets.iter().map(|tablet| tablet.id.clone()).collect())
    }

    /// Moves leadership of a tablet to the replica at `new_leader` and bumps its epoch.
    ///
    /// The previous leader is demoted to follower and keeps every row it had committed.
    pub async fn move_tablet_leader(
        &self,
        table: &str,
        tablet_id: &str,
        new_leader: &HostPort,
    ) -> Result<TabletLeadershipChange> {
        let target = self.node_index(new_leader).ok_or_else(|| {
            HarnessError::Topology(format!("node {} is not part of the cluster", new_leader))
        })?;

        let mut tables = self.inner.tables.write().await;
        let table_name = table;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| HarnessError::Topology(format!("table '{}' not found", table_name)))?;
        let tablet = table
            .tablets
            .iter_mut()
            .find(|tablet| tablet.id == tablet_id)
            .ok_or_else(|| {
                HarnessError::Topology(format!(
                    "tablet '{}' not found in table '{}'",
                    tablet_id, table_name
                ))
            })?;
        if !tablet.replicas.contains(&target) {
            return Err(HarnessError::Topology(format!(
                "leader move rejected: {} holds no replica of tablet '{}'",
                new_leader, tablet_id
            )));
        }

        let previous = tablet.leader;
        if previous != target {
            // A raft leader only wins election once it holds every committed entry.
            tablet.synced.insert(previous, tablet.commits.len());
            tablet.synced.insert(target, tablet.commits.len());
            tablet.leader = target;
            tablet.epoch = tablet.epoch.saturating_add(1);
        }

        let change = TabletLeadershipChange {
            tablet_id: tablet.id.clone(),
            previous_leader: self.inner.nodes[previous].rpc_address.clone(),
            next_leader: self.inner.nodes[target].rpc_address.clone(),
            epoch: tablet.epoch,
            followers: tablet
                .followers()
                .map(|node| self.inner.nodes[node].rpc_address.clone())
                .collect(),
        };
        event!(
            Level::INFO,
            tablet = %change.tablet_id,
            from = %change.previous_leader,
            to = %change.next_leader,
            epoch = change.epoch,
            "tablet leadership moved"
        );
        Ok(change)
    }

    /// Takes a node's diagnostics endpoint offline; later fetches are refused.
    pub async fn stop_diagnostics(&self, node: &HostPort) -> Result<()> {
        let index = self.node_index(node).ok_or_else(|| {
            HarnessError::Topology(format!("node {} is not part of the cluster", node))
        })?;
        self.inner.nodes[index].stop_diagnostics().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        for node in &self.inner.nodes {
            node.stop_diagnostics().await?;
        }
        event!(Level::INFO, "simulated cluster stopped");
        Ok(())
    }

    fn node_index(&self, address: &HostPort) -> Option<usize> {
        self.inner
            .nodes
            .iter()
            .position(|node| &node.rpc_address == address)
    }

    fn table_ref<'a>(
        tables: &'a HashMap<String, SimulatedTable>,
        name: &str,
    ) -> Result<&'a SimulatedTable> {
        tables
            .get(name)
            .ok_or_else(|| HarnessError::ExecutionError(format!("table '{}' not found", name)))
    }

    fn create(
        &self,
        tables: &mut HashMap<String, SimulatedTable>,
        name: &str,
        schema: &TableSchema,
        options: &CreateTableOptions,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(HarnessError::ExecutionError(
                "table name must not be empty".to_string(),
            ));
        }
        if options.num_tablets == 0 {
            return Err(HarnessError::ExecutionError(
                "num_tablets must be >= 1".to_string(),
            ));
        }
        schema.validate()?;
        if tables.contains_key(name) {
            return Err(HarnessError::ExecutionError(format!(
                "table '{}' already exists",
                name
            )));
        }

        let node_count = self.inner.nodes.len();
        let replication_factor = self.inner.config.replication_factor;
        let mut tablets = Vec::with_capacity(options.num_tablets as usize);
        for index in 0..options.num_tablets as usize {
            let leader = index % node_count;
            let replicas = (0..replication_factor)
                .map(|offset| (leader + offset) % node_count)
                .collect::<Vec<_>>();
            let id = uuid::Uuid::new_v4().simple().to_string();
            for node in &replicas {
                self.inner.nodes[*node].metrics.register_tablet(&id, name)?;
            }
            tablets.push(SimulatedTablet::new(id, replicas, leader));
        }

        tables.insert(
            name.to_string(),
            SimulatedTable {
                schema: schema.clone(),
                table_type: options.table_type,
                tablets,
            },
        );
        event!(
            Level::DEBUG,
            table = name,
            tablets = options.num_tablets,
            "simulated table created"
        );
        Ok(())
    }

    async fn insert(
        &self,
        table_name: &str,
        columns: &[String],
        values: &[i64],
    ) -> Result<QueryOutcome> {
        let mut tables = self.inner.tables.write().await;
        let table = tables.get_mut(table_name).ok_or_else(|| {
            HarnessError::ExecutionError(format!("table '{}' not found", table_name))
        })?;
        if table.table_type != TableType::Yql {
            return Err(HarnessError::ExecutionError(format!(
                "table '{}' is not a YQL table",
                table_name
            )));
        }
        if columns.len() != values.len() {
            return Err(HarnessError::ExecutionError(format!(
                "insert lists {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }

        // Reorder into schema column order so the hash key is found by position.
        let mut row = vec![0i64; table.schema.column_count()];
        for (column, value) in columns.iter().zip(values) {
            let index = table.schema.find_column_index(column).ok_or_else(|| {
                HarnessError::ExecutionError(format!(
                    "column '{}' not found in table '{}'",
                    column, table_name
                ))
            })?;
            row[index] = *value;
        }

        let tablet = table.tablet_for_row(&row)?;
        tablet.commit(Instant::now());
        Ok(QueryOutcome { row_count: 1 })
    }

    async fn select_all(&self, table_name: &str, policy: RoutingPolicy) -> Result<QueryOutcome> {
        let tables = self.inner.tables.read().await;
        let table = Self::table_ref(&tables, table_name)?;
        let lag = self.inner.config.replication_lag;
        let now = Instant::now();

        let mut row_count = 0;
        for tablet in &table.tablets {
            let node = self.pick_replica(tablet, policy);
            self.inner.nodes[node].metrics.record_read(&tablet.id)?;
            row_count += tablet.visible_rows(node, lag, now);
        }
        Ok(QueryOutcome { row_count })
    }

    fn pick_replica(&self, tablet: &SimulatedTablet, policy: RoutingPolicy) -> usize {
        let fault = self.inner.config.read_fault;
        match policy {
            RoutingPolicy::AnyReplica if fault != ReadRoutingFault::AnyReadsPinnedToLeader => {
                let cursor = self.inner.read_cursor.fetch_add(1, Ordering::Relaxed);
                tablet.replicas[cursor % tablet.replicas.len()]
            }
            RoutingPolicy::LeaderOnly if fault == ReadRoutingFault::LeaderReadsOnFollower => {
                tablet.followers().next().unwrap_or(tablet.leader)
            }
            _ => tablet.leader,
        }
    }
}
