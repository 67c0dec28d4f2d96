#[async_trait]
impl ControlPlane for SimulatedCluster {
    async fn create_table(
        &self,
        name: &str,
        schema: &TableSchema,
        options: &CreateTableOptions,
    ) -> Result<()> {
        let mut tables = self.inner.tables.write().await;
        self.create(&mut tables, name, schema, options)
    }

    async fn tablet_locations(&self, table: &str) -> Result<Vec<TabletLocation>> {
        let tables = self.inner.tables.read().await;
        let table = tables
            .get(table)
            .ok_or_else(|| HarnessError::Topology(format!("table '{}' not found", table)))?;
        let locations = table
            .tablets
            .iter()
            .map(|tablet| TabletLocation {
                tablet_id: tablet.id.clone(),
                replicas: tablet
                    .replicas
                    .iter()
                    .map(|node| {
                        let address = &self.inner.nodes[*node].rpc_address;
                        ReplicaLocation {
                            host: address.host.clone(),
                            rpc_port: address.port,
                            role: tablet.role_of(*node).as_str().to_string(),
                        }
                    })
                    .collect(),
            })
            .collect();
        Ok(locations)
    }

    async fn diagnostics_port(&self, rpc_address: &HostPort) -> Option<u16> {
        let index = self.node_index(rpc_address)?;
        Some(self.inner.nodes[index].web_port)
    }
}

#[async_trait]
impl QueryExecutor for SimulatedCluster {
    async fn execute(
        &self,
        statement: &Statement,
        level: ConsistencyLevel,
    ) -> Result<QueryOutcome> {
        let mut policy = ConsistencyLevelDispatcher::classify(level);
        if policy == RoutingPolicy::Unsupported {
            if self.inner.config.read_fault != ReadRoutingFault::AcceptUnsupportedLevels {
                return Err(HarnessError::ProtocolRejection(format!(
                    "consistency level {} is not supported",
                    level
                )));
            }
            policy = RoutingPolicy::LeaderOnly;
        }

        match statement {
            Statement::Insert {
                table,
                columns,
                values,
            } => self.insert(table, columns, values).await,
            Statement::SelectAll { table } => self.select_all(table, policy).await,
        }
    }
}

#[async_trait]
impl ManagedCluster for SimulatedCluster {
    fn control_plane(&self) -> Arc<dyn ControlPlane> {
        Arc::new(self.clone())
    }

    fn executor(&self) -> Arc<dyn QueryExecutor> {
        Arc::new(self.clone())
    }

    async fn shutdown(&self) -> Result<()> {
        SimulatedCluster::shutdown(self).await
    }
}
