use crate::cluster::{ControlPlane, TabletLocation};
use crate::core::{HarnessError, Replica, ReplicaRole, Result, Tablet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Resolves a table to its single tablet and the role of every replica.
///
/// Each call asks the control plane again: leadership may move between test phases,
/// so a snapshot is only valid for the phase that took it.
#[derive(Clone)]
pub struct ClusterTopologyModel {
    control_plane: Arc<dyn ControlPlane>,
}

impl ClusterTopologyModel {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    pub async fn discover(&self, table: &str) -> Result<Tablet> {
        let span = info_span!("topology.discover", table = %table);
        async move {
            let mut locations = self.control_plane.tablet_locations(table).await?;
            if locations.len() != 1 {
                return Err(HarnessError::Topology(format!(
                    "table '{}' resolves to {} tablets, expected exactly 1",
                    table,
                    locations.len()
                )));
            }
            let location = locations.remove(0);
            let tablet = self.resolve(table, location).await?;

            event!(
                Level::DEBUG,
                tablet = %tablet.id,
                replicas = tablet.replicas.len(),
                "tablet discovered"
            );
            Ok(tablet)
        }
        .instrument(span)
        .await
    }

    /// Like `discover`, additionally requiring exactly `replication_factor` replicas.
    pub async fn discover_with_replication(
        &self,
        table: &str,
        replication_factor: usize,
    ) -> Result<Tablet> {
        let tablet = self.discover(table).await?;
        if tablet.replication_factor() != replication_factor {
            return Err(HarnessError::Topology(format!(
                "tablet '{}' of table '{}' has {} replicas, expected {}",
                tablet.id,
                table,
                tablet.replication_factor(),
                replication_factor
            )));
        }
        Ok(tablet)
    }

    async fn resolve(&self, table: &str, location: TabletLocation) -> Result<Tablet> {
        if location.replicas.is_empty() {
            return Err(HarnessError::Topology(format!(
                "tablet '{}' of table '{}' has no replicas",
                location.tablet_id, table
            )));
        }

        let mut seen = HashSet::new();
        let mut replicas = Vec::with_capacity(location.replicas.len());
        for raw in location.replicas {
            let role = ReplicaRole::parse(&raw.role).ok_or_else(|| {
                HarnessError::Topology(format!(
                    "replica {}:{} of tablet '{}' has undeterminable role '{}'",
                    raw.host, raw.rpc_port, location.tablet_id, raw.role
                ))
            })?;
            let replica = Replica::new(raw.host, raw.rpc_port, role, 0);
            let address = replica.rpc_address();
            if !seen.insert(address.clone()) {
                return Err(HarnessError::Topology(format!(
                    "replica {} appears more than once in tablet '{}'",
                    address, location.tablet_id
                )));
            }
            let web_port = self
                .control_plane
                .diagnostics_port(&address)
                .await
                .ok_or_else(|| {
                    HarnessError::Topology(format!(
                        "no diagnostics endpoint known for replica {}",
                        address
                    ))
                })?;
            replicas.push(Replica { web_port, ..replica });
        }

        let tablet = Tablet::new(location.tablet_id, replicas);
        let leaders = tablet.replicas.iter().filter(|r| r.is_leader()).count();
        if leaders != 1 {
            return Err(HarnessError::Topology(format!(
                "tablet '{}' of table '{}' reports {} leaders, expected exactly 1",
                tablet.id, table, leaders
            )));
        }
        Ok(tablet)
    }
}
