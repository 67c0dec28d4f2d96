use crate::core::{HarnessError, HostPort, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Partition (hash) key component.
    Hash,
    /// Clustering (range) key component.
    Range(SortOrder),
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int32,
    Int64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    pub kind: ColumnKind,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            kind: ColumnKind::Regular,
        }
    }

    pub fn hash_key(mut self) -> Self {
        self.kind = ColumnKind::Hash;
        self
    }

    pub fn range_key(mut self, order: SortOrder) -> Self {
        self.kind = ColumnKind::Range(order);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Position of the first hash key column.
    pub fn hash_column_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.kind == ColumnKind::Hash)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(HarnessError::ExecutionError(
                "table schema must declare at least one column".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(HarnessError::ExecutionError(
                    "column name must not be empty".to_string(),
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(HarnessError::ExecutionError(format!(
                    "column '{}' appears more than once",
                    column.name
                )));
            }
        }
        if self.hash_column_index().is_none() {
            return Err(HarnessError::ExecutionError(
                "table schema must declare a hash key column".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Yql,
    Redis,
    Pgsql,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableOptions {
    pub num_tablets: u32,
    pub table_type: TableType,
}

impl Default for CreateTableOptions {
    fn default() -> Self {
        Self {
            num_tablets: 1,
            table_type: TableType::Yql,
        }
    }
}

impl CreateTableOptions {
    pub fn num_tablets(mut self, num_tablets: u32) -> Self {
        self.num_tablets = num_tablets;
        self
    }

    pub fn table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }
}

/// A replica as reported by the control plane, before role resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaLocation {
    pub host: String,
    pub rpc_port: u16,
    /// Raw raft peer role (`LEADER`, `FOLLOWER`, `LEARNER`, ...).
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletLocation {
    pub tablet_id: String,
    pub replicas: Vec<ReplicaLocation>,
}

/// Cluster management surface: table creation and tablet placement lookups.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_table(
        &self,
        name: &str,
        schema: &TableSchema,
        options: &CreateTableOptions,
    ) -> Result<()>;

    async fn tablet_locations(&self, table: &str) -> Result<Vec<TabletLocation>>;

    /// Diagnostics port of the node serving `rpc_address`, if that node is known.
    async fn diagnostics_port(&self, rpc_address: &HostPort) -> Option<u16>;
}
