use crate::core::Result;
use crate::routing::ConsistencyLevel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The statements the harness issues against the query front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<i64>,
    },
    SelectAll {
        table: String,
    },
}

impl Statement {
    pub fn insert(table: impl Into<String>, columns: Vec<String>, values: Vec<i64>) -> Self {
        Self::Insert {
            table: table.into(),
            columns,
            values,
        }
    }

    pub fn select_all(table: impl Into<String>) -> Self {
        Self::SelectAll {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. } | Self::SelectAll { table } => table,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert {
                table,
                columns,
                values,
            } => {
                let values = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "INSERT INTO {}({}) VALUES({});",
                    table,
                    columns.join(", "),
                    values
                )
            }
            Self::SelectAll { table } => write!(f, "SELECT * FROM {};", table),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Rows returned by a read, or rows applied by a write.
    pub row_count: usize,
}

/// Query front end accepting a statement with an explicit consistency level.
///
/// Levels the protocol does not support must fail with `HarnessError::ProtocolRejection`.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement, level: ConsistencyLevel)
    -> Result<QueryOutcome>;
}
