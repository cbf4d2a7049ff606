pub mod gateway;
pub mod values;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use gateway::PgGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not connect to database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("timed out after {0}s connecting to database")]
    ConnectTimeout(u64),
    #[error("{0}")]
    Query(#[source] sqlx::Error),
    #[error("could not decode column `{column}`: {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Column names in result order, and one `{column: value}` record per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Runs SQL against the employee database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, GatewayError>;

    /// Opens and closes one session to prove the database is reachable.
    async fn ping(&self) -> Result<(), GatewayError>;
}
