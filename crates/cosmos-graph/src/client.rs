//! The remote graph service seam: errors, resource handles, statements and cursors.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::provision::GraphSpec;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Cosmos DB connection error: {0}")]
    Connection(String),

    #[error("Provisioning {resource} failed with status {status}: {message}")]
    Provisioning {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("Gremlin query failed with status {status}: {message}")]
    Query { status: u16, message: String },

    #[error("Gremlin protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// True when the failure happened while executing or reading a query.
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            Self::Query { .. } | Self::Protocol(_) | Self::Serialization(_)
        )
    }
}

/// Handle to a provisioned database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRef {
    pub id: String,
    /// Service-assigned resource id; stable across reads of the same database.
    pub rid: String,
}

impl DatabaseRef {
    pub fn resource_link(&self) -> String {
        format!("dbs/{}", self.id)
    }
}

/// Handle to a provisioned graph container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRef {
    pub database: String,
    pub id: String,
    pub rid: String,
    pub partition_key_path: Option<String>,
}

impl GraphRef {
    pub fn resource_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.id)
    }

    /// Vertex property the container partitions on, e.g. `pk` for `/pk`.
    pub fn partition_key_property(&self) -> Option<&str> {
        self.partition_key_path.as_deref().map(partition_key_property)
    }
}

/// Property name behind a partition key path: `/pk` → `pk`.
pub fn partition_key_property(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// A Gremlin script plus its parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    bindings: Map<String, Value>,
}

/// Start a statement from Gremlin text; chain [`Statement::bind`] for parameters.
pub fn statement(text: impl Into<String>) -> Statement {
    Statement {
        text: text.into(),
        bindings: Map::new(),
    }
}

impl Statement {
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.to_string(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

/// Server-backed pagination over the results of one query.
///
/// `has_more_results` starts out true for any query that may return data and
/// turns false once the final batch has been fetched. A cursor is consumed
/// exactly once.
#[async_trait]
pub trait ResultCursor: Send {
    fn has_more_results(&self) -> bool;

    /// Fetch the next batch in server order.
    async fn next_batch(&mut self) -> Result<Vec<Value>, GraphError>;

    /// Request units charged so far for this query.
    fn request_charge(&self) -> f64 {
        0.0
    }
}

/// The remote graph database as seen by the quickstart.
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Create the database if absent, otherwise return the existing one.
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, GraphError>;

    /// Create the graph container if absent, otherwise return the existing one.
    /// An existing container is never reconfigured.
    async fn ensure_graph(
        &self,
        database: &DatabaseRef,
        spec: &GraphSpec,
    ) -> Result<GraphRef, GraphError>;

    /// Submit a query and hand back its cursor.
    async fn submit(
        &self,
        graph: &GraphRef,
        statement: &Statement,
    ) -> Result<Box<dyn ResultCursor>, GraphError>;
}
