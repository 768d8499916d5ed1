//! Idempotent provisioning of the database and graph container.
//!
//! Both steps are create-if-absent: rerunning them against an account where
//! the resources already exist returns the existing resources unchanged.

use cosmos_core::CosmosSettings;

use crate::client::{partition_key_property, DatabaseRef, GraphError, GraphRef, GraphService};

/// What to create when the graph container does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSpec {
    pub id: String,
    /// RU/s requested at creation; ignored for an existing container.
    pub offer_throughput: u32,
    pub partition_key_path: String,
}

impl From<&CosmosSettings> for GraphSpec {
    fn from(settings: &CosmosSettings) -> Self {
        Self {
            id: settings.graph_name.clone(),
            offer_throughput: settings.offer_throughput,
            partition_key_path: settings.partition_key_path.clone(),
        }
    }
}

impl GraphSpec {
    /// Vertex property a new container partitions on.
    pub fn partition_key_property(&self) -> &str {
        partition_key_property(&self.partition_key_path)
    }
}

/// Ensure the database exists.
pub async fn ensure_database(
    service: &dyn GraphService,
    name: &str,
) -> Result<DatabaseRef, GraphError> {
    let database = service.ensure_database(name).await?;
    tracing::info!(database = %database.id, "Database ready");
    Ok(database)
}

/// Ensure the graph container exists inside `database`.
pub async fn ensure_graph(
    service: &dyn GraphService,
    database: &DatabaseRef,
    spec: &GraphSpec,
) -> Result<GraphRef, GraphError> {
    let graph = service.ensure_graph(database, spec).await?;
    tracing::info!(
        database = %graph.database,
        graph = %graph.id,
        throughput = spec.offer_throughput,
        "Graph container ready"
    );
    Ok(graph)
}
