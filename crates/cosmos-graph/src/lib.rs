//! Cosmos Graph — client for the Azure Cosmos DB Gremlin API.
//!
//! Everything the quickstart asks of the remote service goes through the
//! [`GraphService`] trait: idempotent provisioning of the database and graph
//! container, and query submission returning a paged [`ResultCursor`].
//! [`CosmosClient`] is the production implementation; the query runner and
//! result projection work against any implementation.

pub mod auth;
pub mod client;
pub mod cosmos;
pub mod graphson;
pub mod gremlin;
pub mod projection;
pub mod provision;
pub mod runner;

pub use client::{
    partition_key_property, statement, DatabaseRef, GraphError, GraphRef, GraphService,
    ResultCursor, Statement,
};
pub use cosmos::CosmosClient;
pub use projection::{Edge, ProjectionError, PropertyType, Vertex, VertexProperty};
pub use provision::GraphSpec;
pub use runner::QueryRunner;
