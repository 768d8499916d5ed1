//! Error types for the cosmos-quickstart crate.

use std::fmt;

use thiserror::Error;

use cosmos_core::ConfigError;
use cosmos_graph::{GraphError, ProjectionError};

#[derive(Error, Debug)]
pub enum QuickstartError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The fixed sequence the quickstart walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadConfig,
    Connect,
    EnsureDatabase,
    EnsureGraph,
    ClearData,
    SeedVertices,
    SeedEdges,
    RunTraversalQuery,
    ProjectAndPrint,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadConfig => "loading configuration",
            Self::Connect => "creating the Cosmos DB client",
            Self::EnsureDatabase => "ensuring the database",
            Self::EnsureGraph => "ensuring the graph container",
            Self::ClearData => "clearing existing data",
            Self::SeedVertices => "seeding vertices",
            Self::SeedEdges => "seeding edges",
            Self::RunTraversalQuery => "running the traversal query",
            Self::ProjectAndPrint => "printing results",
        };
        f.write_str(name)
    }
}

/// A failure, tagged with the stage it aborted.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: QuickstartError,
}

/// Tag a result's error with the stage that produced it.
pub trait StageContext<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<QuickstartError>,
{
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            source: e.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, StageError>;
