//! cosmos-core: connection settings and configuration errors for the Cosmos DB Gremlin quickstart.
//!
//! This crate provides the pieces every other crate in the workspace agrees on:
//! - The typed [`CosmosSettings`] record and its loader
//! - The configuration error type

pub mod config;
pub mod error;

pub use crate::config::CosmosSettings;
pub use crate::error::ConfigError;
