//! cosmos-quickstart: provision a Cosmos DB graph, seed a tiny social graph and
//! print who Thomas knows.

pub mod error;
pub mod pipeline;
pub mod seed;

pub use error::{QuickstartError, Stage, StageError};
pub use pipeline::Quickstart;
