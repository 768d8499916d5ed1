//! The quickstart sequence.
//!
//! `LoadConfig → Connect → EnsureDatabase → EnsureGraph → ClearData →
//! SeedVertices → SeedEdges → RunTraversalQuery → ProjectAndPrint`.
//! Stages run strictly one after another and the first failure ends the run.
//! Nothing is rolled back: every stage is idempotent, so rerunning converges.

use std::io::Write;
use std::path::Path;

use cosmos_core::CosmosSettings;
use cosmos_graph::provision::{ensure_database, ensure_graph};
use cosmos_graph::{CosmosClient, GraphService, GraphSpec, ProjectionError, QueryRunner, Vertex};

use crate::error::{QuickstartError, Result, Stage, StageContext};
use crate::seed::{self, Person, FRIENDSHIPS, PEOPLE, THOMAS};

pub fn load_settings(path: impl AsRef<Path>) -> Result<CosmosSettings> {
    CosmosSettings::load(path).at(Stage::LoadConfig)
}

pub fn connect(settings: &CosmosSettings) -> Result<CosmosClient> {
    let client = CosmosClient::from_settings(settings).at(Stage::Connect)?;
    tracing::info!(
        endpoint = %client.endpoint(),
        gremlin = client.gremlin_endpoint(),
        "Cosmos DB client ready"
    );
    Ok(client)
}

/// Render one person as `<firstName> <lastName> (age <age>)`.
pub fn describe_person(vertex: &Vertex) -> std::result::Result<String, ProjectionError> {
    let first: String = vertex.property("firstName")?;
    let last: String = vertex.property("lastName")?;
    let age: i64 = vertex.property("age")?;
    Ok(format!("{first} {last} (age {age})"))
}

/// Write the sample people and friendships. Safe to repeat.
///
/// `partition_key` is the property every vertex carries its partition value in.
pub async fn seed_graph(runner: &QueryRunner<'_>, partition_key: &str) -> Result<()> {
    for person in &PEOPLE {
        runner
            .run(&seed::upsert_person(person, partition_key))
            .await
            .at(Stage::SeedVertices)?;
    }
    for edge in &FRIENDSHIPS {
        runner
            .run(&seed::upsert_knows(edge))
            .await
            .at(Stage::SeedEdges)?;
    }
    tracing::info!(
        vertices = PEOPLE.len(),
        edges = FRIENDSHIPS.len(),
        "Sample graph seeded"
    );
    Ok(())
}

fn print_known<W: Write>(
    out: &mut W,
    origin: &Person,
    known: &[Vertex],
) -> std::result::Result<(), QuickstartError> {
    // Project everything first so a bad vertex prints nothing.
    let lines = known
        .iter()
        .map(describe_person)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    writeln!(out, "{} knows:", origin.first_name)?;
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Everything after `Connect`, against any [`GraphService`].
pub struct Quickstart<'a> {
    service: &'a dyn GraphService,
    settings: &'a CosmosSettings,
}

impl<'a> Quickstart<'a> {
    pub fn new(service: &'a dyn GraphService, settings: &'a CosmosSettings) -> Self {
        Self { service, settings }
    }

    pub async fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let database = ensure_database(self.service, &self.settings.database_name)
            .await
            .at(Stage::EnsureDatabase)?;
        let spec = GraphSpec::from(self.settings);
        let graph = ensure_graph(self.service, &database, &spec)
            .await
            .at(Stage::EnsureGraph)?;
        // An existing container keeps the key it was created with.
        let partition_key = graph
            .partition_key_property()
            .unwrap_or_else(|| spec.partition_key_property());

        let runner = QueryRunner::new(self.service, &graph);
        runner
            .run(&seed::drop_all())
            .await
            .at(Stage::ClearData)?;
        seed_graph(&runner, partition_key).await?;

        let known: Vec<Vertex> = runner
            .collect(&seed::known_by(&THOMAS))
            .await
            .at(Stage::RunTraversalQuery)?;
        tracing::info!(origin = THOMAS.id, results = known.len(), "Traversal complete");

        print_known(out, &THOMAS, &known).at(Stage::ProjectAndPrint)
    }
}
