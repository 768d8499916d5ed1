//! In-memory stand-in for the remote service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use cosmos_graph::{
    DatabaseRef, GraphError, GraphRef, GraphService, GraphSpec, ResultCursor, Statement,
};

/// Provisioning is create-if-absent over hash maps; queries answer with
/// pages scripted per Gremlin text.
#[derive(Default)]
pub struct ScriptedService {
    databases: Mutex<HashMap<String, DatabaseRef>>,
    graphs: Mutex<HashMap<String, (GraphRef, u32)>>,
    creates: Mutex<usize>,
    pages: Mutex<HashMap<String, Vec<Vec<Value>>>>,
    submitted: Mutex<Vec<Statement>>,
    deny_database: Option<String>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer ensure_database(name) with a 403, as an account without rights would.
    pub fn denying_database(name: &str) -> Self {
        Self {
            deny_database: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn script(&self, gremlin: &str, pages: Vec<Vec<Value>>) {
        self.pages.lock().unwrap().insert(gremlin.to_string(), pages);
    }

    pub fn creates(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    pub fn throughput_of(&self, database: &str, graph: &str) -> Option<u32> {
        self.graphs
            .lock()
            .unwrap()
            .get(&format!("dbs/{database}/colls/{graph}"))
            .map(|(_, throughput)| *throughput)
    }

    pub fn submitted(&self) -> Vec<Statement> {
        self.submitted.lock().unwrap().clone()
    }

    fn next_rid(&self) -> String {
        let mut creates = self.creates.lock().unwrap();
        *creates += 1;
        format!("rid-{creates}")
    }
}

#[async_trait]
impl GraphService for ScriptedService {
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, GraphError> {
        if self.deny_database.as_deref() == Some(id) {
            return Err(GraphError::Provisioning {
                resource: format!("dbs/{id}"),
                status: 403,
                message: "Forbidden".to_string(),
            });
        }
        if let Some(existing) = self.databases.lock().unwrap().get(id) {
            return Ok(existing.clone());
        }
        let database = DatabaseRef {
            id: id.to_string(),
            rid: self.next_rid(),
        };
        self.databases
            .lock()
            .unwrap()
            .insert(id.to_string(), database.clone());
        Ok(database)
    }

    async fn ensure_graph(
        &self,
        database: &DatabaseRef,
        spec: &GraphSpec,
    ) -> Result<GraphRef, GraphError> {
        let link = format!("dbs/{}/colls/{}", database.id, spec.id);
        if let Some((existing, _)) = self.graphs.lock().unwrap().get(&link) {
            return Ok(existing.clone());
        }
        let graph = GraphRef {
            database: database.id.clone(),
            id: spec.id.clone(),
            rid: self.next_rid(),
            partition_key_path: Some(spec.partition_key_path.clone()),
        };
        self.graphs
            .lock()
            .unwrap()
            .insert(link, (graph.clone(), spec.offer_throughput));
        Ok(graph)
    }

    async fn submit(
        &self,
        _graph: &GraphRef,
        statement: &Statement,
    ) -> Result<Box<dyn ResultCursor>, GraphError> {
        self.submitted.lock().unwrap().push(statement.clone());
        let pages = self
            .pages
            .lock()
            .unwrap()
            .get(statement.text())
            .cloned()
            .ok_or_else(|| GraphError::Query {
                status: 597,
                message: format!("no script for {}", statement.text()),
            })?;
        Ok(Box::new(BufferedCursor::new(pages)))
    }
}

/// Cursor over batches that are already in memory.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    pages: VecDeque<Vec<Value>>,
}

impl BufferedCursor {
    pub fn new(pages: Vec<Vec<Value>>) -> Self {
        Self {
            pages: pages.into(),
        }
    }
}

#[async_trait]
impl ResultCursor for BufferedCursor {
    fn has_more_results(&self) -> bool {
        !self.pages.is_empty()
    }

    async fn next_batch(&mut self) -> Result<Vec<Value>, GraphError> {
        Ok(self.pages.pop_front().unwrap_or_default())
    }
}

/// Yields its good pages, then fails the way a dropped partial response would.
pub struct FailingCursor {
    pub good_pages: Vec<Vec<Value>>,
    pub fetches: usize,
}

#[async_trait]
impl ResultCursor for FailingCursor {
    fn has_more_results(&self) -> bool {
        true
    }

    async fn next_batch(&mut self) -> Result<Vec<Value>, GraphError> {
        self.fetches += 1;
        if self.good_pages.is_empty() {
            return Err(GraphError::Query {
                status: 500,
                message: "partition unavailable".to_string(),
            });
        }
        Ok(self.good_pages.remove(0))
    }
}

pub fn graph_ref() -> GraphRef {
    GraphRef {
        database: "graphdb".to_string(),
        id: "Persons".to_string(),
        rid: "rid-graph".to_string(),
        partition_key_path: Some("/pk".to_string()),
    }
}
