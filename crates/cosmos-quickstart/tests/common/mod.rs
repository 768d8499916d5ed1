//! In-memory graph service that understands the quickstart's statements.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use cosmos_core::CosmosSettings;
use cosmos_graph::{
    DatabaseRef, GraphError, GraphRef, GraphService, GraphSpec, ResultCursor, Statement,
};
use cosmos_quickstart::seed;

struct EdgeRow {
    id: String,
    label: String,
    from: String,
    to: String,
}

#[derive(Default)]
struct State {
    databases: HashMap<String, DatabaseRef>,
    graphs: HashMap<String, GraphRef>,
    creates: usize,
    vertices: Vec<Value>,
    edges: Vec<EdgeRow>,
    submitted: Vec<String>,
}

pub struct InMemoryGraph {
    state: Mutex<State>,
    page_size: usize,
    fail_on: Option<&'static str>,
}

impl InMemoryGraph {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size,
            fail_on: None,
        }
    }

    /// Reject every submission of `gremlin` with a server-side error.
    pub fn failing_on(page_size: usize, gremlin: &'static str) -> Self {
        Self {
            fail_on: Some(gremlin),
            ..Self::new(page_size)
        }
    }

    pub fn vertex_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .vertices
            .iter()
            .filter_map(|v| v["id"].as_str().map(str::to_owned))
            .collect()
    }

    /// First value of `name` on vertex `id`.
    pub fn vertex_property(&self, id: &str, name: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state
            .vertex(id)
            .and_then(|v| v["properties"][name][0].get("value"))
            .cloned()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }
}

fn binding<'a>(stmt: &'a Statement, name: &str) -> Result<&'a Value, GraphError> {
    stmt.binding(name).ok_or_else(|| GraphError::Query {
        status: 597,
        message: format!("unbound variable {name}"),
    })
}

fn binding_str<'a>(stmt: &'a Statement, name: &str) -> Result<&'a str, GraphError> {
    binding(stmt, name)?.as_str().ok_or_else(|| GraphError::Query {
        status: 597,
        message: format!("{name} is not a string"),
    })
}

fn property(id: &str, name: &str, value: &Value) -> Value {
    json!([{ "id": format!("{id}|{name}"), "value": value }])
}

impl State {
    fn vertex(&self, id: &str) -> Option<&Value> {
        self.vertices.iter().find(|v| v["id"] == id)
    }

    /// Like the real service, a vertex without a value for the container's
    /// partition key is rejected.
    fn apply(
        &mut self,
        stmt: &Statement,
        partition_key: Option<&str>,
    ) -> Result<Vec<Value>, GraphError> {
        match stmt.text() {
            seed::DROP_ALL => {
                self.vertices.clear();
                self.edges.clear();
                Ok(Vec::new())
            }
            seed::UPSERT_PERSON => {
                let pid = binding_str(stmt, "pid")?;
                if let Some(existing) = self.vertex(pid) {
                    return Ok(vec![existing.clone()]);
                }
                let pk_name = binding_str(stmt, "pkName")?;
                if partition_key.is_some_and(|expected| expected != pk_name) {
                    return Err(GraphError::Query {
                        status: 400,
                        message: format!("vertex is missing partition key property {pk_name}"),
                    });
                }
                let mut vertex = json!({
                    "id": pid,
                    "label": binding_str(stmt, "vlabel")?,
                    "type": "vertex",
                    "properties": {
                        "firstName": property(pid, "firstName", binding(stmt, "firstName")?),
                        "lastName": property(pid, "lastName", binding(stmt, "lastName")?),
                        "age": property(pid, "age", binding(stmt, "age")?),
                    }
                });
                vertex["properties"][pk_name] = property(pid, pk_name, &json!(pid));
                self.vertices.push(vertex.clone());
                Ok(vec![vertex])
            }
            seed::UPSERT_EDGE => {
                let (src, dst, rel) = (
                    binding_str(stmt, "src")?,
                    binding_str(stmt, "dst")?,
                    binding_str(stmt, "rel")?,
                );
                if self.vertex(src).is_none() || self.vertex(dst).is_none() {
                    return Ok(Vec::new());
                }
                if !self
                    .edges
                    .iter()
                    .any(|e| e.from == src && e.to == dst && e.label == rel)
                {
                    self.edges.push(EdgeRow {
                        id: format!("e{}", self.edges.len() + 1),
                        label: rel.to_string(),
                        from: src.to_string(),
                        to: dst.to_string(),
                    });
                }
                let edge = self
                    .edges
                    .iter()
                    .find(|e| e.from == src && e.to == dst && e.label == rel)
                    .map(|e| {
                        json!({
                            "id": e.id, "label": e.label, "type": "edge",
                            "outV": e.from, "inV": e.to,
                            "outVLabel": "person", "inVLabel": "person"
                        })
                    });
                Ok(edge.into_iter().collect())
            }
            seed::OUT_NEIGHBOURS => {
                let pid = binding_str(stmt, "pid")?;
                let rel = binding_str(stmt, "rel")?;
                Ok(self
                    .edges
                    .iter()
                    .filter(|e| e.from == pid && e.label == rel)
                    .filter_map(|e| self.vertex(&e.to).cloned())
                    .collect())
            }
            other => Err(GraphError::Query {
                status: 599,
                message: format!("unsupported traversal: {other}"),
            }),
        }
    }
}

#[async_trait]
impl GraphService for InMemoryGraph {
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, GraphError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.databases.get(id) {
            return Ok(existing.clone());
        }
        state.creates += 1;
        let database = DatabaseRef {
            id: id.to_string(),
            rid: format!("db-{}", state.creates),
        };
        state.databases.insert(id.to_string(), database.clone());
        Ok(database)
    }

    async fn ensure_graph(
        &self,
        database: &DatabaseRef,
        spec: &GraphSpec,
    ) -> Result<GraphRef, GraphError> {
        let mut state = self.state.lock().unwrap();
        let link = format!("dbs/{}/colls/{}", database.id, spec.id);
        if let Some(existing) = state.graphs.get(&link) {
            return Ok(existing.clone());
        }
        state.creates += 1;
        let graph = GraphRef {
            database: database.id.clone(),
            id: spec.id.clone(),
            rid: format!("coll-{}", state.creates),
            partition_key_path: Some(spec.partition_key_path.clone()),
        };
        state.graphs.insert(link, graph.clone());
        Ok(graph)
    }

    async fn submit(
        &self,
        graph: &GraphRef,
        statement: &Statement,
    ) -> Result<Box<dyn ResultCursor>, GraphError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(statement.text().to_string());
        if self.fail_on == Some(statement.text()) {
            return Err(GraphError::Query {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        let items = state.apply(statement, graph.partition_key_property())?;
        Ok(Box::new(BufferedCursor::paged(items, self.page_size)))
    }
}

/// Cursor that pages out an already materialized result.
struct BufferedCursor {
    pages: VecDeque<Vec<Value>>,
}

impl BufferedCursor {
    fn paged(items: Vec<Value>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let mut pages = VecDeque::new();
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            pages.push_back(items.by_ref().take(page_size).collect());
        }
        Self { pages }
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

pub fn settings() -> CosmosSettings {
    CosmosSettings {
        endpoint: "https://quickstart.documents.azure.com:443/".to_string(),
        auth_key: "c2VjcmV0LWtleQ==".to_string(),
        database_name: "graphdb".to_string(),
        graph_name: "Persons".to_string(),
        offer_throughput: 400,
        gremlin_endpoint: None,
        partition_key_path: "/pk".to_string(),
    }
}
