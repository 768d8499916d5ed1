//! The Cosmos DB implementation of [`GraphService`].
//!
//! Databases and graph containers are provisioned through the REST API;
//! queries go over the Gremlin WebSocket endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use cosmos_core::CosmosSettings;

use crate::auth::{http_date, MasterKey};
use crate::client::{DatabaseRef, GraphError, GraphRef, GraphService, ResultCursor, Statement};
use crate::gremlin::{Credentials, GremlinCursor, SessionSlot};
use crate::provision::GraphSpec;

const API_VERSION: &str = "2018-12-31";
const DOCUMENTS_HOST_SUFFIX: &str = ".documents.azure.com";
const GREMLIN_HOST_SUFFIX: &str = ".gremlin.cosmos.azure.com";
const EMULATOR_GREMLIN_PORT: u16 = 8901;

#[derive(Debug, Clone, Copy)]
enum ResourceType {
    Database,
    Collection,
}

impl ResourceType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Database => "dbs",
            Self::Collection => "colls",
        }
    }
}

/// The subset of a REST resource body the client reads.
#[derive(Debug, Deserialize)]
struct ResourceBody {
    id: String,
    #[serde(rename = "_rid", default)]
    rid: String,
    #[serde(rename = "partitionKey", default)]
    partition_key: Option<PartitionKeyBody>,
}

#[derive(Debug, Deserialize)]
struct PartitionKeyBody {
    #[serde(default)]
    paths: Vec<String>,
}

/// Derive the Gremlin WebSocket URI from the account endpoint.
///
/// `https://acct.documents.azure.com:443/` becomes
/// `wss://acct.gremlin.cosmos.azure.com:443/`; the local emulator serves
/// Gremlin on plain `ws://` port 8901.
pub fn gremlin_endpoint_for(endpoint: &Url) -> Result<String, GraphError> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| GraphError::InvalidConfig(format!("endpoint {endpoint} has no host")))?;

    if host == "localhost" || host == "127.0.0.1" {
        return Ok(format!("ws://{host}:{EMULATOR_GREMLIN_PORT}/"));
    }
    match host.strip_suffix(DOCUMENTS_HOST_SUFFIX) {
        Some(account) => Ok(format!("wss://{account}{GREMLIN_HOST_SUFFIX}:443/")),
        None => Ok(format!("wss://{host}:443/")),
    }
}

/// Connection handle to one Cosmos DB account.
///
/// Construction is purely local: the HTTP pool and the Gremlin WebSocket are
/// opened on first use, so connectivity problems surface from the first
/// provisioning or query call.
pub struct CosmosClient {
    http: Client,
    endpoint: Url,
    key: MasterKey,
    auth_key: String,
    gremlin_endpoint: String,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl CosmosClient {
    /// Build a client from the account endpoint and master key.
    pub fn new(endpoint: &str, auth_key: &str) -> Result<Self, GraphError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| GraphError::InvalidConfig(format!("endpoint {endpoint:?}: {e}")))?;
        if !matches!(endpoint.scheme(), "https" | "http") {
            return Err(GraphError::InvalidConfig(format!(
                "endpoint {endpoint} must use http or https"
            )));
        }
        let key = MasterKey::from_base64(auth_key)?;
        let gremlin_endpoint = gremlin_endpoint_for(&endpoint)?;

        Ok(Self {
            http: Client::new(),
            endpoint,
            key,
            auth_key: auth_key.trim().to_string(),
            gremlin_endpoint,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Build a client from loaded settings, honouring a Gremlin endpoint override.
    pub fn from_settings(settings: &CosmosSettings) -> Result<Self, GraphError> {
        let client = Self::new(&settings.endpoint, &settings.auth_key)?;
        Ok(match &settings.gremlin_endpoint {
            Some(uri) => client.with_gremlin_endpoint(uri),
            None => client,
        })
    }

    pub fn with_gremlin_endpoint(mut self, uri: &str) -> Self {
        self.gremlin_endpoint = uri.to_string();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn gremlin_endpoint(&self) -> &str {
        &self.gremlin_endpoint
    }

    // ── REST ─────────────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        resource_type: ResourceType,
        resource_link: &str,
        path: &str,
        body: Option<&Value>,
        offer_throughput: Option<u32>,
    ) -> Result<reqwest::Response, GraphError> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| GraphError::InvalidConfig(format!("bad resource path {path:?}: {e}")))?;
        let date = http_date(Utc::now());
        let token = self
            .key
            .authorization(method.as_str(), resource_type.as_str(), resource_link, &date);

        let mut request = self
            .http
            .request(method, url)
            .header("authorization", token)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION);
        if let Some(throughput) = offer_throughput {
            request = request.header("x-ms-offer-throughput", throughput.to_string());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                GraphError::Connection(format!("{}: {e}", self.endpoint))
            } else {
                GraphError::Http(e)
            }
        })
    }

    /// GET a resource by link; `None` when it does not exist.
    async fn read(
        &self,
        resource_type: ResourceType,
        link: &str,
    ) -> Result<Option<ResourceBody>, GraphError> {
        let response = self
            .send(Method::GET, resource_type, link, link, None, None)
            .await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(provisioning_error(link, response).await),
        }
    }

    /// POST a new resource under `parent_link`; `None` on a 409 conflict.
    async fn create(
        &self,
        resource_type: ResourceType,
        parent_link: &str,
        link: &str,
        body: &Value,
        offer_throughput: Option<u32>,
    ) -> Result<Option<ResourceBody>, GraphError> {
        let path = if parent_link.is_empty() {
            resource_type.as_str().to_string()
        } else {
            format!("{parent_link}/{}", resource_type.as_str())
        };
        let response = self
            .send(
                Method::POST,
                resource_type,
                parent_link,
                &path,
                Some(body),
                offer_throughput,
            )
            .await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::CONFLICT => Ok(None),
            _ => Err(provisioning_error(link, response).await),
        }
    }

    /// Read, create if missing, and read again if the create lost a race.
    async fn ensure(
        &self,
        resource_type: ResourceType,
        parent_link: &str,
        link: &str,
        body: Value,
        offer_throughput: Option<u32>,
    ) -> Result<(ResourceBody, bool), GraphError> {
        if let Some(existing) = self.read(resource_type, link).await? {
            return Ok((existing, false));
        }
        if let Some(created) = self
            .create(resource_type, parent_link, link, &body, offer_throughput)
            .await?
        {
            return Ok((created, true));
        }
        match self.read(resource_type, link).await? {
            Some(existing) => Ok((existing, false)),
            None => Err(GraphError::Provisioning {
                resource: link.to_string(),
                status: StatusCode::CONFLICT.as_u16(),
                message: "create reported a conflict but the resource is not readable".to_string(),
            }),
        }
    }

    // ── Gremlin ──────────────────────────────────────────────────

    async fn session(&self, graph: &GraphRef) -> SessionSlot {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(graph.resource_link())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }
}

async fn provisioning_error(resource: &str, response: reqwest::Response) -> GraphError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body);
    GraphError::Provisioning {
        resource: resource.to_string(),
        status,
        message,
    }
}

#[async_trait]
impl GraphService for CosmosClient {
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, GraphError> {
        let link = format!("dbs/{id}");
        let (body, created) = self
            .ensure(ResourceType::Database, "", &link, json!({ "id": id }), None)
            .await?;
        tracing::debug!(database = %body.id, rid = %body.rid, created, "Database resolved");
        Ok(DatabaseRef {
            id: body.id,
            rid: body.rid,
        })
    }

    async fn ensure_graph(
        &self,
        database: &DatabaseRef,
        spec: &GraphSpec,
    ) -> Result<GraphRef, GraphError> {
        let parent = database.resource_link();
        let link = format!("{parent}/colls/{}", spec.id);
        let body = json!({
            "id": spec.id,
            "partitionKey": { "paths": [spec.partition_key_path], "kind": "Hash" },
        });
        let (body, created) = self
            .ensure(
                ResourceType::Collection,
                &parent,
                &link,
                body,
                Some(spec.offer_throughput),
            )
            .await?;
        tracing::debug!(graph = %body.id, rid = %body.rid, created, "Graph container resolved");

        Ok(GraphRef {
            database: database.id.clone(),
            partition_key_path: body
                .partition_key
                .and_then(|pk| pk.paths.into_iter().next()),
            id: body.id,
            rid: body.rid,
        })
    }

    async fn submit(
        &self,
        graph: &GraphRef,
        statement: &Statement,
    ) -> Result<Box<dyn ResultCursor>, GraphError> {
        let credentials = Credentials {
            username: format!("/{}", graph.resource_link()),
            password: self.auth_key.clone(),
        };
        let slot = self.session(graph).await;
        let cursor =
            GremlinCursor::open(slot, &self.gremlin_endpoint, credentials, statement).await?;
        Ok(Box::new(cursor))
    }
}
