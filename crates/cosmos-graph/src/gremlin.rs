//! Gremlin Server WebSocket protocol, as spoken by the Cosmos DB Gremlin endpoint.
//!
//! Requests are binary frames: one length byte, the mime type, then a JSON
//! message. Each response frame carries a status code; `206` means more
//! frames follow for the same request, `200`/`204` close it, `407` is a SASL
//! challenge answered with the account credentials.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::client::{GraphError, ResultCursor, Statement};
use crate::graphson;

pub const MIME_TYPE: &str = "application/vnd.gremlin-v2.0+json";

/// Response status codes used by the driver.
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    pub const PARTIAL_CONTENT: u16 = 206;
    pub const UNAUTHORIZED: u16 = 401;
    pub const AUTHENTICATE: u16 = 407;
}

const REQUEST_CHARGE_ATTR: &str = "x-ms-request-charge";

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A lazily opened, reusable WebSocket. `None` until the first query.
pub(crate) type SessionSlot = Arc<Mutex<Option<WsStream>>>;

/// SASL PLAIN credentials: `/dbs/{db}/colls/{graph}` and the account key.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn typed_uuid(id: Uuid) -> Value {
    json!({ "@type": "g:UUID", "@value": id.to_string() })
}

fn frame(message: &Value) -> Result<Vec<u8>, GraphError> {
    let body = serde_json::to_vec(message)?;
    let mut out = Vec::with_capacity(1 + MIME_TYPE.len() + body.len());
    out.push(MIME_TYPE.len() as u8);
    out.extend_from_slice(MIME_TYPE.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Frame an `eval` request for `statement`.
pub fn eval_request(request_id: Uuid, statement: &Statement) -> Result<Vec<u8>, GraphError> {
    frame(&json!({
        "requestId": typed_uuid(request_id),
        "op": "eval",
        "processor": "",
        "args": {
            "gremlin": statement.text(),
            "bindings": statement.bindings(),
            "language": "gremlin-groovy",
        }
    }))
}

/// Frame the answer to a `407` challenge.
pub fn auth_request(request_id: Uuid, credentials: &Credentials) -> Result<Vec<u8>, GraphError> {
    let sasl = STANDARD.encode(format!(
        "\0{}\0{}",
        credentials.username, credentials.password
    ));
    frame(&json!({
        "requestId": typed_uuid(request_id),
        "op": "authentication",
        "processor": "",
        "args": { "sasl": sasl }
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attributes: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub data: Value,
}

/// One response frame.
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "requestId", default)]
    pub request_id: Value,
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: ResponseResult,
}

impl ResponseMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, GraphError> {
        let raw: Value = serde_json::from_slice(payload)?;
        Ok(serde_json::from_value(graphson::normalize(raw))?)
    }

    /// Frames without a request id are server-level errors for the open request.
    pub fn is_for(&self, request_id: Uuid) -> bool {
        match self.request_id.as_str() {
            Some(id) => id.eq_ignore_ascii_case(&request_id.to_string()),
            None => self.request_id.is_null(),
        }
    }

    pub fn request_charge(&self) -> f64 {
        self.status
            .attributes
            .get(REQUEST_CHARGE_ATTR)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    pub fn message(&self) -> &str {
        self.status.message.as_deref().unwrap_or("")
    }

    pub fn into_items(self) -> Vec<Value> {
        graphson::into_items(self.result.data)
    }
}

async fn connect(endpoint: &str) -> Result<WsStream, GraphError> {
    let (ws, _response) = connect_async(endpoint)
        .await
        .map_err(|e| GraphError::Connection(format!("{endpoint}: {e}")))?;
    tracing::info!(endpoint, "Connected to Gremlin endpoint");
    Ok(ws)
}

async fn send(ws: &mut WsStream, frame: Vec<u8>) -> Result<(), GraphError> {
    ws.send(Message::Binary(frame))
        .await
        .map_err(|e| GraphError::Connection(format!("failed to send request: {e}")))
}

/// Read frames until one answers `request_id`, handling SASL along the way.
async fn read_response(
    ws: &mut WsStream,
    request_id: Uuid,
    credentials: &Credentials,
) -> Result<ResponseMessage, GraphError> {
    loop {
        let message = match ws.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(GraphError::Connection(e.to_string())),
            None => {
                return Err(GraphError::Connection(
                    "connection closed by server".to_string(),
                ))
            }
        };

        let payload = match message {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(reason) => {
                return Err(GraphError::Connection(format!(
                    "server closed the connection: {reason:?}"
                )))
            }
            _ => continue,
        };

        let response = ResponseMessage::parse(&payload)?;
        if !response.is_for(request_id) {
            tracing::warn!(
                %request_id,
                other = %response.request_id,
                "Ignoring response for another request"
            );
            continue;
        }

        match response.status.code {
            status::AUTHENTICATE => {
                tracing::debug!(%request_id, "Answering SASL challenge");
                send(ws, auth_request(request_id, credentials)?).await?;
            }
            status::UNAUTHORIZED => {
                return Err(GraphError::Connection(format!(
                    "authentication rejected: {}",
                    response.message()
                )))
            }
            _ => return Ok(response),
        }
    }
}

/// Cursor over the response frames of one Gremlin request.
///
/// Holds the session lock until the final frame arrives, then hands the
/// socket back. Dropping it early discards the socket, so the next query
/// starts on a fresh connection instead of reading stale frames.
pub struct GremlinCursor {
    slot: OwnedMutexGuard<Option<WsStream>>,
    ws: Option<WsStream>,
    request_id: Uuid,
    credentials: Credentials,
    has_more: bool,
    request_charge: f64,
}

impl GremlinCursor {
    pub(crate) async fn open(
        slot: SessionSlot,
        endpoint: &str,
        credentials: Credentials,
        statement: &Statement,
    ) -> Result<Self, GraphError> {
        let mut slot = slot.lock_owned().await;
        let mut ws = match slot.take() {
            Some(ws) => ws,
            None => connect(endpoint).await?,
        };

        let request_id = Uuid::new_v4();
        send(&mut ws, eval_request(request_id, statement)?).await?;
        tracing::debug!(%request_id, gremlin = statement.text(), "Submitted Gremlin request");

        Ok(Self {
            slot,
            ws: Some(ws),
            request_id,
            credentials,
            has_more: true,
            request_charge: 0.0,
        })
    }
}

#[async_trait]
impl ResultCursor for GremlinCursor {
    fn has_more_results(&self) -> bool {
        self.has_more
    }

    async fn next_batch(&mut self) -> Result<Vec<Value>, GraphError> {
        if !self.has_more {
            return Ok(Vec::new());
        }
        let Some(mut ws) = self.ws.take() else {
            self.has_more = false;
            return Err(GraphError::Connection("session already closed".to_string()));
        };

        let response = match read_response(&mut ws, self.request_id, &self.credentials).await {
            Ok(response) => response,
            Err(e) => {
                self.has_more = false;
                return Err(e);
            }
        };
        self.request_charge += response.request_charge();

        match response.status.code {
            status::PARTIAL_CONTENT => {
                self.ws = Some(ws);
                Ok(response.into_items())
            }
            status::SUCCESS | status::NO_CONTENT => {
                self.has_more = false;
                *self.slot = Some(ws);
                Ok(response.into_items())
            }
            code => {
                self.has_more = false;
                *self.slot = Some(ws);
                Err(GraphError::Query {
                    status: code,
                    message: response.message().to_string(),
                })
            }
        }
    }

    fn request_charge(&self) -> f64 {
        self.request_charge
    }
}
