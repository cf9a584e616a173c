//! Streamable HTTP transport for MCP servers.
//!
//! Every JSON-RPC message is POSTed to the server URL. The server answers
//! either with a JSON body or with an SSE stream carrying the response. The
//! `Mcp-Session-Id` header handed out by `initialize` is echoed on every
//! later request, and a DELETE with that header ends the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use crate::mcp::error::McpError;
use crate::mcp::transports::sse::SseDecoder;
use crate::mcp::transports::BaseTransport;
use crate::mcp::types::{JsonRpcMessage, JsonRpcRequest};

/// Header carrying the server-assigned session id.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// HTTP/Streamable HTTP transport for connecting to remote MCP servers.
pub struct HTTPTransport {
    /// Server URL (e.g., "http://localhost:3000/mcp").
    pub url: String,
    /// Extra HTTP headers sent with every request.
    pub headers: HashMap<String, String>,
    client: reqwest::Client,
    session_id: RwLock<Option<String>>,
    next_id: AtomicU64,
    is_connected: AtomicBool,
}

impl std::fmt::Debug for HTTPTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HTTPTransport")
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("session_id", &*self.session_id.read())
            .field("connected", &self.connected())
            .finish()
    }
}

impl HTTPTransport {
    /// Create a new HTTPTransport.
    ///
    /// # Arguments
    /// * `url` - Server URL.
    /// * `headers` - Optional HTTP headers.
    pub fn new(url: &str, headers: Option<HashMap<String, String>>) -> Self {
        Self {
            url: url.to_string(),
            headers: headers.unwrap_or_default(),
            client: reqwest::Client::new(),
            session_id: RwLock::new(None),
            next_id: AtomicU64::new(1),
            is_connected: AtomicBool::new(false),
        }
    }

    /// Session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response, McpError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(session_id) = self.session_id() {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request.send().await?;

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut guard = self.session_id.write();
            if guard.as_deref() != Some(session_id) {
                *guard = Some(session_id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Pull the response to request `id` out of an SSE byte stream.
///
/// Server-initiated notifications and requests interleaved on the stream
/// are skipped.
pub async fn read_event_stream<S, E>(stream: S, id: u64) -> Result<JsonRpcMessage, McpError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<McpError>,
{
    futures::pin_mut!(stream);
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        for event in decoder.push(&chunk) {
            if let Some(message) = decode_event_data(&event.data, id)? {
                return Ok(message);
            }
        }
    }
    if let Some(event) = decoder.finish() {
        if let Some(message) = decode_event_data(&event.data, id)? {
            return Ok(message);
        }
    }
    Err(McpError::protocol(format!(
        "event stream closed before response to request {}",
        id
    )))
}

fn decode_event_data(data: &str, id: u64) -> Result<Option<JsonRpcMessage>, McpError> {
    if data.trim().is_empty() {
        return Ok(None);
    }
    let message: JsonRpcMessage = serde_json::from_str(data)?;
    if message.answers(id) {
        Ok(Some(message))
    } else {
        log::trace!("Skipping unrelated MCP stream message: {}", data);
        Ok(None)
    }
}

#[async_trait]
impl BaseTransport for HTTPTransport {
    fn connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = JsonRpcRequest::new(id, method, params);
        log::debug!("MCP request {} -> {} ({})", id, method, self.url);

        let response = self.post(&message).await?;
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);

        let reply = if is_stream {
            read_event_stream(response.bytes_stream(), id).await?
        } else {
            let body = response.bytes().await?;
            serde_json::from_slice::<JsonRpcMessage>(&body)?
        };

        if method == "initialize" {
            self.is_connected.store(true, Ordering::Release);
        }
        reply.into_result()
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let message = JsonRpcRequest::notification(method, params);
        self.post(&message).await.map(|_| ())
    }

    async fn disconnect(&self) -> Result<(), McpError> {
        if !self.is_connected.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        log::info!("HTTP transport disconnecting from: {}", self.url);

        let session_id = self.session_id.write().take();
        if let Some(session_id) = session_id {
            let mut request = self.client.delete(&self.url).header(SESSION_HEADER, session_id);
            for (name, value) in &self.headers {
                request = request.header(name, value);
            }
            let response = request.send().await?;
            // 405 means the server does not support explicit termination.
            if !response.status().is_success()
                && response.status() != reqwest::StatusCode::METHOD_NOT_ALLOWED
            {
                log::debug!(
                    "MCP session termination returned HTTP {}",
                    response.status()
                );
            }
        }
        Ok(())
    }

    fn server_identifier(&self) -> String {
        format!("http:{}", self.url)
    }
}
