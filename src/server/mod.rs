//! MCP tool server
//!
//! Built on `mcp-sdk-rs`: the SDK's [`Server`] drives the JSON-RPC session and
//! [`McpService`] answers `ping`, `tools/list` and `tools/call`. Each tool maps
//! onto one store operation and runs to completion under the store lock.
//!
//! Raw lines are screened before the SDK sees them. The SDK transport cannot
//! represent unparsable lines or `null` ids, so those are answered here, and
//! the `initialize` exchange is brought in line with current MCP clients.

pub mod tools;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use mcp_sdk_rs::error::{Error, ErrorCode};
use mcp_sdk_rs::protocol::{LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use mcp_sdk_rs::server::{Server, ServerHandler};
use mcp_sdk_rs::transport::Message;
use mcp_sdk_rs::transport::stdio::StdioTransport;
use mcp_sdk_rs::types::{ClientCapabilities, Implementation, ListToolsResult, ServerCapabilities};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::storage::LiteratureStore;

const SERVER_NAME: &str = "litshelf";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Deserialize)]
struct CallToolRequest {
    name: String,
    arguments: Option<Value>,
}

pub struct McpService {
    store: Arc<Mutex<LiteratureStore>>,
}

impl McpService {
    pub fn new(store: LiteratureStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes or the client sends `exit`
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let (read_tx, read_rx) = mpsc::channel::<String>(32);
        let (write_tx, mut write_rx) = mpsc::channel::<String>(32);

        // Stdin reader
        let reader = tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut lines = BufReader::new(stdin).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if read_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        // Stdout writer
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(msg) = write_rx.recv().await {
                debug!("send: {msg}");
                let _ = stdout.write_all(msg.as_bytes()).await;
                let _ = stdout.write_all(b"\n").await;
                let _ = stdout.flush().await;
            }
        });

        info!("{SERVER_NAME} v{SERVER_VERSION} starting on stdio");
        let served = self.serve(read_rx, write_tx).await;
        reader.abort();
        let _ = writer.await;
        info!("{SERVER_NAME} shutting down");
        served
    }

    /// Run one session over line channels: raw client lines in, outgoing messages out.
    pub async fn serve(&self, mut lines: mpsc::Receiver<String>, out: mpsc::Sender<String>) -> anyhow::Result<()> {
        let (sdk_tx, sdk_rx) = mpsc::channel::<String>(32);
        let (sdk_out_tx, mut sdk_out_rx) = mpsc::channel::<String>(32);
        let pending: Arc<Mutex<Option<Handshake>>> = Arc::default();

        let direct = out.clone();
        let awaiting = pending.clone();
        let screener = tokio::spawn(async move {
            while let Some(line) = lines.recv().await {
                debug!("recv: {line}");
                let forward = match screen_line(&line) {
                    Inbound::Skip => continue,
                    Inbound::Reply(reply) => {
                        if direct.send(reply).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Inbound::Initialize { line, handshake } => {
                        *awaiting.lock().unwrap_or_else(PoisonError::into_inner) = Some(handshake);
                        line
                    }
                    Inbound::Forward(line) => line,
                };
                if sdk_tx.send(forward).await.is_err() {
                    break;
                }
            }
        });

        let relay = tokio::spawn(async move {
            while let Some(message) = sdk_out_rx.recv().await {
                let message = finish_handshake(&pending, message);
                if out.send(message).await.is_err() {
                    break;
                }
            }
        });

        let transport = StdioTransport::new(sdk_rx, sdk_out_tx);
        let server = Server::new(Arc::new(transport), Arc::new(self.clone()));
        let served = server.start().await;

        screener.abort();
        drop(server);
        let _ = relay.await;
        served?;
        Ok(())
    }

    fn call_tool(&self, request: CallToolRequest) -> Result<Value, Error> {
        let reply = {
            let mut store = self
                .store
                .lock()
                .map_err(|_| Error::protocol(ErrorCode::InternalError, "store lock poisoned"))?;
            tools::call_tool(&mut store, &request.name, request.arguments.unwrap_or(Value::Null))
        };
        info!(tool = %request.name, error = reply.is_error(), "tool call");
        reply
            .into_value()
            .map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))
    }
}

impl Clone for McpService {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

#[async_trait]
impl ServerHandler for McpService {
    async fn initialize(
        &self,
        implementation: Implementation,
        _capabilities: ClientCapabilities,
    ) -> Result<ServerCapabilities, Error> {
        info!(client = %implementation.name, version = %implementation.version, "initialize");
        Ok(ServerCapabilities {
            tools: Some(json!({ "listChanged": false })),
            ..ServerCapabilities::default()
        })
    }

    async fn shutdown(&self) -> Result<(), Error> {
        info!("shutdown requested");
        Ok(())
    }

    async fn handle_method(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        match method {
            "ping" => Ok(json!({})),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: tools::list_tools(),
                    next_cursor: None,
                };
                let mut value =
                    serde_json::to_value(result).map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))?;
                mark_object_schemas(&mut value);
                Ok(value)
            }
            "tools/call" => {
                let params = params.ok_or_else(|| Error::protocol(ErrorCode::InvalidParams, "missing params"))?;
                let request: CallToolRequest = serde_json::from_value(params)
                    .map_err(|e| Error::protocol(ErrorCode::InvalidParams, e.to_string()))?;
                self.call_tool(request)
            }
            _ => {
                warn!("unknown method: {method}");
                Err(Error::protocol(ErrorCode::MethodNotFound, format!("Method not found: {method}")))
            }
        }
    }
}

/// Every tool takes a JSON object; the SDK's schema type has no slot for that.
fn mark_object_schemas(list: &mut Value) {
    let Some(tools) = list.get_mut("tools").and_then(Value::as_array_mut) else {
        return;
    };
    for tool in tools {
        if let Some(Value::Object(schema)) = tool.get_mut("inputSchema") {
            schema.insert("type".into(), json!("object"));
        }
    }
}

/// An `initialize` request waiting for its response
#[derive(Debug, Clone, PartialEq)]
struct Handshake {
    id: Value,
    protocol_version: &'static str,
}

#[derive(Debug, PartialEq)]
enum Inbound {
    /// Hand the (possibly normalised) line to the SDK
    Forward(String),
    /// An `initialize` request; its response gets the handshake fields
    Initialize { line: String, handshake: Handshake },
    /// Answer directly; the SDK never sees the line
    Reply(String),
    Skip,
}

fn error_line(id: Value, code: ErrorCode, message: impl Into<String>) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": i32::from(code), "message": message.into() },
    })
    .to_string()
}

/// Decide what happens to one raw line before it reaches the SDK.
///
/// Only lines that parse as an SDK request or notification are forwarded.
fn screen_line(line: &str) -> Inbound {
    let line = line.trim();
    if line.is_empty() {
        return Inbound::Skip;
    }

    let mut message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => return Inbound::Reply(error_line(Value::Null, ErrorCode::ParseError, format!("Parse error: {e}"))),
    };
    let Some(object) = message.as_object_mut() else {
        return Inbound::Reply(error_line(Value::Null, ErrorCode::InvalidRequest, "expected a JSON-RPC object"));
    };

    // MCP ids are strings or integers; anything else would read as a notification
    let id = object.get("id").cloned();
    if let Some(id) = &id {
        if !(id.is_string() || id.is_i64()) {
            return Inbound::Reply(error_line(
                Value::Null,
                ErrorCode::InvalidRequest,
                format!("invalid request id: {id}"),
            ));
        }
    }

    let Some(method) = object.get("method").and_then(Value::as_str).map(str::to_owned) else {
        if object.contains_key("result") || object.contains_key("error") {
            debug!("ignoring response from client");
            return Inbound::Skip;
        }
        return Inbound::Reply(error_line(id.unwrap_or(Value::Null), ErrorCode::InvalidRequest, "missing method"));
    };

    let mut handshake = None;
    match method.as_str() {
        "notifications/initialized" => {
            object.insert("method".into(), json!("initialized"));
        }
        "initialize" => {
            let params = object.entry("params").or_insert_with(|| json!({}));
            let mut requested = None;
            if let Value::Object(params) = params {
                requested = params.get("protocolVersion").and_then(Value::as_str).map(str::to_owned);
                if !params.contains_key("implementation") {
                    let client = params
                        .get("clientInfo")
                        .filter(|c| serde_json::from_value::<Implementation>((*c).clone()).is_ok())
                        .cloned()
                        .unwrap_or_else(|| json!({ "name": "unknown", "version": "unknown" }));
                    params.insert("implementation".into(), client);
                }
                params.entry("capabilities").or_insert_with(|| json!({}));
            }
            if let Some(id) = &id {
                handshake = Some(Handshake {
                    id: id.clone(),
                    protocol_version: negotiate(requested.as_deref()),
                });
            }
        }
        _ => {}
    }

    let line = message.to_string();
    match serde_json::from_str::<Message>(&line) {
        Ok(Message::Request(_) | Message::Notification(_)) => match handshake {
            Some(handshake) => Inbound::Initialize { line, handshake },
            None => Inbound::Forward(line),
        },
        _ => Inbound::Reply(error_line(
            id.unwrap_or(Value::Null),
            ErrorCode::InvalidRequest,
            "not a JSON-RPC 2.0 request",
        )),
    }
}

fn negotiate(requested: Option<&str>) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| Some(*v) == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

fn finish_handshake(pending: &Mutex<Option<Handshake>>, message: String) -> String {
    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(handshake) = pending.as_ref() else {
        return message;
    };
    match complete_initialize(&message, handshake) {
        Some(completed) => {
            *pending = None;
            completed
        }
        None => message,
    }
}

/// Wrap the SDK's bare capabilities in a full `initialize` result.
/// `None` when `message` is not the response to `handshake`.
fn complete_initialize(message: &str, handshake: &Handshake) -> Option<String> {
    let mut response: Value = serde_json::from_str(message).ok()?;
    if response.get("id") != Some(&handshake.id) {
        return None;
    }
    if let Some(capabilities) = response.get_mut("result").map(Value::take) {
        response["result"] = json!({
            "protocolVersion": handshake.protocol_version,
            "capabilities": capabilities,
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        });
    }
    Some(response.to_string())
}
