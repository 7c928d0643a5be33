//! MCP Server Implementation
//!
//! JSON-RPC dispatch over any async reader/writer pair. Every
//! request gets exactly one response, in arrival order, except the
//! `initialized` notification which gets none.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::tools::ToolRegistry;
use crate::storage::SharedStore;
use anyhow::Result;
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// MCP Server state and configuration
pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    connection_state: RwLock<ConnectionState>,
}

/// Connection state tracking. Advisory only: requests are served in any
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl McpServer {
    /// Create a server exposing the todo tools and resources over `store`
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self {
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities::todo_server(),
            tools: ToolRegistry::with_store(SharedStore::clone(&store)),
            resources: ResourceRegistry::with_store(store),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
        }
    }

    /// Get current connection state
    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    async fn set_connection_state(&self, state: ConnectionState) {
        *self.connection_state.write().await = state;
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");

        let mut stdout = io::stdout();
        self.serve(BufReader::new(io::stdin()), &mut stdout).await
    }

    /// Serve until the reader reaches end of input. Requests are framed by
    /// JSON value, so one may span several lines or share a line with
    /// others. A failed read ends the session quietly; a failed write is
    /// returned.
    #[inline]
    pub async fn serve<R, W>(&self, mut reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = Vec::new();
        loop {
            let at_eof = match reader.read_until(b'\n', &mut buffer).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    error!("Error reading from input: {}", e);
                    break;
                }
            };

            for response in self.handle_input(&mut buffer, at_eof).await {
                send_response(writer, &response).await?;
            }
            if at_eof {
                break;
            }
        }

        self.set_connection_state(ConnectionState::Closed).await;

        info!("MCP server stopped");
        Ok(())
    }

    /// Handle every complete JSON value at the front of `buffer`, in order,
    /// and drain the bytes they used. An unfinished value stays buffered
    /// until more input arrives, unless `at_eof` says none will. Malformed
    /// input answers with a parse error and the buffered bytes are dropped.
    #[inline]
    pub async fn handle_input(
        &self,
        buffer: &mut Vec<u8>,
        at_eof: bool,
    ) -> Vec<JsonRpcResponse> {
        let mut values = Vec::new();
        let mut parse_error = None;

        let consumed = {
            let mut stream =
                serde_json::Deserializer::from_slice(buffer.as_slice()).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(value)) => values.push(value),
                    Some(Err(e)) if e.is_eof() && !at_eof => break stream.byte_offset(),
                    Some(Err(e)) => {
                        parse_error = Some(McpError::ParseError {
                            detail: e.to_string(),
                        });
                        break buffer.len();
                    }
                    None => break buffer.len(),
                }
            }
        };
        buffer.drain(..consumed);

        let mut responses = Vec::with_capacity(values.len() + 1);
        for value in values {
            if let Some(response) = self.handle_value(value).await {
                responses.push(response);
            }
        }
        if let Some(err) = parse_error {
            responses.push(reject(&err, None));
        }
        responses
    }

    /// Handle one decoded JSON value that should be a request. A value that
    /// does not decode as a request envelope is a parse error with no id.
    #[inline]
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        if !value.is_object() {
            return Some(reject(
                &McpError::ParseError {
                    detail: "request must be a JSON object".to_string(),
                },
                None,
            ));
        }

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(reject(
                &McpError::ParseError {
                    detail: e.to_string(),
                },
                None,
            )),
        }
    }

    /// Dispatch a request by method name
    #[inline]
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        let result = match request.method.as_str() {
            methods::INITIALIZED | methods::NOTIFICATIONS_INITIALIZED => {
                self.set_connection_state(ConnectionState::Ready).await;
                info!("Server ready to handle requests");
                return None;
            }
            methods::INITIALIZE => self.handle_initialize(request.params).await,
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(request.params).await,
            methods::LIST_RESOURCES => self.handle_list_resources(),
            methods::READ_RESOURCE => self.handle_read_resource(request.params).await,
            methods::PING => Ok(json!({ "message": "pong" })),
            other => Err(McpError::MethodNotFound {
                method: other.to_string(),
            }),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(e) => reject(&e, request.id),
        })
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let params: InitializeParams = decode_params(params, "initialize")?;

        self.set_connection_state(ConnectionState::Initializing).await;

        info!(
            "Client initialized: {} {} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    #[inline]
    pub fn handle_list_tools(&self) -> McpResult<Value> {
        let result = ListToolsResult {
            tools: self.tools.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = decode_params(params, "tool call")?;
        let result = self.tools.call(params).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resources request
    #[inline]
    pub fn handle_list_resources(&self) -> McpResult<Value> {
        let result = ListResourcesResult {
            resources: self.resources.list_resources(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle read resource request
    #[inline]
    pub async fn handle_read_resource(&self, params: Option<Value>) -> McpResult<Value> {
        let params: ReadResourceParams = decode_params(params, "resource read")?;
        let result = self.resources.read(params).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn decode_params<T>(params: Option<Value>, what: &str) -> McpResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let params = params.ok_or_else(|| McpError::InternalError {
        message: format!("invalid {} request: missing params", what),
    })?;
    serde_json::from_value(params).map_err(|e| McpError::InternalError {
        message: format!("invalid {} request: {}", what, e),
    })
}

fn reject(err: &McpError, id: Option<Value>) -> JsonRpcResponse {
    err.log();
    err.to_error_response(id)
}

/// Write one response as a single compact line
async fn send_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
