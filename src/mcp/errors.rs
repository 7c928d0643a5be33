//! MCP Error Handling
//!
//! Protocol-level failures and their JSON-RPC representation. Domain
//! failures (unknown todo, bad arguments) never get here; tool handlers
//! report them as error-flagged content instead.

use crate::mcp::protocol::*;
use crate::storage::StorageError;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced as JSON-RPC error responses
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error")]
    ParseError { detail: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("unknown resource: {uri}")]
    UnknownResource { uri: String },

    #[error("{message}")]
    InternalError { message: String },

    #[error("error retrieving todos: {0}")]
    Storage(#[from] StorageError),
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::ParseError { detail } => JsonRpcError::new(
                self.code(),
                self.to_string(),
                Some(Value::String(detail.clone())),
            ),
            _ => JsonRpcError::new(self.code(), self.to_string(), None),
        }
    }

    /// Reserved JSON-RPC code for this error
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError { .. } => error_codes::PARSE_ERROR,
            Self::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            // Unresolvable tool/resource names and storage failures are
            // handler-level failures, not protocol errors.
            Self::UnknownTool { .. }
            | Self::UnknownResource { .. }
            | Self::InternalError { .. }
            | Self::Storage(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, self.to_jsonrpc_error())
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::ParseError { detail } => {
                warn!("Client error: {}: {}", self, detail);
            }
            Self::MethodNotFound { .. }
            | Self::UnknownTool { .. }
            | Self::UnknownResource { .. } => {
                warn!("Client error: {}", self);
            }
            Self::InternalError { .. } | Self::Storage(_) => {
                error!("Server error: {}", self);
            }
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Payload (de)serialization failures inside a known method are handler-level
impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::InternalError {
            message: error.to_string(),
        }
    }
}
