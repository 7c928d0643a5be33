//! Tool Argument Validation
//!
//! Tool arguments arrive as an untyped JSON map. These helpers pull typed
//! values out of it with a fixed precedence and report anything else as an
//! [`ArgumentError`], which tool handlers turn into error-flagged content.

use crate::mcp::protocol::CallToolResult;
use crate::storage::{TodoId, TodoStatus};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Arguments = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("id must be a number")]
    NotANumber,

    #[error("id must be a valid integer")]
    InvalidInteger,

    #[error("title is required and must be a non-empty string")]
    EmptyTitle,

    #[error("{field} must be a string")]
    NotAString { field: &'static str },

    #[error("status must be 'pending' or 'completed'")]
    InvalidStatus,
}

impl ArgumentError {
    #[inline]
    pub fn to_tool_result(&self) -> CallToolResult {
        CallToolResult::error(format!("Error: {}", self))
    }
}

/// Look up a member, treating an explicit `null` as absent.
fn present<'a>(args: &'a Arguments, field: &str) -> Option<&'a Value> {
    args.get(field).filter(|value| !value.is_null())
}

/// Extract the required `id` argument.
#[inline]
pub fn parse_id(args: &Arguments) -> Result<TodoId, ArgumentError> {
    let value = present(args, "id").ok_or(ArgumentError::Missing { field: "id" })?;
    id_from_value(value)
}

/// Integer first, then a float truncated toward zero, then a decimal
/// string. Any other shape is rejected.
#[inline]
pub fn id_from_value(value: &Value) -> Result<TodoId, ArgumentError> {
    match value {
        Value::Number(number) => {
            if let Some(id) = number.as_i64() {
                return Ok(id);
            }
            match number.as_f64() {
                Some(float) if float.is_finite() => Ok(float.trunc() as TodoId),
                _ => Err(ArgumentError::NotANumber),
            }
        }
        Value::String(text) => text
            .parse::<TodoId>()
            .map_err(|_| ArgumentError::InvalidInteger),
        _ => Err(ArgumentError::NotANumber),
    }
}

/// Extract the optional `status` argument. When present it must be exactly
/// `"pending"` or `"completed"`.
#[inline]
pub fn parse_status(args: &Arguments) -> Result<Option<TodoStatus>, ArgumentError> {
    match present(args, "status") {
        None => Ok(None),
        Some(Value::String(text)) => text
            .parse::<TodoStatus>()
            .map(Some)
            .map_err(|_| ArgumentError::InvalidStatus),
        Some(_) => Err(ArgumentError::InvalidStatus),
    }
}

/// Extract a title that must contain something other than whitespace.
#[inline]
pub fn required_title(args: &Arguments) -> Result<String, ArgumentError> {
    match present(args, "title") {
        Some(Value::String(title)) if !title.trim().is_empty() => Ok(title.clone()),
        _ => Err(ArgumentError::EmptyTitle),
    }
}

#[inline]
pub fn optional_string(
    args: &Arguments,
    field: &'static str,
) -> Result<Option<String>, ArgumentError> {
    match present(args, field) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ArgumentError::NotAString { field }),
    }
}
