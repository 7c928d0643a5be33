//! MCP Tools Implementation
//!
//! The five todo tools and the registry that maps tool names to them. Each
//! handler translates an untyped argument map into one storage call and
//! renders the outcome as a single text block.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::validation::{
    Arguments, optional_string, parse_id, parse_status, required_title,
};
use crate::storage::{SharedStore, StorageError, Todo, TodoId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, error};

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Domain failures come back as `Ok` with `is_error` set. `Err` is
    /// reserved for failures of the handler itself.
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult>;
}

/// Listing payload shared by `get_todos` and the resources
#[derive(Debug, Clone, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
    pub count: usize,
}

impl TodoListResponse {
    /// Sorted by id so that output is stable across backends
    #[inline]
    pub fn new(mut todos: Vec<Todo>) -> Self {
        todos.sort_by_key(|todo| todo.id);
        let count = todos.len();
        Self { todos, count }
    }
}

#[inline]
pub fn render_todo(todo: &Todo) -> McpResult<String> {
    Ok(serde_json::to_string_pretty(todo)?)
}

#[inline]
pub fn render_todo_list(todos: Vec<Todo>) -> McpResult<String> {
    Ok(serde_json::to_string_pretty(&TodoListResponse::new(todos))?)
}

fn not_found(id: TodoId) -> CallToolResult {
    CallToolResult::error(format!("Todo with ID {} not found", id))
}

/// Map a storage failure for a single record into flagged content
fn record_failure(verb: &str, id: TodoId, err: &StorageError) -> CallToolResult {
    if err.is_not_found() {
        return not_found(id);
    }
    error!("Error {} todo {}: {}", verb, id, err);
    CallToolResult::error(format!("Error {} todo: {}", verb, err))
}

/// create_todo tool handler
pub struct CreateTodoHandler {
    store: SharedStore,
}

impl CreateTodoHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: tool_names::CREATE_TODO.to_string(),
            description: "Create a new todo item".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title of the todo item"
                    },
                    "description": {
                        "type": "string",
                        "description": "Optional description of the todo item"
                    }
                },
                "required": ["title"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for CreateTodoHandler {
    #[inline]
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult> {
        let title = match required_title(&args) {
            Ok(title) => title,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let description = match optional_string(&args, "description") {
            Ok(description) => description.unwrap_or_default(),
            Err(e) => return Ok(e.to_tool_result()),
        };

        debug!("Creating todo: title='{}'", title);

        match self.store.create(Todo::new(title, description)).await {
            Ok(todo) => Ok(CallToolResult::text(format!(
                "Todo created successfully:\n{}",
                render_todo(&todo)?
            ))),
            Err(e) => {
                error!("Error creating todo: {}", e);
                Ok(CallToolResult::error(format!("Error creating todo: {}", e)))
            }
        }
    }
}

/// get_todo tool handler
pub struct GetTodoHandler {
    store: SharedStore,
}

impl GetTodoHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: tool_names::GET_TODO.to_string(),
            description: "Get a specific todo item by ID".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "The ID of the todo item"
                    }
                },
                "required": ["id"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetTodoHandler {
    #[inline]
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult> {
        let id = match parse_id(&args) {
            Ok(id) => id,
            Err(e) => return Ok(e.to_tool_result()),
        };

        match self.store.get(id).await {
            Ok(todo) => Ok(CallToolResult::text(render_todo(&todo)?)),
            Err(e) => Ok(record_failure("retrieving", id, &e)),
        }
    }
}

/// get_todos tool handler
pub struct GetTodosHandler {
    store: SharedStore,
}

impl GetTodosHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: tool_names::GET_TODOS.to_string(),
            description: "Get all todo items, optionally filtered by status".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "description": "Filter by status: 'pending' or 'completed' (optional)",
                        "enum": ["pending", "completed"]
                    }
                }
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetTodosHandler {
    #[inline]
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult> {
        let status = match parse_status(&args) {
            Ok(status) => status,
            Err(e) => return Ok(e.to_tool_result()),
        };

        debug!("Listing todos: status={:?}", status);

        let todos = match status {
            Some(status) => self.store.list_by_status(status).await,
            None => self.store.list().await,
        };

        match todos {
            Ok(todos) => Ok(CallToolResult::text(render_todo_list(todos)?)),
            Err(e) => {
                error!("Error retrieving todos: {}", e);
                Ok(CallToolResult::error(format!("Error retrieving todos: {}", e)))
            }
        }
    }
}

/// update_todo tool handler
pub struct UpdateTodoHandler {
    store: SharedStore,
}

impl UpdateTodoHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: tool_names::UPDATE_TODO.to_string(),
            description: "Update an existing todo item".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "The ID of the todo item to update"
                    },
                    "title": {
                        "type": "string",
                        "description": "New title for the todo item"
                    },
                    "description": {
                        "type": "string",
                        "description": "New description for the todo item"
                    },
                    "status": {
                        "type": "string",
                        "description": "New status for the todo item",
                        "enum": ["pending", "completed"]
                    }
                },
                "required": ["id"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for UpdateTodoHandler {
    #[inline]
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult> {
        let parsed = parse_id(&args).and_then(|id| {
            Ok((
                id,
                optional_string(&args, "title")?,
                optional_string(&args, "description")?,
                parse_status(&args)?,
            ))
        });
        let (id, title, description, status) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return Ok(e.to_tool_result()),
        };

        let mut replacement = match self.store.get(id).await {
            Ok(existing) => existing,
            Err(e) => return Ok(record_failure("retrieving", id, &e)),
        };

        // A blank title keeps the current one.
        if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
            replacement.title = title;
        }
        if let Some(description) = description {
            replacement.description = description;
        }
        if let Some(status) = status {
            replacement.status = status;
        }

        debug!("Updating todo {}", id);

        match self.store.update(id, replacement).await {
            Ok(updated) => Ok(CallToolResult::text(format!(
                "Todo updated successfully:\n{}",
                render_todo(&updated)?
            ))),
            Err(e) => Ok(record_failure("updating", id, &e)),
        }
    }
}

/// delete_todo tool handler
pub struct DeleteTodoHandler {
    store: SharedStore,
}

impl DeleteTodoHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: tool_names::DELETE_TODO.to_string(),
            description: "Delete a todo item by ID".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "The ID of the todo item to delete"
                    }
                },
                "required": ["id"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for DeleteTodoHandler {
    #[inline]
    async fn handle(&self, args: Arguments) -> McpResult<CallToolResult> {
        let id = match parse_id(&args) {
            Ok(id) => id,
            Err(e) => return Ok(e.to_tool_result()),
        };

        match self.store.delete(id).await {
            Ok(()) => Ok(CallToolResult::text(format!(
                "Todo with ID {} deleted successfully",
                id
            ))),
            Err(e) => Ok(record_failure("deleting", id, &e)),
        }
    }
}

/// Tool registry mapping names to handlers. Listing order is registration
/// order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty tool registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name
    #[inline]
    pub fn register<H>(&mut self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let name = tool.name.clone();
        match self.tools.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
        self.handlers.insert(name.clone(), Box::new(handler));

        debug!("Registered tool: {}", name);
    }

    /// Get all registered tools
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    /// Get a specific tool by name
    #[inline]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Resolve and run a tool. An unknown name is a handler-level failure.
    #[inline]
    pub async fn call(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let handler = self
            .handlers
            .get(&params.name)
            .ok_or_else(|| McpError::UnknownTool {
                name: params.name.clone(),
            })?;

        debug!("Calling tool: {}", params.name);
        handler.handle(params.arguments.unwrap_or_default()).await
    }

    /// Create the registry with the five todo tools bound to `store`
    #[inline]
    pub fn with_store(store: SharedStore) -> Self {
        let mut registry = Self::new();

        registry.register(
            CreateTodoHandler::tool_definition(),
            CreateTodoHandler::new(SharedStore::clone(&store)),
        );
        registry.register(
            GetTodoHandler::tool_definition(),
            GetTodoHandler::new(SharedStore::clone(&store)),
        );
        registry.register(
            GetTodosHandler::tool_definition(),
            GetTodosHandler::new(SharedStore::clone(&store)),
        );
        registry.register(
            UpdateTodoHandler::tool_definition(),
            UpdateTodoHandler::new(SharedStore::clone(&store)),
        );
        registry.register(
            DeleteTodoHandler::tool_definition(),
            DeleteTodoHandler::new(store),
        );

        registry
    }
}
