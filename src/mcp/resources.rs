//! MCP Resources Implementation
//!
//! Read-only views over the todo store, addressed by `todo://` URIs.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::tools::render_todo_list;
use crate::storage::{SharedStore, TodoStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

const JSON_MIME_TYPE: &str = "application/json";

/// Resource handler trait for implementing resource access
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str) -> McpResult<ReadResourceResult>;
}

/// A listing of todos, optionally restricted to one status
pub struct TodoListResource {
    store: SharedStore,
    status: Option<TodoStatus>,
}

impl TodoListResource {
    #[inline]
    pub fn new(store: SharedStore, status: Option<TodoStatus>) -> Self {
        Self { store, status }
    }

    /// Definition of the resource serving `status`
    #[inline]
    pub fn resource_definition(status: Option<TodoStatus>) -> Resource {
        let (uri, name, description) = match status {
            None => (
                resource_uris::ALL_TODOS,
                "All Todos",
                "Get all todo items",
            ),
            Some(TodoStatus::Pending) => (
                resource_uris::PENDING_TODOS,
                "Pending Todos",
                "Get all pending todo items",
            ),
            Some(TodoStatus::Completed) => (
                resource_uris::COMPLETED_TODOS,
                "Completed Todos",
                "Get all completed todo items",
            ),
        };

        Resource {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: JSON_MIME_TYPE.to_string(),
        }
    }
}

#[async_trait]
impl ResourceHandler for TodoListResource {
    #[inline]
    async fn read(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let todos = match self.status {
            Some(status) => self.store.list_by_status(status).await?,
            None => self.store.list().await?,
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: JSON_MIME_TYPE.to_string(),
                text: render_todo_list(todos)?,
            }],
        })
    }
}

/// Resource registry mapping URIs to handlers. Listing order is
/// registration order.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
    handlers: HashMap<String, Box<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any previous resource with the same URI
    #[inline]
    pub fn register<H>(&mut self, resource: Resource, handler: H)
    where
        H: ResourceHandler + 'static,
    {
        let uri = resource.uri.clone();
        match self.resources.iter_mut().find(|existing| existing.uri == uri) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
        self.handlers.insert(uri.clone(), Box::new(handler));

        debug!("Registered resource: {}", uri);
    }

    #[inline]
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.clone()
    }

    /// Resolve and read a resource by exact URI
    #[inline]
    pub async fn read(&self, params: ReadResourceParams) -> McpResult<ReadResourceResult> {
        let handler = self
            .handlers
            .get(&params.uri)
            .ok_or_else(|| McpError::UnknownResource {
                uri: params.uri.clone(),
            })?;

        debug!("Reading resource: {}", params.uri);
        handler.read(&params.uri).await
    }

    /// Create the registry with the three todo listings bound to `store`
    #[inline]
    pub fn with_store(store: SharedStore) -> Self {
        let mut registry = Self::new();

        for status in [None, Some(TodoStatus::Pending), Some(TodoStatus::Completed)] {
            registry.register(
                TodoListResource::resource_definition(status),
                TodoListResource::new(SharedStore::clone(&store), status),
            );
        }

        registry
    }
}
