//! REST surface
//!
//! JSON CRUD endpoints under `/api/v1` backed by the same store the
//! MCP server uses. Successes are wrapped as `{"message", "data"}`, failures
//! as `{"error", "message"}`.


use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::storage::{SharedStore, StorageError, Todo, TodoId, TodoStatus};

pub const API_PREFIX: &str = "/api/v1";

const NOT_FOUND_MESSAGE: &str = "Todo with given ID does not exist";
const INVALID_STATUS_MESSAGE: &str = "Status must be 'pending' or 'completed'";

/// Success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    #[inline]
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    #[inline]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update; absent members keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTodosQuery {
    pub status: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid ID: ID must be a number")]
    InvalidId,

    #[error("Validation failed: {0}")]
    Validation(&'static str),

    #[error("Invalid status: {INVALID_STATUS_MESSAGE}")]
    InvalidStatus,

    #[error("Todo not found: {NOT_FOUND_MESSAGE}")]
    NotFound,

    #[error("{action}: {source}")]
    Storage {
        action: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ApiError {
    #[inline]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) | Self::InvalidId | Self::Validation(_) | Self::InvalidStatus => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[inline]
    pub fn to_error_response(&self) -> ErrorResponse {
        let (error, message) = match self {
            Self::InvalidJson(detail) => ("Invalid JSON", detail.clone()),
            Self::InvalidId => ("Invalid ID", "ID must be a number".to_string()),
            Self::Validation(message) => ("Validation failed", (*message).to_string()),
            Self::InvalidStatus => ("Invalid status", INVALID_STATUS_MESSAGE.to_string()),
            Self::NotFound => ("Todo not found", NOT_FOUND_MESSAGE.to_string()),
            Self::Storage { action, source } => (*action, source.to_string()),
        };
        ErrorResponse {
            error: error.to_string(),
            message,
        }
    }

    /// Classify a storage failure, keeping not-found distinct
    fn storage(action: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| {
            if source.is_not_found() {
                Self::NotFound
            } else {
                error!("{}: {}", action, source);
                Self::Storage { action, source }
            }
        }
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_error_response())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    #[inline]
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    #[inline]
    fn from(_: PathRejection) -> Self {
        Self::InvalidId
    }
}

fn parse_status(status: &str) -> Result<TodoStatus, ApiError> {
    status.parse().map_err(|_| ApiError::InvalidStatus)
}

/// Build the `/api/v1` router over `store`
#[inline]
pub fn router(store: SharedStore) -> Router {
    let todos = Router::new()
        .route("/todos", post(create_todo).get(list_todos))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        );

    Router::new().nest(API_PREFIX, todos).with_state(store)
}

/// POST /todos
#[inline]
pub async fn create_todo(
    State(store): State<SharedStore>,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Todo>>), ApiError> {
    let Json(request) = body?;
    if request.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required"));
    }

    let todo = store
        .create(Todo::new(request.title, request.description))
        .await
        .map_err(ApiError::storage("Failed to create todo"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Todo created successfully", todo)),
    ))
}

/// GET /todos[?status=]
#[inline]
pub async fn list_todos(
    State(store): State<SharedStore>,
    Query(query): Query<ListTodosQuery>,
) -> Result<Json<ApiResponse<Vec<Todo>>>, ApiError> {
    let status = query
        .status
        .filter(|status| !status.is_empty())
        .map(|status| parse_status(&status))
        .transpose()?;

    let mut todos = match status {
        Some(status) => store.list_by_status(status).await,
        None => store.list().await,
    }
    .map_err(ApiError::storage("Failed to retrieve todos"))?;
    todos.sort_by_key(|todo| todo.id);

    Ok(Json(ApiResponse::new("Todos retrieved successfully", todos)))
}

/// GET /todos/{id}
#[inline]
pub async fn get_todo(
    State(store): State<SharedStore>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<ApiResponse<Todo>>, ApiError> {
    let Path(id) = id?;

    let todo = store
        .get(id)
        .await
        .map_err(ApiError::storage("Failed to retrieve todo"))?;

    Ok(Json(ApiResponse::new("Todo retrieved successfully", todo)))
}

/// PUT /todos/{id}
#[inline]
pub async fn update_todo(
    State(store): State<SharedStore>,
    id: Result<Path<TodoId>, PathRejection>,
    body: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Todo>>, ApiError> {
    let Path(id) = id?;

    // A missing record wins over a bad body.
    let mut replacement = store
        .get(id)
        .await
        .map_err(ApiError::storage("Failed to retrieve todo"))?;

    let Json(request) = body?;
    if request
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(ApiError::Validation("Title cannot be empty"));
    }
    let status = request.status.as_deref().map(parse_status).transpose()?;

    if let Some(title) = request.title {
        replacement.title = title;
    }
    if let Some(description) = request.description {
        replacement.description = description;
    }
    if let Some(status) = status {
        replacement.status = status;
    }

    let todo = store
        .update(id, replacement)
        .await
        .map_err(ApiError::storage("Failed to update todo"))?;

    Ok(Json(ApiResponse::new("Todo updated successfully", todo)))
}

/// DELETE /todos/{id}
#[inline]
pub async fn delete_todo(
    State(store): State<SharedStore>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Path(id) = id?;

    store
        .delete(id)
        .await
        .map_err(ApiError::storage("Failed to delete todo"))?;

    Ok(Json(ApiResponse::message_only("Todo deleted successfully")))
}

/// Serve the REST API on `addr` until ctrl-c
#[inline]
pub async fn serve_http(addr: SocketAddr, store: SharedStore) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;

    info!("HTTP server listening on http://{}", addr);
    for (method, path) in [
        ("POST", "/todos"),
        ("GET", "/todos"),
        ("GET", "/todos/{id}"),
        ("PUT", "/todos/{id}"),
        ("DELETE", "/todos/{id}"),
    ] {
        info!("  {:<6} {}{}", method, API_PREFIX, path);
    }

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on ctrl-c. Without a signal handler the server runs until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl_c received; shutting down http server"),
        Err(e) => {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
