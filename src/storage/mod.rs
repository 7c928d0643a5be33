//! Todo persistence
//!
//! A single [`TodoStore`] contract with two backends: [`MemoryStore`] keeps
//! the set for the lifetime of the process, [`FileStore`] reloads and rewrites
//! a JSON file around every operation.

pub mod file;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use models::{InvalidStatus, Todo, TodoId, TodoStatus};

pub type StorageResult<T> = Result<T, StorageError>;

/// Shared handle used by both the MCP dispatcher and the REST surface.
pub type SharedStore = Arc<dyn TodoStore>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("todo {0} not found")]
    NotFound(TodoId),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize todos: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("no todo ids left")]
    IdsExhausted,
}

impl StorageError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// CRUD contract shared by every backend.
///
/// Every returned [`Todo`] is an owned copy; mutating it never touches the
/// stored record. Reads may run concurrently, writes are exclusive.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Store a new record. The caller's `id`, `created_at` and `updated_at`
    /// are ignored and replaced.
    async fn create(&self, todo: Todo) -> StorageResult<Todo>;

    async fn get(&self, id: TodoId) -> StorageResult<Todo>;

    /// All records, in no particular order.
    async fn list(&self) -> StorageResult<Vec<Todo>>;

    async fn list_by_status(&self, status: TodoStatus) -> StorageResult<Vec<Todo>>;

    /// Overwrite the mutable fields of `id` with `replacement`. Identity and
    /// creation time are kept from the stored record.
    async fn update(&self, id: TodoId, replacement: Todo) -> StorageResult<Todo>;

    async fn delete(&self, id: TodoId) -> StorageResult<()>;
}

/// Open the backend selected by the configuration.
#[inline]
pub fn open_store(config: &StorageConfig) -> SharedStore {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory todo storage");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            info!("Using file todo storage at {}", config.file_path.display());
            Arc::new(FileStore::new(config.file_path.clone()))
        }
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share, run against each one from its own
    //! test module.

    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    pub async fn create_assigns_increasing_ids(store: &dyn TodoStore) {
        let first = store
            .create(Todo::new("first", ""))
            .await
            .expect("create first");
        let second = store
            .create(Todo::new("second", ""))
            .await
            .expect("create second");

        assert!(first.id >= 1);
        assert!(second.id > first.id);
    }

    pub async fn create_ignores_caller_identity(store: &dyn TodoStore) {
        let mut draft = Todo::new("Buy milk", "2 liters");
        draft.id = 99;
        draft.created_at = draft.created_at - chrono::Duration::days(30);

        let created = store.create(draft.clone()).await.expect("create");

        assert_eq!(created.id, 1);
        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.description, "2 liters");
        assert_eq!(created.status, TodoStatus::Pending);
        assert!(created.created_at > draft.created_at);
        assert_eq!(created.created_at, created.updated_at);
    }

    pub async fn get_returns_independent_copy(store: &dyn TodoStore) {
        let created = store
            .create(Todo::new("Original", "text"))
            .await
            .expect("create");

        let mut fetched = store.get(created.id).await.expect("get");
        assert_eq!(fetched, created);

        fetched.title = "Changed locally".to_string();
        fetched.status = TodoStatus::Completed;

        let refetched = store.get(created.id).await.expect("get again");
        assert_eq!(refetched, created);
    }

    pub async fn update_preserves_identity_and_creation(store: &dyn TodoStore) {
        let created = store
            .create(Todo::new("Draft", ""))
            .await
            .expect("create");
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut replacement = created.clone();
        replacement.id = created.id + 100;
        replacement.created_at = created.created_at - chrono::Duration::days(1);
        replacement.title = "Final".to_string();
        replacement.status = TodoStatus::Completed;

        let updated = store
            .update(created.id, replacement)
            .await
            .expect("update");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.status, TodoStatus::Completed);
        assert!(updated.updated_at > created.updated_at);

        let fetched = store.get(created.id).await.expect("get");
        assert_eq!(fetched, updated);
        assert!(store.get(created.id + 100).await.is_err());
    }

    pub async fn missing_ids_are_not_found(store: &dyn TodoStore) {
        let get = store.get(42).await.expect_err("get should fail");
        assert!(get.is_not_found());

        let update = store
            .update(42, Todo::new("ghost", ""))
            .await
            .expect_err("update should fail");
        assert!(update.is_not_found());

        let delete = store.delete(42).await.expect_err("delete should fail");
        assert!(delete.is_not_found());
    }

    pub async fn delete_removes_record(store: &dyn TodoStore) {
        let keep = store.create(Todo::new("keep", "")).await.expect("create");
        let doomed = store.create(Todo::new("doomed", "")).await.expect("create");

        store.delete(doomed.id).await.expect("delete");

        assert!(store.get(doomed.id).await.expect_err("gone").is_not_found());
        let remaining = store.list().await.expect("list");
        assert_eq!(remaining, vec![keep]);
    }

    pub async fn status_lists_partition_all(store: &dyn TodoStore) {
        for i in 0..6 {
            let created = store
                .create(Todo::new(format!("todo {i}"), ""))
                .await
                .expect("create");
            if i % 2 == 0 {
                let mut done = created.clone();
                done.status = TodoStatus::Completed;
                store.update(created.id, done).await.expect("complete");
            }
        }

        let all = store.list().await.expect("list");
        let pending = store
            .list_by_status(TodoStatus::Pending)
            .await
            .expect("pending");
        let completed = store
            .list_by_status(TodoStatus::Completed)
            .await
            .expect("completed");

        assert!(pending.iter().all(Todo::is_pending));
        assert!(completed.iter().all(Todo::is_completed));
        assert_eq!(pending.len() + completed.len(), all.len());

        let all_ids: HashSet<TodoId> = all.iter().map(|t| t.id).collect();
        let split_ids: HashSet<TodoId> = pending.iter().chain(&completed).map(|t| t.id).collect();
        assert_eq!(all_ids.len(), all.len());
        assert_eq!(all_ids, split_ids);
    }

    pub async fn concurrent_creates_get_unique_ids(store: SharedStore) {
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.spawn(async move { store.create(Todo::new(format!("task {i}"), "")).await });
        }

        let mut ids = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            let todo = joined.expect("task joined").expect("create");
            assert!(ids.insert(todo.id), "duplicate id {}", todo.id);
        }

        assert_eq!(ids.len(), 16);
        assert_eq!(store.list().await.expect("list").len(), 16);
    }
}
