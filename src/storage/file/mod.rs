
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{StorageError, StorageResult, Todo, TodoId, TodoStatus, TodoStore};

/// On-disk layout: one pretty-printed JSON object keyed by decimal id.
type TodoMap = BTreeMap<TodoId, Todo>;

/// JSON file backed store.
///
/// Nothing is cached between calls. Every operation loads the whole file and
/// every write rewrites it, so a write holds the exclusive guard across the
/// full load-mutate-save cycle. The next identity is recomputed from the
/// highest key on each create, which means the top id can be handed out
/// again once it has been deleted.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absent or blank files are an empty set.
    async fn load(&self) -> StorageResult<TodoMap> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TodoMap::new()),
            Err(source) => {
                error!("Failed to read {}: {}", self.path.display(), source);
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(TodoMap::new());
        }

        let mut todos: TodoMap =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                source,
            })?;

        // The key is authoritative if a record's own id field disagrees.
        for (id, todo) in &mut todos {
            todo.id = *id;
        }

        debug!("Loaded {} todos from {}", todos.len(), self.path.display());
        Ok(todos)
    }

    async fn save(&self, todos: &TodoMap) -> StorageResult<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| StorageError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let data = serde_json::to_string_pretty(todos).map_err(StorageError::Serialize)?;

        fs::write(&self.path, data)
            .await
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!("Saved {} todos to {}", todos.len(), self.path.display());
        Ok(())
    }
}

/// One past the highest stored id
fn next_id(todos: &TodoMap) -> StorageResult<TodoId> {
    match todos.keys().next_back() {
        Some(highest) => highest
            .checked_add(1)
            .map(|id| id.max(1))
            .ok_or(StorageError::IdsExhausted),
        None => Ok(1),
    }
}

#[async_trait]
impl TodoStore for FileStore {
    #[inline]
    async fn create(&self, mut todo: Todo) -> StorageResult<Todo> {
        let _guard = self.lock.write().await;
        let mut todos = self.load().await?;

        let now = Utc::now();
        todo.id = next_id(&todos)?;
        todo.created_at = now;
        todo.updated_at = now;

        todos.insert(todo.id, todo.clone());
        self.save(&todos).await?;

        debug!("Created todo {}", todo.id);
        Ok(todo)
    }

    #[inline]
    async fn get(&self, id: TodoId) -> StorageResult<Todo> {
        let _guard = self.lock.read().await;
        let mut todos = self.load().await?;
        todos.remove(&id).ok_or(StorageError::NotFound(id))
    }

    #[inline]
    async fn list(&self) -> StorageResult<Vec<Todo>> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.into_values().collect())
    }

    #[inline]
    async fn list_by_status(&self, status: TodoStatus) -> StorageResult<Vec<Todo>> {
        let _guard = self.lock.read().await;
        Ok(self
            .load()
            .await?
            .into_values()
            .filter(|todo| todo.status == status)
            .collect())
    }

    #[inline]
    async fn update(&self, id: TodoId, mut replacement: Todo) -> StorageResult<Todo> {
        let _guard = self.lock.write().await;
        let mut todos = self.load().await?;

        let existing = todos.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        replacement.id = existing.id;
        replacement.created_at = existing.created_at;
        replacement.updated_at = Utc::now();
        *existing = replacement.clone();

        self.save(&todos).await?;

        debug!("Updated todo {}", id);
        Ok(replacement)
    }

    #[inline]
    async fn delete(&self, id: TodoId) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        let mut todos = self.load().await?;

        if todos.remove(&id).is_none() {
            return Err(StorageError::NotFound(id));
        }

        self.save(&todos).await?;

        debug!("Deleted todo {}", id);
        Ok(())
    }
}
