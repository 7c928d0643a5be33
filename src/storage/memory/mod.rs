#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StorageError, StorageResult, Todo, TodoId, TodoStatus, TodoStore};

/// Process-lifetime store. Identities come from a counter and are never
/// handed out twice, even after the record is deleted.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    todos: HashMap<TodoId, Todo>,
    next_id: TodoId,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                todos: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    #[inline]
    async fn create(&self, mut todo: Todo) -> StorageResult<Todo> {
        let mut state = self.state.write().await;

        let next_id = state
            .next_id
            .checked_add(1)
            .ok_or(StorageError::IdsExhausted)?;

        let now = Utc::now();
        todo.id = state.next_id;
        todo.created_at = now;
        todo.updated_at = now;

        state.next_id = next_id;
        state.todos.insert(todo.id, todo.clone());

        debug!("Created todo {}", todo.id);
        Ok(todo)
    }

    #[inline]
    async fn get(&self, id: TodoId) -> StorageResult<Todo> {
        let state = self.state.read().await;
        state.todos.get(&id).cloned().ok_or(StorageError::NotFound(id))
    }

    #[inline]
    async fn list(&self) -> StorageResult<Vec<Todo>> {
        let state = self.state.read().await;
        Ok(state.todos.values().cloned().collect())
    }

    #[inline]
    async fn list_by_status(&self, status: TodoStatus) -> StorageResult<Vec<Todo>> {
        let state = self.state.read().await;
        Ok(state
            .todos
            .values()
            .filter(|todo| todo.status == status)
            .cloned()
            .collect())
    }

    #[inline]
    async fn update(&self, id: TodoId, mut replacement: Todo) -> StorageResult<Todo> {
        let mut state = self.state.write().await;
        let existing = state.todos.get_mut(&id).ok_or(StorageError::NotFound(id))?;

        replacement.id = existing.id;
        replacement.created_at = existing.created_at;
        replacement.updated_at = Utc::now();
        *existing = replacement.clone();

        debug!("Updated todo {}", id);
        Ok(replacement)
    }

    #[inline]
    async fn delete(&self, id: TodoId) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.todos.remove(&id).is_none() {
            return Err(StorageError::NotFound(id));
        }

        debug!("Deleted todo {}", id);
        Ok(())
    }
}
