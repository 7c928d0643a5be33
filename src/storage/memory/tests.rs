use super::*;
use crate::storage::{SharedStore, contract};
use std::sync::Arc;

#[tokio::test]
async fn create_assigns_increasing_ids() {
    contract::create_assigns_increasing_ids(&MemoryStore::new()).await;
}

#[tokio::test]
async fn create_ignores_caller_identity() {
    contract::create_ignores_caller_identity(&MemoryStore::new()).await;
}

#[tokio::test]
async fn get_returns_independent_copy() {
    contract::get_returns_independent_copy(&MemoryStore::new()).await;
}

#[tokio::test]
async fn update_preserves_identity_and_creation() {
    contract::update_preserves_identity_and_creation(&MemoryStore::new()).await;
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    contract::missing_ids_are_not_found(&MemoryStore::new()).await;
}

#[tokio::test]
async fn delete_removes_record() {
    contract::delete_removes_record(&MemoryStore::new()).await;
}

#[tokio::test]
async fn status_lists_partition_all() {
    contract::status_lists_partition_all(&MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_unique_ids() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    contract::concurrent_creates_get_unique_ids(store).await;
}

#[tokio::test]
async fn deleted_ids_are_not_reused() {
    let store = MemoryStore::new();
    let first = store.create(Todo::new("a", "")).await.expect("create");
    let second = store.create(Todo::new("b", "")).await.expect("create");

    store.delete(second.id).await.expect("delete");
    let third = store.create(Todo::new("c", "")).await.expect("create");

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert_eq!(third.id, 3);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let store = MemoryStore::default();
    assert!(store.list().await.expect("list").is_empty());
    assert!(
        store
            .list_by_status(TodoStatus::Completed)
            .await
            .expect("list")
            .is_empty()
    );
}
