//! In-memory store implementations
//!
//! Used by tests and by guest sessions, which never touch the real remote.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Document, LocalStore, MessageStore, RemoteStore, SyncEntity};
use crate::error::Result;
use crate::models::{ChatMessage, ConversationId};

/// Map-backed `LocalStore` for one entity type
pub struct MemoryLocalStore<E> {
    records: Mutex<HashMap<String, E>>,
}

impl<E> Default for MemoryLocalStore<E> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl<E: SyncEntity> MemoryLocalStore<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Number of records currently held, across all users
    pub fn len(&self) -> usize {
        self.records.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch one record by identifier
    pub fn get(&self, id: &str) -> Option<E> {
        self.records
            .lock()
            .expect("store lock poisoned")
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl<E: SyncEntity> LocalStore<E> for MemoryLocalStore<E> {
    async fn upsert(&self, entity: &E) -> Result<()> {
        self.records
            .lock()
            .expect("store lock poisoned")
            .insert(entity.entity_id(), entity.clone());
        Ok(())
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<E>> {
        Ok(self
            .records
            .lock()
            .expect("store lock poisoned")
            .values()
            .filter(|entity| entity.owner_id() == user_id)
            .cloned()
            .collect())
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .records
            .lock()
            .expect("store lock poisoned")
            .values()
            .filter(|entity| entity.owner_id() == user_id)
            .map(SyncEntity::entity_id)
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.lock().expect("store lock poisoned").remove(id);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryLocalStore<ChatMessage> {
    async fn for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .records
            .lock()
            .expect("store lock poisoned")
            .values()
            .filter(|message| message.conversation_id == *conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.timestamp);
        Ok(messages)
    }
}

/// Map-backed `RemoteStore`, keyed by full collection path
///
/// Tracks a write counter so tests can assert on no-op behavior.
#[derive(Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    writes: AtomicU64,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `put` calls observed
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Fetch one document by path, for assertions
    pub fn get(&self, user_id: &str, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .lock()
            .expect("store lock poisoned")
            .get(&collection_path(user_id, collection))
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    fn list_path(&self, path: &str) -> Vec<Document> {
        self.collections
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default()
    }

    fn put_path(&self, path: String, id: &str, doc: &Document) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.collections
            .lock()
            .expect("store lock poisoned")
            .entry(path)
            .or_default()
            .insert(id.to_string(), doc.clone());
    }
}

fn collection_path(user_id: &str, collection: &str) -> String {
    format!("users/{user_id}/{collection}")
}

fn messages_path(user_id: &str, conversation_id: &str) -> String {
    format!("users/{user_id}/conversations/{conversation_id}/messages")
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list(&self, user_id: &str, collection: &str) -> Result<Vec<Document>> {
        Ok(self.list_path(&collection_path(user_id, collection)))
    }

    async fn put(&self, user_id: &str, collection: &str, id: &str, doc: &Document) -> Result<()> {
        self.put_path(collection_path(user_id, collection), id, doc);
        Ok(())
    }

    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Document>> {
        Ok(self.list_path(&messages_path(user_id, conversation_id)))
    }

    async fn put_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        doc: &Document,
    ) -> Result<()> {
        self.put_path(messages_path(user_id, conversation_id), message_id, doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MoodCheckIn, MoodLabel};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_store_scopes_by_user() {
        let store = MemoryLocalStore::new();
        store
            .upsert(&MoodCheckIn::new("user-a", MoodLabel::Good))
            .await
            .unwrap();
        store
            .upsert(&MoodCheckIn::new("user-b", MoodLabel::Low))
            .await
            .unwrap();

        let for_a = store.all_for_user("user-a").await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].user_id, "user-a");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_store_counts_writes() {
        let store = MemoryRemoteStore::new();
        assert_eq!(store.write_count(), 0);

        store
            .put("user-a", "tags", "t1", &serde_json::json!({"name": "calm"}))
            .await
            .unwrap();

        assert_eq!(store.write_count(), 1);
        let docs = store.list("user-a", "tags").await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_nested_messages_are_separate_from_collections() {
        let store = MemoryRemoteStore::new();
        let doc = serde_json::json!({"content": "hi"});
        store.put_message("user-a", "c1", "m1", &doc).await.unwrap();

        assert!(store.list("user-a", "messages").await.unwrap().is_empty());
        assert_eq!(store.list_messages("user-a", "c1").await.unwrap().len(), 1);
    }
}
