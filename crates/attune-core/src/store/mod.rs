//! Capability interfaces for the local and remote stores
//!
//! The sync engine only ever talks to these traits; libsql and the REST
//! document-store client are implementations behind them.

mod memory;
mod rest;

pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use rest::RestRemoteStore;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::models::{ChatConversation, ChatMessage, ConversationId, JournalEntry, MoodCheckIn, Tag};

/// A remote document: a JSON object mirroring one entity
pub type Document = serde_json::Value;

/// A synchronized entity: addressable by stable id, scoped to one user,
/// and convertible to/from a remote document.
pub trait SyncEntity:
    Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static
{
    /// Remote collection name under `users/{userId}/`
    const COLLECTION: &'static str;

    /// Stable identifier, used as the remote document id
    fn entity_id(&self) -> String;

    /// Owning user identifier
    fn owner_id(&self) -> &str;

    /// Timestamp used for conflict comparison (Unix ms)
    fn timestamp_ms(&self) -> i64;

    /// Serialize to a remote document
    fn to_document(&self) -> Result<Document> {
        Ok(serde_json::to_value(self)?)
    }

    /// Deserialize from a remote document
    fn from_document(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(doc)?)
    }
}

macro_rules! impl_sync_entity {
    ($entity:ty, $collection:literal, $ts:ident) => {
        impl SyncEntity for $entity {
            const COLLECTION: &'static str = $collection;

            fn entity_id(&self) -> String {
                self.id.as_str()
            }

            fn owner_id(&self) -> &str {
                &self.user_id
            }

            fn timestamp_ms(&self) -> i64 {
                self.$ts
            }
        }
    };
}

impl_sync_entity!(MoodCheckIn, "mood_check_ins", timestamp);
impl_sync_entity!(JournalEntry, "journal_entries", timestamp);
impl_sync_entity!(ChatConversation, "conversations", updated_at);
impl_sync_entity!(ChatMessage, "messages", timestamp);
impl_sync_entity!(Tag, "tags", created_at);

/// Local store operations for one synchronized entity type
///
/// The local store is the authoritative source for UI reads; both the
/// UI-facing write paths and the sync engine go through `upsert`/`delete`
/// so there is a single write authority per record.
#[async_trait]
pub trait LocalStore<E: SyncEntity>: Send + Sync {
    /// Insert or overwrite by identifier
    async fn upsert(&self, entity: &E) -> Result<()>;

    /// Fetch every record owned by the user (including soft-deleted ones)
    async fn all_for_user(&self, user_id: &str) -> Result<Vec<E>>;

    /// Fetch the set of identifiers owned by the user
    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>>;

    /// Delete by identifier
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Local message store, additionally addressable by conversation
#[async_trait]
pub trait MessageStore: LocalStore<ChatMessage> {
    /// Fetch every message belonging to the conversation, oldest first
    async fn for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>>;
}

/// Remote document database, organized as per-user collections
///
/// Documents are addressed as `users/{userId}/{collection}/{id}`, with
/// conversation messages nested one level deeper as
/// `users/{userId}/conversations/{id}/messages/{msgId}`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every document in the user's collection
    async fn list(&self, user_id: &str, collection: &str) -> Result<Vec<Document>>;

    /// Insert or overwrite a document by identifier
    async fn put(&self, user_id: &str, collection: &str, id: &str, doc: &Document) -> Result<()>;

    /// List the messages nested under a conversation
    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Document>>;

    /// Insert or overwrite a message nested under a conversation
    async fn put_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        doc: &Document,
    ) -> Result<()>;
}
