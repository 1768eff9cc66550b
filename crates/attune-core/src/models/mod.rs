//! Data models for attune-core

mod cache;
mod chat;
mod id;
mod journal;
mod mood;
mod tag;

pub use cache::{CacheMetadata, DataSource};
pub use chat::{ChatConversation, ChatMessage};
pub use id::{CheckInId, ConversationId, EntryId, MessageId, TagId};
pub use journal::JournalEntry;
pub use mood::{date_key, MoodCheckIn, MoodLabel};
pub use tag::Tag;
