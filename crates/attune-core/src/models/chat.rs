//! Chat conversation and message models

use serde::{Deserialize, Serialize};

use super::{ConversationId, MessageId};

/// A reflection chat conversation, owning a collection of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConversation {
    /// Unique identifier
    pub id: ConversationId,
    /// Owning user identifier
    pub user_id: String,
    /// Optional user-assigned title
    pub title: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Tags attached to this conversation
    #[serde(default)]
    pub tags: Vec<String>,
    /// Number of messages in this conversation
    pub message_count: i64,
    /// Whether the user explicitly saved this conversation
    pub is_saved: bool,
    /// Preview of the most recent message
    pub last_message_preview: Option<String>,
}

impl ChatConversation {
    /// Create a new empty conversation, timestamped now
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: ConversationId::new(),
            user_id: user_id.into(),
            title: None,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            message_count: 0,
            is_saved: false,
            last_message_preview: None,
        }
    }

    /// Record that a message was appended, updating the derived fields
    pub fn note_message(&mut self, message: &ChatMessage) {
        self.message_count += 1;
        self.updated_at = message.timestamp;
        self.last_message_preview = Some(message.content.chars().take(80).collect());
    }
}

/// A single message within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier
    pub id: MessageId,
    /// Owning user identifier
    pub user_id: String,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Message text
    pub content: String,
    /// True when sent by the user, false for the assistant
    pub is_from_user: bool,
    /// Message time (Unix ms)
    pub timestamp: i64,
    /// Optional message type marker (e.g. a prompt suggestion)
    pub kind: Option<String>,
    /// Optional JSON-encoded metadata
    pub metadata: Option<String>,
}

impl ChatMessage {
    /// Create a new message in the given conversation, timestamped now
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        conversation_id: ConversationId,
        content: impl Into<String>,
        is_from_user: bool,
    ) -> Self {
        Self {
            id: MessageId::new(),
            user_id: user_id.into(),
            conversation_id,
            content: content.into(),
            is_from_user,
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_message_updates_derived_fields() {
        let mut conversation = ChatConversation::new("user-1");
        let message = ChatMessage::new("user-1", conversation.id, "How was today?", false);

        conversation.note_message(&message);

        assert_eq!(conversation.message_count, 1);
        assert_eq!(conversation.updated_at, message.timestamp);
        assert_eq!(
            conversation.last_message_preview.as_deref(),
            Some("How was today?")
        );
    }

    #[test]
    fn test_preview_truncates_long_messages() {
        let mut conversation = ChatConversation::new("user-1");
        let message = ChatMessage::new("user-1", conversation.id, "x".repeat(200), true);

        conversation.note_message(&message);

        assert_eq!(
            conversation.last_message_preview.as_ref().map(String::len),
            Some(80)
        );
    }
}
