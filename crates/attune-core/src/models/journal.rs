//! Journal entry model

use serde::{Deserialize, Serialize};

use super::{EntryId, MoodLabel};

/// A free-text journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier
    pub id: EntryId,
    /// Owning user identifier
    pub user_id: String,
    /// Entry body text
    pub content: String,
    /// Entry time (Unix ms)
    pub timestamp: i64,
    /// Mood recorded alongside the entry, if any
    pub mood: Option<MoodLabel>,
    /// Tags attached to this entry
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reference to the writing prompt this entry answered, if any
    pub prompt_id: Option<String>,
    /// Soft delete flag for sync
    #[serde(default)]
    pub is_deleted: bool,
}

impl JournalEntry {
    /// Create a new entry with the given content, timestamped now
    #[must_use]
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            user_id: user_id.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            mood: None,
            tags: Vec::new(),
            prompt_id: None,
            is_deleted: false,
        }
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Check if entry content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new() {
        let entry = JournalEntry::new("user-1", "Slept well, long walk.");
        assert_eq!(entry.content, "Slept well, long walk.");
        assert!(!entry.is_deleted);
        assert!(entry.timestamp > 0);
        assert!(entry.mood.is_none());
    }

    #[test]
    fn test_title_preview() {
        let entry = JournalEntry::new("user-1", "First line\nSecond line");
        assert_eq!(entry.title_preview(50), "First line");
        assert_eq!(entry.title_preview(5), "First");
    }

    #[test]
    fn test_is_empty() {
        assert!(JournalEntry::new("user-1", "   ").is_empty());
        assert!(!JournalEntry::new("user-1", "hello").is_empty());
    }
}
