//! libSQL-backed local store implementations

use std::collections::HashSet;

use async_trait::async_trait;
use libsql::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{
    ChatConversation, ChatMessage, ConversationId, JournalEntry, MoodCheckIn, MoodLabel, Tag,
};
use crate::store::{LocalStore, MessageStore};

/// libSQL implementation of `LocalStore<MoodCheckIn>`
pub struct LibSqlMoodStore {
    conn: Connection,
}

impl LibSqlMoodStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &Row) -> Result<MoodCheckIn> {
        Ok(MoodCheckIn {
            id: parse_id(&row.get::<String>(0)?)?,
            user_id: row.get(1)?,
            mood: parse_mood(&row.get::<String>(2)?)?,
            tags: parse_tags(&row.get::<String>(3)?),
            timestamp: row.get(4)?,
            notes: opt_text(row, 5)?,
            date_key: row.get(6)?,
        })
    }
}

#[async_trait]
impl LocalStore<MoodCheckIn> for LibSqlMoodStore {
    async fn upsert(&self, check_in: &MoodCheckIn) -> Result<()> {
        // OR REPLACE also evicts a different check-in occupying the same
        // (user_id, date_key) slot, keeping one check-in per day
        self.conn
            .execute(
                "INSERT OR REPLACE INTO mood_check_ins
                 (id, user_id, mood, tags, timestamp, notes, date_key)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    check_in.id.as_str(),
                    check_in.user_id.clone(),
                    check_in.mood.as_str(),
                    encode_tags(&check_in.tags)?,
                    check_in.timestamp,
                    check_in.notes.clone(),
                    check_in.date_key.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<MoodCheckIn>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, mood, tags, timestamp, notes, date_key
                 FROM mood_check_ins WHERE user_id = ? ORDER BY timestamp DESC",
                [user_id],
            )
            .await?;

        let mut check_ins = Vec::new();
        while let Some(row) = rows.next().await? {
            check_ins.push(Self::parse_row(&row)?);
        }
        Ok(check_ins)
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        collect_ids(&self.conn, "mood_check_ins", user_id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM mood_check_ins WHERE id = ?", [id])
            .await?;
        Ok(())
    }
}

/// libSQL implementation of `LocalStore<JournalEntry>`
pub struct LibSqlJournalStore {
    conn: Connection,
}

impl LibSqlJournalStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &Row) -> Result<JournalEntry> {
        let mood = match opt_text(row, 4)? {
            Some(name) => Some(parse_mood(&name)?),
            None => None,
        };
        Ok(JournalEntry {
            id: parse_id(&row.get::<String>(0)?)?,
            user_id: row.get(1)?,
            content: row.get(2)?,
            timestamp: row.get(3)?,
            mood,
            tags: parse_tags(&row.get::<String>(5)?),
            prompt_id: opt_text(row, 6)?,
            is_deleted: row.get::<i32>(7)? != 0,
        })
    }
}

#[async_trait]
impl LocalStore<JournalEntry> for LibSqlJournalStore {
    async fn upsert(&self, entry: &JournalEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO journal_entries
                 (id, user_id, content, timestamp, mood, tags, prompt_id, is_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.user_id.clone(),
                    entry.content.clone(),
                    entry.timestamp,
                    entry.mood.map(MoodLabel::as_str),
                    encode_tags(&entry.tags)?,
                    entry.prompt_id.clone(),
                    i32::from(entry.is_deleted),
                ],
            )
            .await?;
        Ok(())
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<JournalEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, content, timestamp, mood, tags, prompt_id, is_deleted
                 FROM journal_entries WHERE user_id = ? ORDER BY timestamp DESC",
                [user_id],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_row(&row)?);
        }
        Ok(entries)
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        collect_ids(&self.conn, "journal_entries", user_id).await
    }

    /// Soft delete: the tombstone still syncs, so other devices learn of it
    async fn delete(&self, id: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE journal_entries SET is_deleted = 1 WHERE id = ?",
                [id],
            )
            .await?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// libSQL implementation of `LocalStore<ChatConversation>`
///
/// Upserts also maintain the `conversation_tags` junction table from the
/// conversation's tag list.
pub struct LibSqlConversationStore {
    conn: Connection,
}

impl LibSqlConversationStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &Row) -> Result<ChatConversation> {
        Ok(ChatConversation {
            id: parse_id(&row.get::<String>(0)?)?,
            user_id: row.get(1)?,
            title: opt_text(row, 2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            tags: parse_tags(&row.get::<String>(5)?),
            message_count: row.get(6)?,
            is_saved: row.get::<i32>(7)? != 0,
            last_message_preview: opt_text(row, 8)?,
        })
    }

    /// Rewrite tag links for a conversation (create tags as needed)
    async fn sync_tags(&self, conversation: &ChatConversation) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM conversation_tags WHERE conversation_id = ?",
                [conversation.id.as_str()],
            )
            .await?;

        for tag_name in &conversation.tags {
            let tag_id = self
                .get_or_create_tag(&conversation.user_id, tag_name)
                .await?;
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO conversation_tags (conversation_id, tag_id) VALUES (?, ?)",
                    params![conversation.id.as_str(), tag_id],
                )
                .await?;
        }

        Ok(())
    }

    /// Get or create a tag by name for the user
    async fn get_or_create_tag(&self, user_id: &str, name: &str) -> Result<String> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM tags WHERE user_id = ? AND name = ? COLLATE NOCASE",
                params![user_id, name],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            return Ok(row.get(0)?);
        }

        let tag = Tag::new(user_id, name);
        self.conn
            .execute(
                "INSERT INTO tags (id, user_id, name, usage_count, created_at, is_user_created, color, description)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    tag.id.as_str(),
                    tag.user_id.clone(),
                    tag.name.clone(),
                    tag.usage_count,
                    tag.created_at,
                    i32::from(tag.is_user_created),
                    tag.color.clone(),
                    tag.description.clone(),
                ],
            )
            .await?;

        Ok(tag.id.as_str())
    }
}

#[async_trait]
impl LocalStore<ChatConversation> for LibSqlConversationStore {
    async fn upsert(&self, conversation: &ChatConversation) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chat_conversations
                 (id, user_id, title, created_at, updated_at, tags, message_count, is_saved, last_message_preview)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    conversation.id.as_str(),
                    conversation.user_id.clone(),
                    conversation.title.clone(),
                    conversation.created_at,
                    conversation.updated_at,
                    encode_tags(&conversation.tags)?,
                    conversation.message_count,
                    i32::from(conversation.is_saved),
                    conversation.last_message_preview.clone(),
                ],
            )
            .await?;

        self.sync_tags(conversation).await
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<ChatConversation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, title, created_at, updated_at, tags, message_count, is_saved, last_message_preview
                 FROM chat_conversations WHERE user_id = ? ORDER BY updated_at DESC",
                [user_id],
            )
            .await?;

        let mut conversations = Vec::new();
        while let Some(row) = rows.next().await? {
            conversations.push(Self::parse_row(&row)?);
        }
        Ok(conversations)
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        collect_ids(&self.conn, "chat_conversations", user_id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM chat_conversations WHERE id = ?", [id])
            .await?;
        Ok(())
    }
}

/// libSQL implementation of `MessageStore`
pub struct LibSqlMessageStore {
    conn: Connection,
}

impl LibSqlMessageStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &Row) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: parse_id(&row.get::<String>(0)?)?,
            user_id: row.get(1)?,
            conversation_id: parse_id(&row.get::<String>(2)?)?,
            content: row.get(3)?,
            is_from_user: row.get::<i32>(4)? != 0,
            timestamp: row.get(5)?,
            kind: opt_text(row, 6)?,
            metadata: opt_text(row, 7)?,
        })
    }
}

#[async_trait]
impl LocalStore<ChatMessage> for LibSqlMessageStore {
    async fn upsert(&self, message: &ChatMessage) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chat_messages
                 (id, user_id, conversation_id, content, is_from_user, timestamp, kind, metadata)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    message.id.as_str(),
                    message.user_id.clone(),
                    message.conversation_id.as_str(),
                    message.content.clone(),
                    i32::from(message.is_from_user),
                    message.timestamp,
                    message.kind.clone(),
                    message.metadata.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, conversation_id, content, is_from_user, timestamp, kind, metadata
                 FROM chat_messages WHERE user_id = ? ORDER BY timestamp",
                [user_id],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(Self::parse_row(&row)?);
        }
        Ok(messages)
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        collect_ids(&self.conn, "chat_messages", user_id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM chat_messages WHERE id = ?", [id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for LibSqlMessageStore {
    async fn for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, conversation_id, content, is_from_user, timestamp, kind, metadata
                 FROM chat_messages WHERE conversation_id = ? ORDER BY timestamp",
                [conversation_id.as_str()],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(Self::parse_row(&row)?);
        }
        Ok(messages)
    }
}

/// libSQL implementation of `LocalStore<Tag>`
pub struct LibSqlTagStore {
    conn: Connection,
}

impl LibSqlTagStore {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &Row) -> Result<Tag> {
        Ok(Tag {
            id: parse_id(&row.get::<String>(0)?)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            usage_count: row.get(3)?,
            created_at: row.get(4)?,
            is_user_created: row.get::<i32>(5)? != 0,
            color: opt_text(row, 6)?,
            description: opt_text(row, 7)?,
        })
    }
}

#[async_trait]
impl LocalStore<Tag> for LibSqlTagStore {
    async fn upsert(&self, tag: &Tag) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO tags
                 (id, user_id, name, usage_count, created_at, is_user_created, color, description)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    tag.id.as_str(),
                    tag.user_id.clone(),
                    tag.name.clone(),
                    tag.usage_count,
                    tag.created_at,
                    i32::from(tag.is_user_created),
                    tag.color.clone(),
                    tag.description.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<Tag>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, name, usage_count, created_at, is_user_created, color, description
                 FROM tags WHERE user_id = ? ORDER BY usage_count DESC, name ASC",
                [user_id],
            )
            .await?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            tags.push(Self::parse_row(&row)?);
        }
        Ok(tags)
    }

    async fn ids_for_user(&self, user_id: &str) -> Result<HashSet<String>> {
        collect_ids(&self.conn, "tags", user_id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM tags WHERE id = ?", [id])
            .await?;
        Ok(())
    }
}

async fn collect_ids(conn: &Connection, table: &str, user_id: &str) -> Result<HashSet<String>> {
    let mut rows = conn
        .query(
            &format!("SELECT id FROM {table} WHERE user_id = ?"),
            [user_id],
        )
        .await?;

    let mut ids = HashSet::new();
    while let Some(row) = rows.next().await? {
        ids.insert(row.get::<String>(0)?);
    }
    Ok(ids)
}

fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(text) => Ok(Some(text)),
        other => Err(Error::InvalidInput(format!(
            "unexpected column value at {idx}: {other:?}"
        ))),
    }
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("invalid id: {raw}")))
}

fn parse_mood(name: &str) -> Result<MoodLabel> {
    MoodLabel::from_name(name)
        .ok_or_else(|| Error::InvalidInput(format!("unknown mood label: {name}")))
}

fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn encode_tags(tags: &[String]) -> Result<String> {
    Ok(serde_json::to_string(tags)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{date_key, MoodCheckIn};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mood_roundtrip() {
        let db = setup().await;
        let store = LibSqlMoodStore::new(db.connection().clone());

        let check_in = MoodCheckIn::new("u1", MoodLabel::Good)
            .with_tags(vec!["calm".to_string()])
            .with_notes("fine");
        store.upsert(&check_in).await.unwrap();

        let all = store.all_for_user("u1").await.unwrap();
        assert_eq!(all, vec![check_in]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mood_one_per_day_replacement() {
        let db = setup().await;
        let store = LibSqlMoodStore::new(db.connection().clone());

        let morning = MoodCheckIn::new("u1", MoodLabel::Low);
        store.upsert(&morning).await.unwrap();

        // Different id, same user and calendar day
        let mut evening = MoodCheckIn::new("u1", MoodLabel::Good);
        evening.timestamp = morning.timestamp;
        evening.date_key = date_key(morning.timestamp);
        store.upsert(&evening).await.unwrap();

        let all = store.all_for_user("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, evening.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_journal_soft_delete_still_listed() {
        let db = setup().await;
        let store = LibSqlJournalStore::new(db.connection().clone());

        let entry = JournalEntry::new("u1", "to delete");
        store.upsert(&entry).await.unwrap();
        store.delete(&entry.id.as_str()).await.unwrap();

        // The tombstone stays visible to sync
        let all = store.all_for_user("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_deleted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_journal_delete_missing_is_not_found() {
        let db = setup().await;
        let store = LibSqlJournalStore::new(db.connection().clone());

        let missing = store.delete("no-such-id").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_conversation_upsert_links_tags() {
        let db = setup().await;
        let store = LibSqlConversationStore::new(db.connection().clone());
        let tag_store = LibSqlTagStore::new(db.connection().clone());

        let mut conversation = ChatConversation::new("u1");
        conversation.tags = vec!["sleep".to_string(), "anxiety".to_string()];
        store.upsert(&conversation).await.unwrap();

        let tags = tag_store.all_for_user("u1").await.unwrap();
        assert_eq!(tags.len(), 2);

        // Re-upserting with fewer tags rewrites the links without duplicating tags
        conversation.tags = vec!["sleep".to_string()];
        store.upsert(&conversation).await.unwrap();

        let mut rows = db
            .connection()
            .query(
                "SELECT COUNT(*) FROM conversation_tags WHERE conversation_id = ?",
                [conversation.id.as_str()],
            )
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_messages_by_conversation_in_order() {
        let db = setup().await;
        let conversations = LibSqlConversationStore::new(db.connection().clone());
        let messages = LibSqlMessageStore::new(db.connection().clone());

        let conversation = ChatConversation::new("u1");
        conversations.upsert(&conversation).await.unwrap();

        let mut first = ChatMessage::new("u1", conversation.id, "hello", true);
        first.timestamp = 1_000;
        let mut second = ChatMessage::new("u1", conversation.id, "hi there", false);
        second.timestamp = 2_000;
        messages.upsert(&second).await.unwrap();
        messages.upsert(&first).await.unwrap();

        let ordered = messages.for_conversation(&conversation.id).await.unwrap();
        assert_eq!(
            ordered.iter().map(|m| m.timestamp).collect::<Vec<_>>(),
            vec![1_000, 2_000]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ids_for_user_scopes_by_user() {
        let db = setup().await;
        let store = LibSqlJournalStore::new(db.connection().clone());

        let mine = JournalEntry::new("u1", "mine");
        let theirs = JournalEntry::new("u2", "theirs");
        store.upsert(&mine).await.unwrap();
        store.upsert(&theirs).await.unwrap();

        let ids = store.ids_for_user("u1").await.unwrap();
        assert_eq!(ids, HashSet::from([mine.id.as_str()]));
    }
}
