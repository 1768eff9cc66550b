//! Database connection management

use std::path::Path;
use std::sync::Arc;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use crate::error::Result;
use crate::sync::LocalStores;

use super::migrations;
use super::stores::{
    LibSqlConversationStore, LibSqlJournalStore, LibSqlMessageStore, LibSqlMoodStore,
    LibSqlTagStore,
};

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::build(&path_str).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::build(":memory:").await
    }

    async fn build(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is not supported for in-memory databases; ignore failures
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Build the full set of libSQL-backed local stores over this database
    #[must_use]
    pub fn local_stores(&self) -> LocalStores {
        LocalStores {
            moods: Arc::new(LibSqlMoodStore::new(self.conn.clone())),
            journals: Arc::new(LibSqlJournalStore::new(self.conn.clone())),
            conversations: Arc::new(LibSqlConversationStore::new(self.conn.clone())),
            messages: Arc::new(LibSqlMessageStore::new(self.conn.clone())),
            tags: Arc::new(LibSqlTagStore::new(self.conn.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_on_disk_creates_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("attune.db");

        let _db = Database::open(&path).await.unwrap();
        assert!(path.exists());
    }
}
