//! Local database layer for Attune

mod connection;
mod migrations;
mod stores;

pub use connection::Database;
pub use stores::{
    LibSqlConversationStore, LibSqlJournalStore, LibSqlMessageStore, LibSqlMoodStore,
    LibSqlTagStore,
};
