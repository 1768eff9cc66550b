//! attune-core - Core sync library for Attune
//!
//! This crate contains the shared models, local database layer, cache policy,
//! and the offline-first sync engine used by all Attune clients.

pub mod cache;
pub mod db;
pub mod error;
pub mod models;
pub mod net;
pub mod session;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use sync::{SyncEngine, SyncOutcome, SyncReport};
