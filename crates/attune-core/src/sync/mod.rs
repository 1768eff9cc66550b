//! Offline-first synchronization engine
//!
//! The local store is the authoritative source for reads; the remote store
//! exists for cross-device durability and is reconciled into the local store.
//! This module drives download backfill, upload of pending local data, and
//! full bidirectional reconciliation with conflict handling.

mod conflict;
mod engine;
mod resolve;

pub use conflict::{ConflictDetector, ConflictKind, ConflictRecords, DataConflict};
pub use engine::{EntityOutcome, LocalStores, SyncEngine, SyncOutcome, SyncReport};
pub use resolve::{ConflictResolver, ResolutionFailure, ResolutionReport, ResolvedRecord};

/// Tunable sync behavior
///
/// The defaults match production behavior; they are configuration, not
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTunables {
    /// Conflict count at or above which reconciliation asks the user instead
    /// of auto-resolving
    pub auto_resolve_limit: usize,
    /// Timestamp skew beyond which two mood check-ins conflict (ms)
    pub mood_skew_ms: i64,
    /// Timestamp skew beyond which two journal entries conflict (ms)
    pub journal_skew_ms: i64,
}

impl Default for SyncTunables {
    fn default() -> Self {
        Self {
            auto_resolve_limit: 5,
            mood_skew_ms: 5_000,
            journal_skew_ms: 10_000,
        }
    }
}

impl SyncTunables {
    /// Set the auto-resolve conflict limit
    #[must_use]
    pub const fn with_auto_resolve_limit(mut self, limit: usize) -> Self {
        self.auto_resolve_limit = limit;
        self
    }

    /// Set the mood check-in timestamp skew threshold
    #[must_use]
    pub const fn with_mood_skew_ms(mut self, skew_ms: i64) -> Self {
        self.mood_skew_ms = skew_ms;
        self
    }

    /// Set the journal entry timestamp skew threshold
    #[must_use]
    pub const fn with_journal_skew_ms(mut self, skew_ms: i64) -> Self {
        self.journal_skew_ms = skew_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tunables() {
        let tunables = SyncTunables::default();
        assert_eq!(tunables.auto_resolve_limit, 5);
        assert_eq!(tunables.mood_skew_ms, 5_000);
        assert_eq!(tunables.journal_skew_ms, 10_000);
    }

    #[test]
    fn test_builders() {
        let tunables = SyncTunables::default()
            .with_auto_resolve_limit(10)
            .with_mood_skew_ms(1_000)
            .with_journal_skew_ms(2_000);
        assert_eq!(tunables.auto_resolve_limit, 10);
        assert_eq!(tunables.mood_skew_ms, 1_000);
        assert_eq!(tunables.journal_skew_ms, 2_000);
    }
}
