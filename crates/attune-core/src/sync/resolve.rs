//! Conflict resolution
//!
//! Applies a deterministic policy to produce a single winning (or merged)
//! record from a detected conflict. Winners are written to the local store
//! only; the next upload pass pushes them to the remote store, keeping local
//! as the single authoritative write path.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{date_key, JournalEntry, MoodCheckIn};
use crate::store::LocalStore;

use super::conflict::{ConflictKind, ConflictRecords, DataConflict};

/// The winning record produced by resolving one conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRecord {
    Mood(MoodCheckIn),
    Journal(JournalEntry),
}

/// One conflict that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Identifier of the conflicting record
    pub conflict_id: String,
    /// Why resolution failed
    pub message: String,
}

/// Per-item outcome of a `resolve_all` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Number of conflicts resolved and written back locally
    pub resolved: usize,
    /// Conflicts that failed, with their causes
    pub failures: Vec<ResolutionFailure>,
}

/// Resolves conflicts and writes the winners back to the local store
pub struct ConflictResolver {
    moods: Arc<dyn LocalStore<MoodCheckIn>>,
    journals: Arc<dyn LocalStore<JournalEntry>>,
}

impl ConflictResolver {
    #[must_use]
    pub fn new(
        moods: Arc<dyn LocalStore<MoodCheckIn>>,
        journals: Arc<dyn LocalStore<JournalEntry>>,
    ) -> Self {
        Self { moods, journals }
    }

    /// Resolve a single conflict into its winning record. Pure and
    /// deterministic; does not touch any store.
    #[must_use]
    pub fn resolve(conflict: &DataConflict) -> ResolvedRecord {
        match (&conflict.records, conflict.kind) {
            // Later timestamp wins outright; the loser is discarded.
            (ConflictRecords::Mood { local, remote }, ConflictKind::TimestampMismatch) => {
                ResolvedRecord::Mood(later_of(local, remote, |check_in| check_in.timestamp))
            }
            (ConflictRecords::Journal { local, remote }, ConflictKind::TimestampMismatch) => {
                ResolvedRecord::Journal(later_of(local, remote, |entry| entry.timestamp))
            }

            // Merge rather than pick-one; duplicate ids get the same safe
            // treatment so divergent edits are never silently dropped.
            (
                ConflictRecords::Mood { local, remote },
                ConflictKind::ContentDifference | ConflictKind::DuplicateId,
            ) => ResolvedRecord::Mood(merge_moods(local, remote)),
            (
                ConflictRecords::Journal { local, remote },
                ConflictKind::ContentDifference | ConflictKind::DuplicateId,
            ) => ResolvedRecord::Journal(merge_journals(local, remote)),

            // The user's local intent is authoritative over a stale remote
            // deletion or edit.
            (ConflictRecords::Mood { local, .. }, ConflictKind::DeletionConflict) => {
                ResolvedRecord::Mood(local.clone())
            }
            (ConflictRecords::Journal { local, .. }, ConflictKind::DeletionConflict) => {
                ResolvedRecord::Journal(local.clone())
            }
        }
    }

    /// Resolve every conflict, best-effort
    ///
    /// A failure writing one winner back never aborts the rest; each item's
    /// outcome is accumulated in the report.
    pub async fn resolve_all(&self, conflicts: &[DataConflict]) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        for conflict in conflicts {
            let write = match Self::resolve(conflict) {
                ResolvedRecord::Mood(winner) => self.moods.upsert(&winner).await,
                ResolvedRecord::Journal(winner) => self.journals.upsert(&winner).await,
            };

            match write {
                Ok(()) => report.resolved += 1,
                Err(err) => {
                    tracing::warn!(
                        id = conflict.id,
                        data_type = %conflict.data_type(),
                        error = %err,
                        "Failed to write resolved record, continuing"
                    );
                    report.failures.push(ResolutionFailure {
                        conflict_id: conflict.id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            resolved = report.resolved,
            failed = report.failures.len(),
            "Conflict resolution pass finished"
        );
        report
    }
}

fn later_of<E: Clone>(local: &E, remote: &E, timestamp: impl Fn(&E) -> i64) -> E {
    if timestamp(remote) > timestamp(local) {
        remote.clone()
    } else {
        local.clone()
    }
}

/// Merge two mood check-ins: tag union, longer notes, later timestamp
fn merge_moods(local: &MoodCheckIn, remote: &MoodCheckIn) -> MoodCheckIn {
    let mut merged = later_of(local, remote, |check_in| check_in.timestamp);

    let mut tags = local.tags.clone();
    for tag in &remote.tags {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    merged.tags = tags;

    merged.notes = longer_of(local.notes.as_deref(), remote.notes.as_deref());
    merged.timestamp = local.timestamp.max(remote.timestamp);
    merged.date_key = date_key(merged.timestamp);
    merged
}

/// Merge two journal entries: longer content wins, later timestamp adopted
fn merge_journals(local: &JournalEntry, remote: &JournalEntry) -> JournalEntry {
    let mut merged = if remote.content.len() > local.content.len() {
        remote.clone()
    } else {
        local.clone()
    };
    merged.timestamp = local.timestamp.max(remote.timestamp);
    merged
}

fn longer_of(left: Option<&str>, right: Option<&str>) -> Option<String> {
    match (left, right) {
        (Some(a), Some(b)) => Some(if b.len() > a.len() { b } else { a }.to_string()),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}
