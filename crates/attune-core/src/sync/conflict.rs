//! Conflict detection
//!
//! Compares local and remote copies of the same logical record and classifies
//! any divergence. One-sided records (present on only one side) are not
//! conflicts; plain download/upload copy handles them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::DataType;
use crate::error::Result;
use crate::models::{JournalEntry, MoodCheckIn};
use crate::store::{LocalStore, RemoteStore, SyncEntity};

use super::SyncTunables;

/// Classification of a detected divergence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Timestamps differ by more than the per-type skew threshold
    TimestampMismatch,
    /// Timestamps are close but the payload content differs
    ContentDifference,
    /// One side was deleted while the other was modified
    DeletionConflict,
    /// The same identifier was independently created on both sides
    DuplicateId,
}

/// The diverging local/remote pair, as a closed union over the
/// conflict-bearing data types
///
/// Resolution pattern-matches exhaustively over this, so adding a data type
/// forces explicit merge logic for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictRecords {
    Mood {
        local: MoodCheckIn,
        remote: MoodCheckIn,
    },
    Journal {
        local: JournalEntry,
        remote: JournalEntry,
    },
}

impl ConflictRecords {
    /// The data type the conflicting records belong to
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Mood { .. } => DataType::MoodCheckIns,
            Self::Journal { .. } => DataType::JournalEntries,
        }
    }
}

/// A single detected conflict, produced during one sync pass and consumed
/// immediately by resolution. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConflict {
    /// Identifier shared by both sides
    pub id: String,
    /// Divergence classification
    pub kind: ConflictKind,
    /// The diverging pair
    pub records: ConflictRecords,
}

impl DataConflict {
    /// The data type the conflict belongs to
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.records.data_type()
    }
}

/// Detects divergence between local and remote record sets
pub struct ConflictDetector {
    moods: Arc<dyn LocalStore<MoodCheckIn>>,
    journals: Arc<dyn LocalStore<JournalEntry>>,
    remote: Arc<dyn RemoteStore>,
    tunables: SyncTunables,
}

impl ConflictDetector {
    #[must_use]
    pub fn new(
        moods: Arc<dyn LocalStore<MoodCheckIn>>,
        journals: Arc<dyn LocalStore<JournalEntry>>,
        remote: Arc<dyn RemoteStore>,
        tunables: SyncTunables,
    ) -> Self {
        Self {
            moods,
            journals,
            remote,
            tunables,
        }
    }

    /// Detect every conflict between the user's local and remote records
    ///
    /// Only mood check-ins and journal entries are inspected: they carry
    /// user-authored payloads with merge policies. Conversations, messages,
    /// and tags are append-style records where an id collision is the same
    /// record, so plain download/upload copy handles them.
    ///
    /// Detection is total: every divergent pair produces exactly one
    /// `DataConflict`. Output ordering is not significant.
    pub async fn detect_conflicts(&self, user_id: &str) -> Result<Vec<DataConflict>> {
        let mut conflicts = Vec::new();

        let remote_moods = self.fetch_remote::<MoodCheckIn>(user_id).await?;
        for local in self.moods.all_for_user(user_id).await? {
            let Some(remote) = remote_moods.get(&local.id.as_str()) else {
                continue;
            };
            if let Some(kind) = classify_moods(&local, remote, self.tunables.mood_skew_ms) {
                conflicts.push(DataConflict {
                    id: local.id.as_str(),
                    kind,
                    records: ConflictRecords::Mood {
                        local,
                        remote: remote.clone(),
                    },
                });
            }
        }

        let remote_journals = self.fetch_remote::<JournalEntry>(user_id).await?;
        for local in self.journals.all_for_user(user_id).await? {
            let Some(remote) = remote_journals.get(&local.id.as_str()) else {
                continue;
            };
            if let Some(kind) = classify_journals(&local, remote, self.tunables.journal_skew_ms) {
                conflicts.push(DataConflict {
                    id: local.id.as_str(),
                    kind,
                    records: ConflictRecords::Journal {
                        local,
                        remote: remote.clone(),
                    },
                });
            }
        }

        tracing::debug!(user = user_id, count = conflicts.len(), "Conflict detection finished");
        Ok(conflicts)
    }

    async fn fetch_remote<E: SyncEntity>(&self, user_id: &str) -> Result<HashMap<String, E>> {
        let docs = self.remote.list(user_id, E::COLLECTION).await?;
        let mut records = HashMap::with_capacity(docs.len());
        for doc in docs {
            match E::from_document(doc) {
                Ok(entity) => {
                    records.insert(entity.entity_id(), entity);
                }
                Err(err) => {
                    tracing::warn!(
                        collection = E::COLLECTION,
                        error = %err,
                        "Skipping malformed remote document"
                    );
                }
            }
        }
        Ok(records)
    }
}

/// Classify a diverging mood check-in pair, if the pair diverges at all
fn classify_moods(local: &MoodCheckIn, remote: &MoodCheckIn, skew_ms: i64) -> Option<ConflictKind> {
    if (local.timestamp - remote.timestamp).abs() > skew_ms {
        return Some(ConflictKind::TimestampMismatch);
    }

    let payload_differs =
        local.mood != remote.mood || local.notes != remote.notes || !same_tag_set(local, remote);
    payload_differs.then_some(ConflictKind::ContentDifference)
}

/// Classify a diverging journal entry pair, if the pair diverges at all
fn classify_journals(
    local: &JournalEntry,
    remote: &JournalEntry,
    skew_ms: i64,
) -> Option<ConflictKind> {
    if local.is_deleted != remote.is_deleted {
        return Some(ConflictKind::DeletionConflict);
    }

    if (local.timestamp - remote.timestamp).abs() > skew_ms {
        return Some(ConflictKind::TimestampMismatch);
    }

    if local.content != remote.content {
        if contents_unrelated(&local.content, &remote.content) {
            return Some(ConflictKind::DuplicateId);
        }
        return Some(ConflictKind::ContentDifference);
    }

    (local.mood != remote.mood).then_some(ConflictKind::ContentDifference)
}

fn same_tag_set(local: &MoodCheckIn, remote: &MoodCheckIn) -> bool {
    use std::collections::HashSet;
    let left: HashSet<&str> = local.tags.iter().map(String::as_str).collect();
    let right: HashSet<&str> = remote.tags.iter().map(String::as_str).collect();
    left == right
}

/// Heuristic for "same id, unrelated record": neither body contains the
/// other and they share no common prefix worth speaking of.
fn contents_unrelated(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    if left.contains(right) || right.contains(left) {
        return false;
    }
    let prefix_len = left
        .chars()
        .zip(right.chars())
        .take_while(|(a, b)| a == b)
        .count();
    prefix_len < 8
}
