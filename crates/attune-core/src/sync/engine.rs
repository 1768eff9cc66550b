//! Sync engine orchestrator
//!
//! Drives the end-to-end synchronization protocol: download backfill from the
//! remote store, upload of pending local data, and full bidirectional
//! reconciliation with conflict handling. Sequential per invocation; one pass
//! at a time per engine.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::DataType;
use crate::error::{Error, Result};
use crate::models::{ChatConversation, ChatMessage, JournalEntry, MoodCheckIn, Tag};
use crate::net::NetworkMonitor;
use crate::session::SessionProvider;
use crate::store::{LocalStore, MessageStore, RemoteStore, SyncEntity};

use super::conflict::{ConflictDetector, DataConflict};
use super::resolve::ConflictResolver;
use super::SyncTunables;

/// The local stores the engine synchronizes, one per entity type
#[derive(Clone)]
pub struct LocalStores {
    pub moods: Arc<dyn LocalStore<MoodCheckIn>>,
    pub journals: Arc<dyn LocalStore<JournalEntry>>,
    pub conversations: Arc<dyn LocalStore<ChatConversation>>,
    pub messages: Arc<dyn MessageStore>,
    pub tags: Arc<dyn LocalStore<Tag>>,
}

/// Outcome of syncing one entity type within a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    /// Which entity type this outcome describes
    pub data_type: DataType,
    /// Records copied from remote into local
    pub downloaded: u64,
    /// Records pushed from local to remote
    pub uploaded: u64,
    /// Why this entity type failed, if it did
    pub error: Option<String>,
}

/// Per-entity accumulator for one sync pass
///
/// Failure isolation is per data type: an entry with an error here means that
/// type failed while its siblings proceeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl SyncReport {
    fn record(&mut self, data_type: DataType, result: Result<(u64, u64)>) {
        let outcome = match result {
            Ok((downloaded, uploaded)) => EntityOutcome {
                data_type,
                downloaded,
                uploaded,
                error: None,
            },
            Err(err) => {
                tracing::warn!(%data_type, error = %err, "Entity sync failed, continuing");
                EntityOutcome {
                    data_type,
                    downloaded: 0,
                    uploaded: 0,
                    error: Some(err.to_string()),
                }
            }
        };
        self.outcomes.push(outcome);
    }

    fn merge(&mut self, other: Self) {
        self.outcomes.extend(other.outcomes);
    }

    /// Total records copied from remote into local
    pub fn downloaded(&self) -> u64 {
        self.outcomes.iter().map(|outcome| outcome.downloaded).sum()
    }

    /// Total records pushed from local to remote
    pub fn uploaded(&self) -> u64 {
        self.outcomes.iter().map(|outcome| outcome.uploaded).sum()
    }

    /// Outcomes for entity types that failed
    pub fn failures(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.error.is_some())
    }

    /// Whether every entity type succeeded
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Convert a report with failures into a `PartialSync` error
    pub fn ensure_complete(self) -> Result<Self> {
        let failed = self.failures().count();
        if failed == 0 {
            Ok(self)
        } else {
            Err(Error::PartialSync {
                failed,
                attempted: self.outcomes.len(),
            })
        }
    }
}

/// Result of a full reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Reconciliation ran to completion
    Completed {
        /// Conflicts auto-resolved before the plain sync
        resolved: usize,
        /// Per-entity outcomes of the download + upload that followed
        report: SyncReport,
    },
    /// Too many conflicts to auto-merge; nothing was synced and the caller
    /// must surface these to the user
    NeedsUserInput(Vec<DataConflict>),
}

/// How a sync pass should proceed for the current session
enum Gate {
    Run(String),
    GuestSkip,
}

/// Orchestrates synchronization between the local and remote stores
pub struct SyncEngine {
    stores: LocalStores,
    remote: Arc<dyn RemoteStore>,
    network: Arc<dyn NetworkMonitor>,
    session: Arc<dyn SessionProvider>,
    tunables: SyncTunables,
    // Guards the whole pass; re-entrant calls are rejected, never concurrent.
    syncing: Mutex<()>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        stores: LocalStores,
        remote: Arc<dyn RemoteStore>,
        network: Arc<dyn NetworkMonitor>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            stores,
            remote,
            network,
            session,
            tunables: SyncTunables::default(),
            syncing: Mutex::new(()),
        }
    }

    /// Override the default sync tunables
    #[must_use]
    pub fn with_tunables(mut self, tunables: SyncTunables) -> Self {
        self.tunables = tunables;
        self
    }

    /// Pull all remote collections for the current user into the local store
    ///
    /// Pure backfill: only records whose identifier is not already present
    /// locally are inserted, never overwriting local data. Used after
    /// sign-in on a new device.
    pub async fn download_cloud_data(&self) -> Result<SyncReport> {
        let user_id = match self.gate()? {
            Gate::GuestSkip => return Ok(SyncReport::default()),
            Gate::Run(user_id) => user_id,
        };
        let _pass = self.begin()?;

        tracing::info!(user = user_id, "Starting cloud download");
        Ok(self.run_download(&user_id).await)
    }

    /// Push every local record for the current user to the remote store
    ///
    /// Upserts keyed by stable identifier: running this twice with unchanged
    /// data leaves the remote state identical.
    pub async fn sync_pending_data(&self) -> Result<SyncReport> {
        let user_id = match self.gate()? {
            Gate::GuestSkip => return Ok(SyncReport::default()),
            Gate::Run(user_id) => user_id,
        };
        let _pass = self.begin()?;

        tracing::info!(user = user_id, "Starting upload of pending data");
        Ok(self.run_upload(&user_id).await)
    }

    /// Full bidirectional reconciliation with conflict handling
    ///
    /// Conflicts below the auto-resolve limit are merged automatically and
    /// the pass proceeds to a plain download + upload. At or above the limit
    /// nothing is synced; the unresolved conflicts are returned for the user
    /// to decide. Large-scale divergence is not silently auto-merged.
    pub async fn sync_with_conflict_resolution(&self) -> Result<SyncOutcome> {
        let user_id = match self.gate()? {
            Gate::GuestSkip => {
                return Ok(SyncOutcome::Completed {
                    resolved: 0,
                    report: SyncReport::default(),
                })
            }
            Gate::Run(user_id) => user_id,
        };
        let _pass = self.begin()?;

        let detector = ConflictDetector::new(
            self.stores.moods.clone(),
            self.stores.journals.clone(),
            self.remote.clone(),
            self.tunables.clone(),
        );
        let conflicts = detector.detect_conflicts(&user_id).await?;

        if conflicts.len() >= self.tunables.auto_resolve_limit {
            tracing::warn!(
                user = user_id,
                conflicts = conflicts.len(),
                limit = self.tunables.auto_resolve_limit,
                "Too many conflicts to auto-resolve, deferring to user"
            );
            return Ok(SyncOutcome::NeedsUserInput(conflicts));
        }

        let resolved = if conflicts.is_empty() {
            0
        } else {
            let resolver = ConflictResolver::new(
                self.stores.moods.clone(),
                self.stores.journals.clone(),
            );
            resolver.resolve_all(&conflicts).await.resolved
        };

        // Download first so backfill cannot overwrite freshly merged records
        // (it skips existing ids); upload then pushes them to remote.
        let mut report = self.run_download(&user_id).await;
        report.merge(self.run_upload(&user_id).await);

        Ok(SyncOutcome::Completed { resolved, report })
    }

    /// Synchronize a single data type on demand
    ///
    /// Targeted refresh for one collection, e.g. after the cache policy
    /// invalidates it. Same gating as the full passes; errors surface
    /// directly since there are no sibling types to isolate. Conversations
    /// and chat messages sync together; `Profile` is cache bookkeeping only
    /// and cannot be synced.
    pub async fn sync_data_type(&self, data_type: DataType) -> Result<EntityOutcome> {
        let user_id = match self.gate()? {
            Gate::GuestSkip => {
                return Ok(EntityOutcome {
                    data_type,
                    downloaded: 0,
                    uploaded: 0,
                    error: None,
                })
            }
            Gate::Run(user_id) => user_id,
        };
        let _pass = self.begin()?;

        tracing::info!(user = user_id, %data_type, "Starting targeted sync");
        let (downloaded, uploaded) = match data_type {
            DataType::MoodCheckIns => {
                self.sync_collection(&*self.stores.moods, &user_id).await?
            }
            DataType::JournalEntries => {
                self.sync_collection(&*self.stores.journals, &user_id)
                    .await?
            }
            DataType::Conversations | DataType::ChatMessages => {
                let downloaded = self.download_conversations(&user_id).await?;
                let uploaded = self.upload_conversations(&user_id).await?;
                (downloaded, uploaded)
            }
            DataType::Tags => self.sync_collection(&*self.stores.tags, &user_id).await?,
            DataType::Profile => {
                return Err(Error::InvalidInput(
                    "profile is not a synchronized collection".to_string(),
                ))
            }
        };

        Ok(EntityOutcome {
            data_type,
            downloaded,
            uploaded,
            error: None,
        })
    }

    /// Read the session once and decide how this pass proceeds
    ///
    /// The identity is fixed here for the whole pass; a session change
    /// mid-flight does not affect a running sync.
    fn gate(&self) -> Result<Gate> {
        let session = self.session.current();
        let Some(user_id) = session.user_id else {
            return Err(Error::NoSession);
        };
        if session.is_guest {
            tracing::debug!(user = user_id, "Guest session, sync skipped");
            return Ok(Gate::GuestSkip);
        }
        if !self.network.is_available() {
            return Err(Error::NoNetwork);
        }
        Ok(Gate::Run(user_id))
    }

    /// Acquire the exclusive pass gate, rejecting re-entrant calls
    fn begin(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.syncing.try_lock().map_err(|_| Error::SyncInProgress)
    }

    async fn run_download(&self, user_id: &str) -> SyncReport {
        let mut report = SyncReport::default();
        report.record(
            DataType::MoodCheckIns,
            self.download_collection(&*self.stores.moods, user_id)
                .await
                .map(|n| (n, 0)),
        );
        report.record(
            DataType::JournalEntries,
            self.download_collection(&*self.stores.journals, user_id)
                .await
                .map(|n| (n, 0)),
        );
        report.record(
            DataType::Conversations,
            self.download_conversations(user_id).await.map(|n| (n, 0)),
        );
        report.record(
            DataType::Tags,
            self.download_collection(&*self.stores.tags, user_id)
                .await
                .map(|n| (n, 0)),
        );
        report
    }

    async fn run_upload(&self, user_id: &str) -> SyncReport {
        let mut report = SyncReport::default();
        report.record(
            DataType::MoodCheckIns,
            self.upload_collection(&*self.stores.moods, user_id)
                .await
                .map(|n| (0, n)),
        );
        report.record(
            DataType::JournalEntries,
            self.upload_collection(&*self.stores.journals, user_id)
                .await
                .map(|n| (0, n)),
        );
        report.record(
            DataType::Conversations,
            self.upload_conversations(user_id).await.map(|n| (0, n)),
        );
        report.record(
            DataType::Tags,
            self.upload_collection(&*self.stores.tags, user_id)
                .await
                .map(|n| (0, n)),
        );
        report
    }

    /// Download then upload one collection
    async fn sync_collection<E, S>(&self, local: &S, user_id: &str) -> Result<(u64, u64)>
    where
        E: SyncEntity,
        S: LocalStore<E> + ?Sized,
    {
        let downloaded = self.download_collection(local, user_id).await?;
        let uploaded = self.upload_collection(local, user_id).await?;
        Ok((downloaded, uploaded))
    }

    /// Backfill one collection: insert remote records whose id is unknown
    /// locally, skip the rest
    async fn download_collection<E, S>(&self, local: &S, user_id: &str) -> Result<u64>
    where
        E: SyncEntity,
        S: LocalStore<E> + ?Sized,
    {
        let existing = local.ids_for_user(user_id).await?;
        let docs = self.remote.list(user_id, E::COLLECTION).await?;

        let mut inserted = 0;
        for doc in docs {
            let entity = match E::from_document(doc) {
                Ok(entity) => entity,
                Err(err) => {
                    tracing::warn!(
                        collection = E::COLLECTION,
                        error = %err,
                        "Skipping malformed remote document"
                    );
                    continue;
                }
            };
            if existing.contains(&entity.entity_id()) {
                continue;
            }
            local.upsert(&entity).await?;
            inserted += 1;
        }

        tracing::debug!(collection = E::COLLECTION, inserted, "Download step finished");
        Ok(inserted)
    }

    /// Backfill conversations, then the messages nested under each
    async fn download_conversations(&self, user_id: &str) -> Result<u64> {
        let mut inserted = self
            .download_collection(&*self.stores.conversations, user_id)
            .await?;

        let known_messages = self.stores.messages.ids_for_user(user_id).await?;
        for conversation in self.stores.conversations.all_for_user(user_id).await? {
            let docs = self
                .remote
                .list_messages(user_id, &conversation.id.as_str())
                .await?;
            for doc in docs {
                let message = match ChatMessage::from_document(doc) {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping malformed remote message");
                        continue;
                    }
                };
                if known_messages.contains(&message.entity_id()) {
                    continue;
                }
                self.stores.messages.upsert(&message).await?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Push every local record in one collection to the remote store
    async fn upload_collection<E, S>(&self, local: &S, user_id: &str) -> Result<u64>
    where
        E: SyncEntity,
        S: LocalStore<E> + ?Sized,
    {
        let mut uploaded = 0;
        for entity in local.all_for_user(user_id).await? {
            self.remote
                .put(user_id, E::COLLECTION, &entity.entity_id(), &entity.to_document()?)
                .await?;
            uploaded += 1;
        }

        tracing::debug!(collection = E::COLLECTION, uploaded, "Upload step finished");
        Ok(uploaded)
    }

    /// Push conversations, cascading into each one's messages
    ///
    /// A message failure is logged and counted but never blocks the
    /// remaining conversations.
    async fn upload_conversations(&self, user_id: &str) -> Result<u64> {
        let mut uploaded = 0;
        for conversation in self.stores.conversations.all_for_user(user_id).await? {
            self.remote
                .put(
                    user_id,
                    ChatConversation::COLLECTION,
                    &conversation.entity_id(),
                    &conversation.to_document()?,
                )
                .await?;
            uploaded += 1;

            for message in self
                .stores
                .messages
                .for_conversation(&conversation.id)
                .await?
            {
                let result = match message.to_document() {
                    Ok(doc) => {
                        self.remote
                            .put_message(
                                user_id,
                                &conversation.id.as_str(),
                                &message.entity_id(),
                                &doc,
                            )
                            .await
                    }
                    Err(err) => Err(err),
                };

                match result {
                    Ok(()) => uploaded += 1,
                    Err(err) => {
                        tracing::warn!(
                            conversation = %conversation.id,
                            message = %message.id,
                            error = %err,
                            "Message upload failed, continuing"
                        );
                    }
                }
            }
        }
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoodLabel;
    use crate::net::ConnectivityMonitor;
    use crate::session::{Session, SessionHandle};
    use crate::store::{MemoryLocalStore, MemoryRemoteStore};
    use pretty_assertions::assert_eq;

    struct Fixture {
        engine: SyncEngine,
        remote: Arc<MemoryRemoteStore>,
        session: Arc<SessionHandle>,
        network: Arc<ConnectivityMonitor>,
        moods: Arc<MemoryLocalStore<MoodCheckIn>>,
    }

    fn fixture(session: Session, online: bool) -> Fixture {
        let moods = Arc::new(MemoryLocalStore::<MoodCheckIn>::new());
        let stores = LocalStores {
            moods: moods.clone(),
            journals: Arc::new(MemoryLocalStore::<JournalEntry>::new()),
            conversations: Arc::new(MemoryLocalStore::<ChatConversation>::new()),
            messages: Arc::new(MemoryLocalStore::<ChatMessage>::new()),
            tags: Arc::new(MemoryLocalStore::<Tag>::new()),
        };
        let remote = Arc::new(MemoryRemoteStore::new());
        let session = Arc::new(SessionHandle::new(session));
        let network = Arc::new(ConnectivityMonitor::new(online));
        let engine = SyncEngine::new(
            stores,
            remote.clone(),
            network.clone(),
            session.clone(),
        );
        Fixture {
            engine,
            remote,
            session,
            network,
            moods,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_session_fails_fast() {
        let fx = fixture(Session::signed_out(), true);
        assert!(matches!(
            fx.engine.download_cloud_data().await,
            Err(Error::NoSession)
        ));
        assert!(matches!(
            fx.engine.sync_pending_data().await,
            Err(Error::NoSession)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_fails_fast() {
        let fx = fixture(Session::authenticated("u1"), false);
        assert!(matches!(
            fx.engine.download_cloud_data().await,
            Err(Error::NoNetwork)
        ));

        fx.network.set_available(true);
        assert!(fx.engine.download_cloud_data().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_guest_sync_is_a_noop_success() {
        let fx = fixture(Session::guest("local-guest"), true);
        fx.moods
            .upsert(&MoodCheckIn::new("local-guest", MoodLabel::Good))
            .await
            .unwrap();

        let report = fx.engine.sync_pending_data().await.unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(fx.remote.write_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_never_overwrites_local() {
        let fx = fixture(Session::authenticated("u1"), true);

        let local = MoodCheckIn::new("u1", MoodLabel::Good).with_notes("local copy");
        fx.moods.upsert(&local).await.unwrap();
        let mut remote_copy = local.clone();
        remote_copy.notes = Some("remote copy".to_string());
        fx.remote
            .put(
                "u1",
                MoodCheckIn::COLLECTION,
                &remote_copy.id.as_str(),
                &remote_copy.to_document().unwrap(),
            )
            .await
            .unwrap();

        let report = fx.engine.download_cloud_data().await.unwrap();
        assert_eq!(report.downloaded(), 0);
        assert_eq!(
            fx.moods.get(&local.id.as_str()).unwrap().notes.as_deref(),
            Some("local copy")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upload_is_idempotent() {
        let fx = fixture(Session::authenticated("u1"), true);
        fx.moods
            .upsert(&MoodCheckIn::new("u1", MoodLabel::Okay))
            .await
            .unwrap();

        let first = fx.engine.sync_pending_data().await.unwrap();
        assert_eq!(first.uploaded(), 1);

        let state_after_first = fx.remote.list("u1", MoodCheckIn::COLLECTION).await.unwrap();
        let second = fx.engine.sync_pending_data().await.unwrap();
        let state_after_second = fx.remote.list("u1", MoodCheckIn::COLLECTION).await.unwrap();

        assert_eq!(second.uploaded(), 1);
        assert_eq!(state_after_first, state_after_second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_read_once_at_entry() {
        let fx = fixture(Session::authenticated("u1"), true);
        fx.moods
            .upsert(&MoodCheckIn::new("u1", MoodLabel::Good))
            .await
            .unwrap();

        // The pass captured "u1"; a later session change affects later passes
        let report = fx.engine.sync_pending_data().await.unwrap();
        assert_eq!(report.uploaded(), 1);

        fx.session.set(Session::signed_out());
        assert!(matches!(
            fx.engine.sync_pending_data().await,
            Err(Error::NoSession)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_single_data_type_leaves_siblings_alone() {
        let fx = fixture(Session::authenticated("u1"), true);
        fx.moods
            .upsert(&MoodCheckIn::new("u1", MoodLabel::Good))
            .await
            .unwrap();

        // Syncing journals does not touch the pending mood
        let outcome = fx.engine.sync_data_type(DataType::JournalEntries).await.unwrap();
        assert_eq!(outcome.data_type, DataType::JournalEntries);
        assert_eq!(outcome.uploaded, 0);
        assert_eq!(fx.remote.write_count(), 0);

        let outcome = fx.engine.sync_data_type(DataType::MoodCheckIns).await.unwrap();
        assert_eq!(outcome.uploaded, 1);
        assert_eq!(fx.remote.write_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_profile_is_invalid_input() {
        let fx = fixture(Session::authenticated("u1"), true);
        assert!(matches!(
            fx.engine.sync_data_type(DataType::Profile).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_single_data_type_guest_noop() {
        let fx = fixture(Session::guest("local-guest"), true);
        fx.moods
            .upsert(&MoodCheckIn::new("local-guest", MoodLabel::Low))
            .await
            .unwrap();

        let outcome = fx.engine.sync_data_type(DataType::MoodCheckIns).await.unwrap();
        assert_eq!(outcome.uploaded, 0);
        assert_eq!(outcome.downloaded, 0);
        assert_eq!(fx.remote.write_count(), 0);
    }

    #[test]
    fn test_report_partial_failure_conversion() {
        let mut report = SyncReport::default();
        report.record(DataType::MoodCheckIns, Ok((1, 0)));
        report.record(
            DataType::Tags,
            Err(Error::Remote("upstream 503".to_string())),
        );

        assert!(!report.is_complete());
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.ensure_complete(),
            Err(Error::PartialSync {
                failed: 1,
                attempted: 2
            })
        ));
    }
}
