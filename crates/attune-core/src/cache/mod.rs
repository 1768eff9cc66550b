//! Cache policy engine
//!
//! Computes per-data-type cache lifetimes adjusted by observed user activity
//! and advises whether cached data must be treated as stale. Purely advisory:
//! it never triggers a fetch itself.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::models::CacheMetadata;
use crate::net::NetworkMonitor;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// How recently the user interacted with the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActivityLevel {
    /// Interaction within the last 5 minutes
    Active,
    /// Interaction within the last 30 minutes
    Inactive,
    /// No interaction for 30 minutes or more
    Background,
}

/// The kinds of cached data the policy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    MoodCheckIns,
    JournalEntries,
    Conversations,
    ChatMessages,
    Tags,
    Profile,
}

impl DataType {
    /// All data types, in the fixed sync order
    pub const ALL: [Self; 6] = [
        Self::MoodCheckIns,
        Self::JournalEntries,
        Self::Conversations,
        Self::ChatMessages,
        Self::Tags,
        Self::Profile,
    ];

    /// High-priority types are refreshed whenever the network allows
    #[must_use]
    pub const fn is_high_priority(self) -> bool {
        matches!(self, Self::Profile | Self::MoodCheckIns)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoodCheckIns => "mood_check_ins",
            Self::JournalEntries => "journal_entries",
            Self::Conversations => "conversations",
            Self::ChatMessages => "chat_messages",
            Self::Tags => "tags",
            Self::Profile => "profile",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static lifetime table: (data type x activity level) -> lifetime in ms
///
/// Lifetimes relax monotonically as the user goes idle; chat messages are the
/// most freshness-sensitive, tags the least.
#[must_use]
pub const fn lifetime_ms(data_type: DataType, level: ActivityLevel) -> i64 {
    use ActivityLevel::{Active, Background, Inactive};
    use DataType::{ChatMessages, Conversations, JournalEntries, MoodCheckIns, Profile, Tags};

    match (data_type, level) {
        (ChatMessages, Active) => MINUTE_MS,
        (ChatMessages, Inactive) => 5 * MINUTE_MS,
        (ChatMessages, Background) => 30 * MINUTE_MS,
        (Conversations, Active) => 2 * MINUTE_MS,
        (Conversations, Inactive) => 10 * MINUTE_MS,
        (Conversations, Background) | (JournalEntries, Background) => HOUR_MS,
        (JournalEntries | MoodCheckIns, Active) => 5 * MINUTE_MS,
        (JournalEntries, Inactive) => 15 * MINUTE_MS,
        (MoodCheckIns | Profile, Inactive) => 30 * MINUTE_MS,
        (MoodCheckIns | Profile, Background) => 2 * HOUR_MS,
        (Profile, Active) => 10 * MINUTE_MS,
        (Tags, Active) => 30 * MINUTE_MS,
        (Tags, Inactive) => HOUR_MS,
        (Tags, Background) => 4 * HOUR_MS,
    }
}

/// Classify an idle duration into an activity level
#[must_use]
pub const fn level_for_idle(idle_ms: i64) -> ActivityLevel {
    if idle_ms < 5 * MINUTE_MS {
        ActivityLevel::Active
    } else if idle_ms < 30 * MINUTE_MS {
        ActivityLevel::Inactive
    } else {
        ActivityLevel::Background
    }
}

/// Instance-scoped cache policy
///
/// Constructed once per process and torn down on logout. Bookkeeping (the
/// activity timestamp and pending refresh set) is guarded by its own locks,
/// independent of the sync gate.
pub struct CachePolicy {
    network: Arc<dyn NetworkMonitor>,
    last_activity_ms: Mutex<i64>,
    pending_refresh: Mutex<HashSet<DataType>>,
}

impl CachePolicy {
    /// Create a policy; construction counts as the first user interaction
    #[must_use]
    pub fn new(network: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            network,
            last_activity_ms: Mutex::new(now_ms()),
            pending_refresh: Mutex::new(HashSet::new()),
        }
    }

    /// Record a user-observable interaction
    pub fn mark_activity(&self) {
        *self
            .last_activity_ms
            .lock()
            .expect("activity lock poisoned") = now_ms();
    }

    /// Current activity level, derived from time since the last interaction
    pub fn activity_level(&self) -> ActivityLevel {
        let last = *self
            .last_activity_ms
            .lock()
            .expect("activity lock poisoned");
        level_for_idle(now_ms().saturating_sub(last))
    }

    /// Cache lifetime for the data type at the current activity level (ms)
    pub fn lifetime(&self, data_type: DataType) -> i64 {
        lifetime_ms(data_type, self.activity_level())
    }

    /// Whether cached data with this metadata must be treated as stale
    pub fn is_stale(&self, metadata: &CacheMetadata, data_type: DataType) -> bool {
        metadata.is_stale || metadata.age_ms(now_ms()) > self.lifetime(data_type)
    }

    /// Flag a user-requested refresh for the data type
    ///
    /// The flag survives until `should_invalidate` consumes it while online.
    pub fn request_refresh(&self, data_type: DataType) {
        self.pending_refresh
            .lock()
            .expect("refresh lock poisoned")
            .insert(data_type);
    }

    /// Whether the cached data for this type should be invalidated now
    ///
    /// Always false while offline: there is no point invalidating what cannot
    /// be refreshed.
    pub fn should_invalidate(&self, data_type: DataType, last_update_ms: i64) -> bool {
        if !self.network.is_available() {
            return false;
        }

        // Consumed even when high priority short-circuits below, so a
        // one-shot request never lingers in the pending set
        let refresh_requested = self
            .pending_refresh
            .lock()
            .expect("refresh lock poisoned")
            .remove(&data_type);

        if data_type.is_high_priority() {
            return true;
        }

        if refresh_requested {
            tracing::debug!(%data_type, "Invalidating cache on user-requested refresh");
            return true;
        }

        now_ms().saturating_sub(last_update_ms) > self.lifetime(data_type)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSource;
    use crate::net::ConnectivityMonitor;

    fn policy(online: bool) -> CachePolicy {
        CachePolicy::new(Arc::new(ConnectivityMonitor::new(online)))
    }

    #[test]
    fn test_lifetimes_relax_monotonically() {
        for data_type in DataType::ALL {
            let active = lifetime_ms(data_type, ActivityLevel::Active);
            let inactive = lifetime_ms(data_type, ActivityLevel::Inactive);
            let background = lifetime_ms(data_type, ActivityLevel::Background);
            assert!(active <= inactive, "{data_type}: active > inactive");
            assert!(inactive <= background, "{data_type}: inactive > background");
        }
    }

    #[test]
    fn test_lifetime_table_extremes() {
        assert_eq!(
            lifetime_ms(DataType::ChatMessages, ActivityLevel::Active),
            MINUTE_MS
        );
        assert_eq!(
            lifetime_ms(DataType::Tags, ActivityLevel::Background),
            4 * HOUR_MS
        );
    }

    #[test]
    fn test_level_for_idle_boundaries() {
        assert_eq!(level_for_idle(0), ActivityLevel::Active);
        assert_eq!(level_for_idle(5 * MINUTE_MS - 1), ActivityLevel::Active);
        assert_eq!(level_for_idle(5 * MINUTE_MS), ActivityLevel::Inactive);
        assert_eq!(level_for_idle(30 * MINUTE_MS - 1), ActivityLevel::Inactive);
        assert_eq!(level_for_idle(30 * MINUTE_MS), ActivityLevel::Background);
    }

    #[test]
    fn test_should_invalidate_false_offline() {
        let policy = policy(false);
        policy.request_refresh(DataType::Tags);

        // Even ancient high-priority data stays valid while offline
        for data_type in DataType::ALL {
            assert!(!policy.should_invalidate(data_type, 0));
        }
    }

    #[test]
    fn test_should_invalidate_high_priority_online() {
        let policy = policy(true);
        assert!(policy.should_invalidate(DataType::Profile, now_ms()));
        assert!(policy.should_invalidate(DataType::MoodCheckIns, now_ms()));
    }

    #[test]
    fn test_should_invalidate_age_exceeds_lifetime() {
        let policy = policy(true);
        let stale_update = now_ms() - 5 * HOUR_MS;
        assert!(policy.should_invalidate(DataType::Tags, stale_update));
        assert!(!policy.should_invalidate(DataType::Tags, now_ms()));
    }

    #[test]
    fn test_high_priority_check_consumes_pending_refresh() {
        let policy = policy(true);
        policy.request_refresh(DataType::Profile);

        assert!(policy.should_invalidate(DataType::Profile, now_ms()));
        let pending = policy.pending_refresh.lock().unwrap();
        assert!(!pending.contains(&DataType::Profile));
    }

    #[test]
    fn test_refresh_request_consumed_once() {
        let policy = policy(true);
        policy.request_refresh(DataType::Conversations);

        assert!(policy.should_invalidate(DataType::Conversations, now_ms()));
        // Second check: flag was consumed, fresh data stays valid
        assert!(!policy.should_invalidate(DataType::Conversations, now_ms()));
    }

    #[test]
    fn test_refresh_request_survives_offline_check() {
        let online = Arc::new(ConnectivityMonitor::new(false));
        let policy = CachePolicy::new(online.clone());
        policy.request_refresh(DataType::Conversations);

        assert!(!policy.should_invalidate(DataType::Conversations, now_ms()));

        online.set_available(true);
        assert!(policy.should_invalidate(DataType::Conversations, now_ms()));
    }

    #[test]
    fn test_is_stale_uses_metadata_age() {
        let policy = policy(true);
        let mut meta = CacheMetadata::fresh(DataSource::Cloud);
        assert!(!policy.is_stale(&meta, DataType::JournalEntries));

        meta.last_updated -= 2 * HOUR_MS;
        assert!(policy.is_stale(&meta, DataType::JournalEntries));

        let mut flagged = CacheMetadata::fresh(DataSource::Cloud);
        flagged.is_stale = true;
        assert!(policy.is_stale(&flagged, DataType::JournalEntries));
    }

    #[test]
    fn test_mark_activity_keeps_level_active() {
        let policy = policy(true);
        policy.mark_activity();
        assert_eq!(policy.activity_level(), ActivityLevel::Active);
    }
}
