//! Mood check-in model

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::CheckInId;

/// Mood category recorded with a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Great,
    Good,
    Okay,
    Low,
    Struggling,
}

impl MoodLabel {
    /// Stable lowercase name, matching the serde representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Low => "low",
            Self::Struggling => "struggling",
        }
    }

    /// Parse from the stable lowercase name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "great" => Some(Self::Great),
            "good" => Some(Self::Good),
            "okay" => Some(Self::Okay),
            "low" => Some(Self::Low),
            "struggling" => Some(Self::Struggling),
            _ => None,
        }
    }
}

/// A daily mood check-in
///
/// At most one check-in exists per user per calendar day, enforced by the
/// derived `date_key` uniqueness constraint in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCheckIn {
    /// Unique identifier
    pub id: CheckInId,
    /// Owning user identifier
    pub user_id: String,
    /// Recorded mood category
    pub mood: MoodLabel,
    /// Free-form tags attached to this check-in
    pub tags: Vec<String>,
    /// Check-in time (Unix ms)
    pub timestamp: i64,
    /// Optional free-text notes
    pub notes: Option<String>,
    /// UTC calendar day of `timestamp`, formatted `YYYY-MM-DD`
    pub date_key: String,
}

impl MoodCheckIn {
    /// Create a new check-in for the given user, timestamped now
    #[must_use]
    pub fn new(user_id: impl Into<String>, mood: MoodLabel) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: CheckInId::new(),
            user_id: user_id.into(),
            mood,
            tags: Vec::new(),
            timestamp: now,
            notes: None,
            date_key: date_key(now),
        }
    }

    /// Attach tags, replacing any existing list
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Derive the UTC calendar-day key for a Unix-ms timestamp
#[must_use]
pub fn date_key(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(String::new, |dt| dt.format("%Y-%m-%d").to_string())
}
