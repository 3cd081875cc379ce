use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::CompletionRecord;
use super::schedule::{Schedule, Weekday};

/// Unique tracker identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(pub Uuid);

impl TrackerId {
    pub fn new() -> Self {
        TrackerId(Uuid::new_v4())
    }

    /// First eight hex digits, used as the short display form
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A habit (recurring) or event (irregular) the user tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub title: String,
    /// `#RRGGBB`
    pub color: String,
    pub emoji: String,
    #[serde(default)]
    pub pinned: bool,
    /// Title of the owning category
    pub category: String,
    pub schedule: Schedule,
    #[serde(default)]
    pub records: Vec<CompletionRecord>,
}

impl Tracker {
    /// Build a new tracker from a draft, with a fresh id and schedule identity
    pub fn from_draft(draft: TrackerDraft) -> Self {
        Tracker {
            id: TrackerId::new(),
            title: draft.title,
            color: draft.color,
            emoji: draft.emoji,
            pinned: false,
            category: draft.category,
            schedule: Schedule::new(draft.days),
            records: Vec::new(),
        }
    }

    /// Whether any completion record falls on `date`
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.records.iter().any(|r| r.date == date)
    }

    /// Total number of completion records (duplicates counted each)
    pub fn completion_count(&self) -> usize {
        self.records.len()
    }
}

/// User-editable tracker fields, used for both creation and edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerDraft {
    pub title: String,
    pub color: String,
    pub emoji: String,
    pub category: String,
    /// Empty means irregular event
    pub days: Vec<Weekday>,
}

impl TrackerDraft {
    /// Draft pre-filled from an existing tracker, for partial edits
    pub fn from_tracker(tracker: &Tracker) -> Self {
        TrackerDraft {
            title: tracker.title.clone(),
            color: tracker.color.clone(),
            emoji: tracker.emoji.clone(),
            category: tracker.category.clone(),
            days: tracker.schedule.days.clone(),
        }
    }
}
