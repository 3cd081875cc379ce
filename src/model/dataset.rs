use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::event::StoreEvent;
use super::tracker::{Tracker, TrackerId};

/// Current on-disk format version of data.json
pub const DATASET_VERSION: u32 = 1;

/// Everything the store persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub trackers: Vec<Tracker>,
}

fn default_version() -> u32 {
    DATASET_VERSION
}

impl Default for Dataset {
    fn default() -> Self {
        Dataset {
            version: DATASET_VERSION,
            categories: Vec::new(),
            trackers: Vec::new(),
        }
    }
}

impl Dataset {
    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.trackers.iter().find(|t| t.id == id)
    }

    pub fn tracker_mut(&mut self, id: TrackerId) -> Option<&mut Tracker> {
        self.trackers.iter_mut().find(|t| t.id == id)
    }

    pub fn category(&self, title: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.title == title)
    }

    /// Trackers belonging to the category with the given title
    pub fn trackers_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Tracker> + 'a {
        self.trackers.iter().filter(move |t| t.category == category)
    }

    /// Entity-level events that turn `previous` into `self`.
    ///
    /// Used when the data file is replaced underneath a running view (another
    /// process wrote it). Category renames cannot be told apart from a delete
    /// plus an insert here, so they are reported as such.
    pub fn changes_since(&self, previous: &Dataset) -> Vec<StoreEvent> {
        let mut events = Vec::new();

        for category in &self.categories {
            if previous.category(&category.title).is_none() {
                events.push(StoreEvent::CategoryInserted(category.title.clone()));
            }
        }
        for category in &previous.categories {
            if self.category(&category.title).is_none() {
                events.push(StoreEvent::CategoryDeleted(category.title.clone()));
            }
        }

        let old_by_id: HashMap<TrackerId, &Tracker> =
            previous.trackers.iter().map(|t| (t.id, t)).collect();

        for tracker in &self.trackers {
            let Some(old) = old_by_id.get(&tracker.id) else {
                events.push(StoreEvent::TrackerInserted(tracker.id));
                continue;
            };
            if *old == tracker {
                continue;
            }
            if old.pinned != tracker.pinned {
                events.push(StoreEvent::PinChanged(tracker.id));
            }
            if old.records != tracker.records {
                let event = if tracker.records.len() > old.records.len() {
                    StoreEvent::RecordInserted(tracker.id)
                } else if tracker.records.len() < old.records.len() {
                    StoreEvent::RecordDeleted(tracker.id)
                } else {
                    StoreEvent::TrackerUpdated(tracker.id)
                };
                events.push(event);
            }
            let fields_changed = old.title != tracker.title
                || old.color != tracker.color
                || old.emoji != tracker.emoji
                || old.category != tracker.category
                || old.schedule != tracker.schedule;
            if fields_changed {
                events.push(StoreEvent::TrackerUpdated(tracker.id));
            }
        }

        for old in &previous.trackers {
            if self.tracker(old.id).is_none() {
                events.push(StoreEvent::TrackerDeleted(old.id));
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::CompletionRecord;
    use crate::model::schedule::Weekday;
    use crate::model::tracker::TrackerDraft;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn tracker(title: &str, category: &str) -> Tracker {
        Tracker::from_draft(TrackerDraft {
            title: title.into(),
            color: "#000000".into(),
            emoji: "⭐".into(),
            category: category.into(),
            days: vec![Weekday::Monday],
        })
    }

    fn sample() -> Dataset {
        Dataset {
            categories: vec![Category::new("Health"), Category::new("Misc")],
            trackers: vec![tracker("Drink water", "Health"), tracker("Call mom", "Misc")],
            ..Default::default()
        }
    }

    #[test]
    fn no_changes_no_events() {
        let data = sample();
        assert!(data.changes_since(&data.clone()).is_empty());
    }

    #[test]
    fn detects_inserted_and_deleted_trackers() {
        let old = sample();
        let mut new = old.clone();
        let removed = new.trackers.remove(0).id;
        let added = tracker("Read", "Misc");
        let added_id = added.id;
        new.trackers.push(added);

        let events = new.changes_since(&old);
        assert_eq!(
            events,
            vec![
                StoreEvent::TrackerInserted(added_id),
                StoreEvent::TrackerDeleted(removed),
            ]
        );
    }

    #[test]
    fn detects_pin_record_and_field_changes() {
        let old = sample();
        let mut new = old.clone();
        let id = new.trackers[0].id;
        new.trackers[0].pinned = true;
        new.trackers[0]
            .records
            .push(CompletionRecord::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        new.trackers[0].title = "Drink more water".into();

        let events = new.changes_since(&old);
        assert_eq!(
            events,
            vec![
                StoreEvent::PinChanged(id),
                StoreEvent::RecordInserted(id),
                StoreEvent::TrackerUpdated(id),
            ]
        );
    }

    #[test]
    fn detects_record_removal() {
        let mut old = sample();
        old.trackers[1]
            .records
            .push(CompletionRecord::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        let mut new = old.clone();
        new.trackers[1].records.clear();
        let id = new.trackers[1].id;
        assert_eq!(new.changes_since(&old), vec![StoreEvent::RecordDeleted(id)]);
    }

    #[test]
    fn detects_category_changes() {
        let old = sample();
        let mut new = old.clone();
        new.categories.push(Category::new("Work"));
        new.categories.retain(|c| c.title != "Misc");
        new.trackers.retain(|t| t.category != "Misc");
        let removed = old.trackers[1].id;

        let events = new.changes_since(&old);
        assert_eq!(
            events,
            vec![
                StoreEvent::CategoryInserted("Work".into()),
                StoreEvent::CategoryDeleted("Misc".into()),
                StoreEvent::TrackerDeleted(removed),
            ]
        );
    }

    #[test]
    fn trackers_in_category() {
        let data = sample();
        let health: Vec<_> = data.trackers_in("Health").map(|t| t.title.as_str()).collect();
        assert_eq!(health, vec!["Drink water"]);
    }

    #[test]
    fn deserializes_minimal_document() {
        let data: Dataset = serde_json::from_str("{}").unwrap();
        assert_eq!(data, Dataset::default());
        assert_eq!(data.version, DATASET_VERSION);
    }
}
