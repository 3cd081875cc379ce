use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::io::data_io::{self, DataError};
use crate::io::lock::{DataLock, LockError};
use crate::model::category::{Category, normalize_title};
use crate::model::dataset::Dataset;
use crate::model::event::StoreEvent;
use crate::model::record::CompletionRecord;
use crate::model::tracker::{Tracker, TrackerDraft, TrackerId};
use crate::ops::predicate::Condition;
use crate::ops::query;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tracker not found: {0}")]
    TrackerNotFound(String),
    #[error("ambiguous tracker id {prefix}: matches {count} trackers")]
    AmbiguousId { prefix: String, count: usize },
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("category already exists: {0}")]
    CategoryExists(String),
    #[error("category {title} still has {count} tracker(s)")]
    CategoryInUse { title: String, count: usize },
    #[error("invalid title {0:?}: must be 1-38 characters")]
    InvalidTitle(String),
    #[error("invalid color {0:?}: expected #RRGGBB")]
    InvalidColor(String),
    #[error("emoji must not be empty")]
    InvalidEmoji,
    #[error("cannot record completion on a future date: {0}")]
    FutureDate(NaiveDate),
    #[error("{0}")]
    Data(#[from] DataError),
    #[error("{0}")]
    Lock(#[from] LockError),
}

/// Owner of the dataset and the only writer of it.
///
/// Every mutation is applied to a copy, saved atomically under the data
/// lock, and only then swapped in, after which subscribers receive one
/// event per changed entity. A failed save leaves memory untouched.
pub struct TrackerStore {
    dir: Option<PathBuf>,
    dataset: Dataset,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl TrackerStore {
    /// Open the store backed by `dir/data.json`
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let dataset = data_io::load_dataset(dir)?;
        Ok(TrackerStore {
            dir: Some(dir.to_path_buf()),
            dataset,
            subscribers: Vec::new(),
        })
    }

    /// A store that never touches disk
    pub fn in_memory(dataset: Dataset) -> Self {
        TrackerStore {
            dir: None,
            dataset,
            subscribers: Vec::new(),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn categories(&self) -> &[Category] {
        &self.dataset.categories
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn find(&self, id: TrackerId) -> Option<&Tracker> {
        self.dataset.tracker(id)
    }

    /// Trackers matching `condition`, in list order
    pub fn find_by(&self, condition: &Condition) -> Vec<&Tracker> {
        query::select(&self.dataset, condition)
    }

    /// Resolve a full id or a unique prefix of its hex digits
    pub fn resolve_id(&self, prefix: &str) -> Result<TrackerId, StoreError> {
        let wanted: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        if wanted.is_empty() {
            return Err(StoreError::TrackerNotFound(prefix.to_string()));
        }
        let matches: Vec<TrackerId> = self
            .dataset
            .trackers
            .iter()
            .filter(|t| t.id.0.simple().to_string().starts_with(&wanted))
            .map(|t| t.id)
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(StoreError::TrackerNotFound(prefix.to_string())),
            _ => Err(StoreError::AmbiguousId {
                prefix: prefix.to_string(),
                count: matches.len(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub fn add_category(&mut self, title: &str) -> Result<String, StoreError> {
        let title = normalize_title(title).ok_or_else(|| StoreError::InvalidTitle(title.to_string()))?;
        self.mutate(|data| {
            if data.category(&title).is_some() {
                return Err(StoreError::CategoryExists(title.clone()));
            }
            data.categories.push(Category::new(title.clone()));
            Ok(vec![StoreEvent::CategoryInserted(title.clone())])
        })?;
        Ok(title)
    }

    /// Rename a category, moving its trackers along
    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<String, StoreError> {
        let to = normalize_title(to).ok_or_else(|| StoreError::InvalidTitle(to.to_string()))?;
        self.mutate(|data| {
            if data.category(from).is_none() {
                return Err(StoreError::CategoryNotFound(from.to_string()));
            }
            if from == to {
                return Ok(Vec::new());
            }
            if data.category(&to).is_some() {
                return Err(StoreError::CategoryExists(to.clone()));
            }
            for category in data.categories.iter_mut().filter(|c| c.title == from) {
                category.title = to.clone();
            }
            for tracker in data.trackers.iter_mut().filter(|t| t.category == from) {
                tracker.category = to.clone();
            }
            Ok(vec![StoreEvent::CategoryRenamed {
                from: from.to_string(),
                to: to.clone(),
            }])
        })?;
        Ok(to)
    }

    /// Delete an empty category
    pub fn delete_category(&mut self, title: &str) -> Result<(), StoreError> {
        self.mutate(|data| {
            if data.category(title).is_none() {
                return Err(StoreError::CategoryNotFound(title.to_string()));
            }
            let count = data.trackers_in(title).count();
            if count > 0 {
                return Err(StoreError::CategoryInUse {
                    title: title.to_string(),
                    count,
                });
            }
            data.categories.retain(|c| c.title != title);
            Ok(vec![StoreEvent::CategoryDeleted(title.to_string())])
        })
    }

    // -----------------------------------------------------------------------
    // Trackers
    // -----------------------------------------------------------------------

    pub fn add_tracker(&mut self, draft: TrackerDraft) -> Result<TrackerId, StoreError> {
        let draft = validate_draft(draft)?;
        let tracker = Tracker::from_draft(draft);
        let id = tracker.id;
        self.mutate(move |data| {
            require_category(data, &tracker.category)?;
            data.trackers.push(tracker);
            Ok(vec![StoreEvent::TrackerInserted(id)])
        })?;
        Ok(id)
    }

    /// Replace the editable fields. Records, pin state and schedule identity
    /// are kept.
    pub fn update_tracker(&mut self, id: TrackerId, draft: TrackerDraft) -> Result<(), StoreError> {
        let draft = validate_draft(draft)?;
        self.mutate(|data| {
            require_category(data, &draft.category)?;
            let tracker = find_mut(data, id)?;
            if TrackerDraft::from_tracker(tracker) == draft {
                return Ok(Vec::new());
            }
            tracker.title = draft.title.clone();
            tracker.color = draft.color.clone();
            tracker.emoji = draft.emoji.clone();
            tracker.category = draft.category.clone();
            tracker.schedule.set_days(draft.days.iter().copied());
            Ok(vec![StoreEvent::TrackerUpdated(id)])
        })
    }

    pub fn delete_tracker(&mut self, id: TrackerId) -> Result<Tracker, StoreError> {
        let mut removed = None;
        self.mutate(|data| {
            let pos = data
                .trackers
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| StoreError::TrackerNotFound(id.to_string()))?;
            removed = Some(data.trackers.remove(pos));
            Ok(vec![StoreEvent::TrackerDeleted(id)])
        })?;
        removed.ok_or_else(|| StoreError::TrackerNotFound(id.to_string()))
    }

    /// Set the pin flag. Setting the current value is a no-op.
    pub fn set_pinned(&mut self, id: TrackerId, pinned: bool) -> Result<(), StoreError> {
        self.mutate(|data| {
            let tracker = find_mut(data, id)?;
            if tracker.pinned == pinned {
                return Ok(Vec::new());
            }
            tracker.pinned = pinned;
            Ok(vec![StoreEvent::PinChanged(id)])
        })
    }

    /// Flip the pin flag, returning the new value
    pub fn toggle_pinned(&mut self, id: TrackerId) -> Result<bool, StoreError> {
        let pinned = !self
            .find(id)
            .ok_or_else(|| StoreError::TrackerNotFound(id.to_string()))?
            .pinned;
        self.set_pinned(id, pinned)?;
        Ok(pinned)
    }

    /// Append a completion record. Duplicates on the same date are allowed.
    pub fn add_record(&mut self, id: TrackerId, date: NaiveDate) -> Result<(), StoreError> {
        self.mutate(|data| {
            find_mut(data, id)?.records.push(CompletionRecord::new(date));
            Ok(vec![StoreEvent::RecordInserted(id)])
        })
    }

    /// Remove every record on `date`. Returns whether any existed.
    pub fn remove_record(&mut self, id: TrackerId, date: NaiveDate) -> Result<bool, StoreError> {
        let mut removed = false;
        self.mutate(|data| {
            let tracker = find_mut(data, id)?;
            let before = tracker.records.len();
            tracker.records.retain(|r| r.date != date);
            removed = tracker.records.len() < before;
            Ok(if removed {
                vec![StoreEvent::RecordDeleted(id)]
            } else {
                Vec::new()
            })
        })?;
        Ok(removed)
    }

    /// Mark or unmark completion on `date`, returning the new state.
    /// Dates after `today` are refused.
    pub fn toggle_completion(
        &mut self,
        id: TrackerId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        if date > today {
            return Err(StoreError::FutureDate(date));
        }
        let tracker = self
            .find(id)
            .ok_or_else(|| StoreError::TrackerNotFound(id.to_string()))?;
        if tracker.is_completed_on(date) {
            self.remove_record(id, date)?;
            Ok(false)
        } else {
            self.add_record(id, date)?;
            Ok(true)
        }
    }

    /// Re-read the data file after another process wrote it, emitting events
    /// for whatever differs. Returns the number of events.
    pub fn reload(&mut self) -> Result<usize, StoreError> {
        let Some(dir) = self.dir.clone() else {
            return Ok(0);
        };
        let fresh = data_io::load_dataset(&dir)?;
        let events = fresh.changes_since(&self.dataset);
        self.dataset = fresh;
        let count = events.len();
        if count > 0 {
            info!(events = count, "data file changed on disk");
        }
        self.emit(events);
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Apply `change` to a copy of the latest data, persist it, then publish.
    ///
    /// For a disk-backed store the copy starts from the file as read under
    /// the lock, so writes by other processes are never lost; differences
    /// found that way are published before the events of `change`.
    fn mutate<F>(&mut self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Dataset) -> Result<Vec<StoreEvent>, StoreError>,
    {
        let Some(dir) = self.dir.clone() else {
            let mut next = self.dataset.clone();
            let events = change(&mut next)?;
            if !events.is_empty() {
                self.dataset = next;
                self.emit(events);
            }
            return Ok(());
        };

        let _lock = DataLock::acquire_default(&dir)?;
        let base = data_io::load_dataset(&dir)?;
        let mut events = base.changes_since(&self.dataset);
        let mut next = base.clone();
        let own = change(&mut next)?;
        if !own.is_empty() {
            data_io::save_dataset(&dir, &next)?;
        }
        debug!(external = events.len(), own = own.len(), "committed change");
        events.extend(own);
        self.dataset = next;
        self.emit(events);
        Ok(())
    }

    fn emit(&mut self, events: Vec<StoreEvent>) {
        if events.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| {
            events.iter().all(|event| tx.send(event.clone()).is_ok())
        });
    }
}

fn find_mut(data: &mut Dataset, id: TrackerId) -> Result<&mut Tracker, StoreError> {
    data.tracker_mut(id)
        .ok_or_else(|| StoreError::TrackerNotFound(id.to_string()))
}

fn require_category(data: &Dataset, title: &str) -> Result<(), StoreError> {
    match data.category(title) {
        Some(_) => Ok(()),
        None => Err(StoreError::CategoryNotFound(title.to_string())),
    }
}

/// `#RRGGBB`, either case
fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize and check the user-editable fields
fn validate_draft(mut draft: TrackerDraft) -> Result<TrackerDraft, StoreError> {
    draft.title =
        normalize_title(&draft.title).ok_or_else(|| StoreError::InvalidTitle(draft.title.clone()))?;
    draft.color = draft.color.trim().to_ascii_uppercase();
    if !is_hex_color(&draft.color) {
        return Err(StoreError::InvalidColor(draft.color));
    }
    draft.emoji = draft.emoji.trim().to_string();
    if draft.emoji.is_empty() {
        return Err(StoreError::InvalidEmoji);
    }
    draft.days.sort();
    draft.days.dedup();
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::Weekday;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn draft(title: &str, category: &str) -> TrackerDraft {
        TrackerDraft {
            title: title.into(),
            color: "#33ccff".into(),
            emoji: "💧".into(),
            category: category.into(),
            days: vec![Weekday::Friday, Weekday::Monday, Weekday::Monday],
        }
    }

    fn store_with_health() -> TrackerStore {
        let mut store = TrackerStore::in_memory(Dataset::default());
        store.add_category("Health").unwrap();
        store
    }

    fn drain(rx: &Receiver<StoreEvent>) -> Vec<StoreEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn add_tracker_normalizes_and_emits() {
        let mut store = store_with_health();
        let rx = store.subscribe();
        let id = store.add_tracker(draft("  Drink water ", "Health")).unwrap();

        let t = store.find(id).unwrap();
        assert_eq!(t.title, "Drink water");
        assert_eq!(t.color, "#33CCFF");
        assert_eq!(t.schedule.days, vec![Weekday::Monday, Weekday::Friday]);
        assert_eq!(drain(&rx), vec![StoreEvent::TrackerInserted(id)]);
    }

    #[test]
    fn add_tracker_validates() {
        let mut store = store_with_health();
        assert!(matches!(
            store.add_tracker(draft("", "Health")),
            Err(StoreError::InvalidTitle(_))
        ));
        assert!(matches!(
            store.add_tracker(draft(&"x".repeat(39), "Health")),
            Err(StoreError::InvalidTitle(_))
        ));
        assert!(matches!(
            store.add_tracker(draft("Run", "Sport")),
            Err(StoreError::CategoryNotFound(_))
        ));
        let mut bad = draft("Run", "Health");
        bad.color = "blue".into();
        assert!(matches!(store.add_tracker(bad), Err(StoreError::InvalidColor(_))));
        let mut bad = draft("Run", "Health");
        bad.emoji = " ".into();
        assert!(matches!(store.add_tracker(bad), Err(StoreError::InvalidEmoji)));
        assert!(store.dataset().trackers.is_empty());
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#33cf69"));
        assert!(is_hex_color("#33CF69"));
        assert!(!is_hex_color("33CF699"));
        assert!(!is_hex_color("#33CF6"));
        assert!(!is_hex_color("#33CG69"));
        assert!(!is_hex_color("#é3CF6"));
    }

    #[test]
    fn category_lifecycle() {
        let mut store = store_with_health();
        let rx = store.subscribe();
        assert!(matches!(
            store.add_category("Health"),
            Err(StoreError::CategoryExists(_))
        ));
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        assert!(matches!(
            store.delete_category("Health"),
            Err(StoreError::CategoryInUse { count: 1, .. })
        ));

        store.rename_category("Health", "Sport").unwrap();
        assert_eq!(store.find(id).unwrap().category, "Sport");
        assert!(store.dataset().category("Health").is_none());

        store.delete_tracker(id).unwrap();
        store.delete_category("Sport").unwrap();
        assert!(store.categories().is_empty());
        assert_eq!(
            drain(&rx),
            vec![
                StoreEvent::TrackerInserted(id),
                StoreEvent::CategoryRenamed {
                    from: "Health".into(),
                    to: "Sport".into()
                },
                StoreEvent::TrackerDeleted(id),
                StoreEvent::CategoryDeleted("Sport".into()),
            ]
        );
    }

    #[test]
    fn toggle_completion_flips_and_rejects_future() {
        let mut store = store_with_health();
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        let rx = store.subscribe();
        let today = d(2024, 1, 3);

        assert!(store.toggle_completion(id, d(2024, 1, 1), today).unwrap());
        assert!(store.find(id).unwrap().is_completed_on(d(2024, 1, 1)));
        assert!(!store.toggle_completion(id, d(2024, 1, 1), today).unwrap());
        assert_eq!(store.find(id).unwrap().completion_count(), 0);
        assert!(matches!(
            store.toggle_completion(id, d(2024, 1, 4), today),
            Err(StoreError::FutureDate(_))
        ));
        assert_eq!(
            drain(&rx),
            vec![StoreEvent::RecordInserted(id), StoreEvent::RecordDeleted(id)]
        );
    }

    #[test]
    fn duplicate_records_are_counted_and_removed_together() {
        let mut store = store_with_health();
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        store.add_record(id, d(2024, 1, 1)).unwrap();
        store.add_record(id, d(2024, 1, 1)).unwrap();
        assert_eq!(store.find(id).unwrap().completion_count(), 2);
        assert!(store.remove_record(id, d(2024, 1, 1)).unwrap());
        assert_eq!(store.find(id).unwrap().completion_count(), 0);
        assert!(!store.remove_record(id, d(2024, 1, 1)).unwrap());
    }

    #[test]
    fn no_op_changes_emit_nothing() {
        let mut store = store_with_health();
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        let rx = store.subscribe();
        store.set_pinned(id, false).unwrap();
        let same = TrackerDraft::from_tracker(store.find(id).unwrap());
        store.update_tracker(id, same).unwrap();
        assert!(drain(&rx).is_empty());

        assert!(store.toggle_pinned(id).unwrap());
        assert_eq!(drain(&rx), vec![StoreEvent::PinChanged(id)]);
    }

    #[test]
    fn update_keeps_records_and_schedule_identity() {
        let mut store = store_with_health();
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        store.add_record(id, d(2024, 1, 1)).unwrap();
        let schedule_id = store.find(id).unwrap().schedule.id;

        let mut edit = TrackerDraft::from_tracker(store.find(id).unwrap());
        edit.title = "Jog".into();
        edit.days.clear();
        store.update_tracker(id, edit).unwrap();

        let t = store.find(id).unwrap();
        assert_eq!(t.title, "Jog");
        assert!(t.schedule.is_irregular());
        assert_eq!(t.schedule.id, schedule_id);
        assert_eq!(t.completion_count(), 1);
    }

    #[test]
    fn resolve_by_prefix() {
        let mut store = store_with_health();
        let id = store.add_tracker(draft("Run", "Health")).unwrap();
        assert_eq!(store.resolve_id(&id.short()).unwrap(), id);
        assert_eq!(store.resolve_id(&id.to_string().to_uppercase()).unwrap(), id);
        assert!(matches!(
            store.resolve_id("zzzz"),
            Err(StoreError::TrackerNotFound(_))
        ));
        assert!(matches!(store.resolve_id(""), Err(StoreError::TrackerNotFound(_))));
    }

    #[test]
    fn ambiguous_prefix() {
        let mut store = store_with_health();
        for title in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q"] {
            store.add_tracker(draft(title, "Health")).unwrap();
        }
        // 17 ids over 16 possible leading digits: at least one digit repeats
        let ambiguous = (0..16)
            .map(|n| format!("{:x}", n))
            .find(|p| store.resolve_id(p).is_err_and(|e| matches!(e, StoreError::AmbiguousId { .. })));
        assert!(ambiguous.is_some());
    }

    #[test]
    fn disk_store_persists_and_picks_up_external_writes() {
        let tmp = TempDir::new().unwrap();
        let dir = data_io::init_dir(tmp.path(), false).unwrap();

        let mut first = TrackerStore::open(&dir).unwrap();
        first.add_category("Health").unwrap();
        let id = first.add_tracker(draft("Run", "Health")).unwrap();

        let mut second = TrackerStore::open(&dir).unwrap();
        assert_eq!(second.find(id).unwrap().title, "Run");
        second.set_pinned(id, true).unwrap();

        // `first` is stale; its next write starts from the file
        let rx = first.subscribe();
        first.add_record(id, d(2024, 1, 1)).unwrap();
        let t = first.find(id).unwrap();
        assert!(t.pinned);
        assert_eq!(t.completion_count(), 1);
        assert_eq!(
            drain(&rx),
            vec![StoreEvent::PinChanged(id), StoreEvent::RecordInserted(id)]
        );

        let reopened = TrackerStore::open(&dir).unwrap();
        assert_eq!(reopened.dataset(), first.dataset());
    }

    #[test]
    fn failed_validation_leaves_disk_untouched() {
        let tmp = TempDir::new().unwrap();
        let dir = data_io::init_dir(tmp.path(), false).unwrap();
        let mut store = TrackerStore::open(&dir).unwrap();
        assert!(store.add_tracker(draft("Run", "Nowhere")).is_err());
        assert_eq!(data_io::load_dataset(&dir).unwrap(), Dataset::default());
    }

    #[test]
    fn reload_reports_external_changes() {
        let tmp = TempDir::new().unwrap();
        let dir = data_io::init_dir(tmp.path(), false).unwrap();
        let mut watcher_side = TrackerStore::open(&dir).unwrap();
        let rx = watcher_side.subscribe();

        let mut writer = TrackerStore::open(&dir).unwrap();
        writer.add_category("Health").unwrap();
        let id = writer.add_tracker(draft("Run", "Health")).unwrap();

        assert_eq!(watcher_side.reload().unwrap(), 2);
        assert_eq!(
            drain(&rx),
            vec![
                StoreEvent::CategoryInserted("Health".into()),
                StoreEvent::TrackerInserted(id),
            ]
        );
        assert_eq!(watcher_side.reload().unwrap(), 0);
    }

    #[test]
    fn find_by_condition() {
        let mut store = store_with_health();
        let a = store.add_tracker(draft("Run", "Health")).unwrap();
        store.add_tracker(draft("Swim", "Health")).unwrap();
        store.set_pinned(a, true).unwrap();
        let found: Vec<_> = store
            .find_by(&Condition::Pinned(true))
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(found, vec![a]);
    }
}
