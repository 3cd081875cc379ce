use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::model::tracker::TrackerId;
use crate::ops::query::{IndexPath, Section, SectionKind, positions_of};

/// Row and section changes between two executions of the same query.
///
/// Deleted rows and sections use positions in the previous list; inserted
/// ones use positions in the new list. Updated rows use previous positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub inserted: BTreeSet<IndexPath>,
    pub deleted: BTreeSet<IndexPath>,
    pub updated: BTreeSet<IndexPath>,
    pub inserted_sections: BTreeSet<usize>,
    pub deleted_sections: BTreeSet<usize>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.deleted.is_empty()
            && self.updated.is_empty()
            && self.inserted_sections.is_empty()
            && self.deleted_sections.is_empty()
    }

    /// Fold a later diff into this one.
    ///
    /// Sets are unioned. Positions are only reconciled across the two
    /// diffs, never within one: a row or section inserted here and deleted
    /// by `later` cancels out of both, and a row deleted here that `later`
    /// inserts at the same position becomes an update.
    pub fn merge(&mut self, mut later: Diff) {
        cancel(&mut self.inserted, &mut later.deleted);
        cancel(&mut self.inserted_sections, &mut later.deleted_sections);

        let replaced: Vec<IndexPath> = self
            .deleted
            .intersection(&later.inserted)
            .copied()
            .collect();
        for path in replaced {
            self.deleted.remove(&path);
            later.inserted.remove(&path);
            self.updated.insert(path);
        }

        self.inserted.extend(later.inserted);
        self.deleted.extend(later.deleted);
        self.updated.extend(later.updated);
        self.inserted_sections.extend(later.inserted_sections);
        self.deleted_sections.extend(later.deleted_sections);
    }
}

/// Drop the positions present in both sets from both
fn cancel<T: Ord + Copy>(inserted: &mut BTreeSet<T>, deleted: &mut BTreeSet<T>) {
    let both: Vec<T> = inserted.intersection(deleted).copied().collect();
    for item in both {
        inserted.remove(&item);
        deleted.remove(&item);
    }
}

/// Compute the diff caused by changes to the `affected` trackers.
///
/// Sections are matched by kind and title. Each affected tracker's old and
/// new positions are compared by (section, row): a position present in both
/// is an update, otherwise a delete and/or insert. Row changes inside a
/// section that is itself inserted or deleted are left to the section change.
pub fn diff_sections(old: &[Section], new: &[Section], affected: &HashSet<TrackerId>) -> Diff {
    let old_keys: HashMap<(SectionKind, &str), usize> =
        old.iter().enumerate().map(|(i, s)| (s.key(), i)).collect();
    let new_keys: HashMap<(SectionKind, &str), usize> =
        new.iter().enumerate().map(|(i, s)| (s.key(), i)).collect();

    let mut diff = Diff::default();
    for (i, section) in old.iter().enumerate() {
        if !new_keys.contains_key(&section.key()) {
            diff.deleted_sections.insert(i);
        }
    }
    for (i, section) in new.iter().enumerate() {
        if !old_keys.contains_key(&section.key()) {
            diff.inserted_sections.insert(i);
        }
    }

    for id in affected {
        let before: Vec<(IndexPath, (SectionKind, &str))> = positions_of(old, *id)
            .into_iter()
            .map(|p| (p, old[p.section].key()))
            .collect();
        let after: Vec<(IndexPath, (SectionKind, &str))> = positions_of(new, *id)
            .into_iter()
            .map(|p| (p, new[p.section].key()))
            .collect();

        for (path, key) in &before {
            let stayed = after
                .iter()
                .any(|(p, k)| k == key && p.row == path.row);
            if stayed {
                diff.updated.insert(*path);
            } else if !diff.deleted_sections.contains(&path.section) {
                diff.deleted.insert(*path);
            }
        }
        for (path, key) in &after {
            let existed = before
                .iter()
                .any(|(p, k)| k == key && p.row == path.row);
            if !existed && !diff.inserted_sections.contains(&path.section) {
                diff.inserted.insert(*path);
            }
        }
    }

    diff
}

/// What subscribers receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "diff", rename_all = "lowercase")]
pub enum Notification {
    /// Apply these changes to the list you last pulled
    Diff(Diff),
    /// Discard what you have and pull the full section list again
    Reload,
}

#[derive(Debug)]
enum Pending {
    Diff(Diff),
    Reload,
}

/// Holds at most one pending batch and delivers it to subscribers on flush
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Sender<Notification>>,
    pending: Option<Pending>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Add a diff to the pending batch. A pending reload absorbs it.
    pub fn record(&mut self, diff: Diff) {
        if diff.is_empty() {
            return;
        }
        match &mut self.pending {
            Some(Pending::Reload) => {}
            Some(Pending::Diff(pending)) => pending.merge(diff),
            None => self.pending = Some(Pending::Diff(diff)),
        }
    }

    /// Replace whatever is pending with a reload
    pub fn request_reload(&mut self) {
        self.pending = Some(Pending::Reload);
    }

    pub fn has_pending(&self) -> bool {
        match &self.pending {
            Some(Pending::Diff(diff)) => !diff.is_empty(),
            Some(Pending::Reload) => true,
            None => false,
        }
    }

    /// Deliver the pending batch. Returns what was delivered, if anything.
    /// Subscribers whose receiver is gone are dropped.
    pub fn flush(&mut self) -> Option<Notification> {
        let notification = match self.pending.take()? {
            Pending::Reload => Notification::Reload,
            Pending::Diff(diff) if diff.is_empty() => return None,
            Pending::Diff(diff) => Notification::Diff(diff),
        };
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
        Some(notification)
    }
}
