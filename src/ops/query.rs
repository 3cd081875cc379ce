use std::cmp::Ordering;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::dataset::Dataset;
use crate::model::schedule::Weekday;
use crate::model::tracker::{Tracker, TrackerId};
use crate::ops::predicate::Condition;

/// Position of a row in the sectioned list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        IndexPath { section, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// The synthetic section of pinned trackers
    Pinned,
    /// A category section
    Category,
}

/// What a list row displays for a tracker, evaluated for the filter date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerView {
    pub id: TrackerId,
    pub title: String,
    pub color: String,
    pub emoji: String,
    pub pinned: bool,
    pub category: String,
    pub days: Vec<Weekday>,
    /// A completion record exists on the filter date
    pub completed: bool,
    /// All completion records
    pub completion_count: usize,
    /// The filter date is in the future, so completion cannot be toggled
    pub disabled: bool,
}

impl TrackerView {
    pub fn new(tracker: &Tracker, date: NaiveDate, today: NaiveDate) -> Self {
        TrackerView {
            id: tracker.id,
            title: tracker.title.clone(),
            color: tracker.color.clone(),
            emoji: tracker.emoji.clone(),
            pinned: tracker.pinned,
            category: tracker.category.clone(),
            days: tracker.schedule.days.clone(),
            completed: tracker.is_completed_on(date),
            completion_count: tracker.completion_count(),
            disabled: date > today,
        }
    }
}

/// A titled group of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub kind: SectionKind,
    pub items: Vec<TrackerView>,
}

impl Section {
    /// Identity of the section across executions
    pub fn key(&self) -> (SectionKind, &str) {
        (self.kind, self.title.as_str())
    }
}

/// The pair of conditions that make up one list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Rows grouped into category sections
    pub main: Condition,
    /// Rows of the synthetic pinned section; `None` disables the section
    pub pinned: Option<Condition>,
    pub pinned_title: String,
}

/// Category title, then tracker title, then id (for a total order)
fn collation(a: &Tracker, b: &Tracker) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

/// All trackers matching `condition`, in list order
pub fn select<'a>(dataset: &'a Dataset, condition: &Condition) -> Vec<&'a Tracker> {
    let mut matched: Vec<&Tracker> = dataset
        .trackers
        .iter()
        .filter(|t| condition.matches(t))
        .collect();
    matched.sort_by(|a, b| collation(a, b));
    matched
}

/// Run a plan against the dataset.
///
/// The pinned section (when the plan has one and it is non-empty) comes
/// first; category sections follow in ascending title order. Rows within a
/// section are ordered by title. Empty categories produce no section.
pub fn execute(
    dataset: &Dataset,
    plan: &QueryPlan,
    date: NaiveDate,
    today: NaiveDate,
) -> Vec<Section> {
    let mut sections = Vec::new();

    if let Some(pinned) = &plan.pinned {
        let items: Vec<TrackerView> = select(dataset, pinned)
            .into_iter()
            .map(|t| TrackerView::new(t, date, today))
            .collect();
        if !items.is_empty() {
            sections.push(Section {
                title: plan.pinned_title.clone(),
                kind: SectionKind::Pinned,
                items,
            });
        }
    }

    let mut groups: IndexMap<&str, Vec<TrackerView>> = IndexMap::new();
    for tracker in select(dataset, &plan.main) {
        groups
            .entry(tracker.category.as_str())
            .or_default()
            .push(TrackerView::new(tracker, date, today));
    }
    sections.extend(groups.into_iter().map(|(title, items)| Section {
        title: title.to_string(),
        kind: SectionKind::Category,
        items,
    }));

    sections
}

/// Every position at which a tracker appears (a pinned tracker may appear twice)
pub fn positions_of(sections: &[Section], id: TrackerId) -> Vec<IndexPath> {
    let mut found = Vec::new();
    for (s, section) in sections.iter().enumerate() {
        for (r, item) in section.items.iter().enumerate() {
            if item.id == id {
                found.push(IndexPath::new(s, r));
            }
        }
    }
    found
}
