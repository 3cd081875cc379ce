use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::filter::{Filter, FilterType};
use crate::model::schedule::{Weekday, describe_days};
use crate::ops::notifier::{Diff, Notification};
use crate::ops::query::{IndexPath, Section, SectionKind, TrackerView};
use crate::ops::stats::Statistics;
use crate::util::unicode::{display_width, fit_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TrackerJson {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub emoji: String,
    pub color: String,
    pub category: String,
    pub pinned: bool,
    pub days: Vec<Weekday>,
    pub schedule: String,
    pub completed: bool,
    pub completion_count: usize,
    pub disabled: bool,
}

#[derive(Serialize)]
pub struct SectionJson {
    pub title: String,
    pub kind: SectionKind,
    pub trackers: Vec<TrackerJson>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: FilterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Whether anything is scheduled on the date at all
    pub has_trackers_on_date: bool,
    pub sections: Vec<SectionJson>,
}

#[derive(Serialize)]
pub struct CategoryJson {
    pub title: String,
    pub trackers: usize,
}

#[derive(Serialize)]
pub struct ToggleJson {
    pub id: String,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Serialize)]
pub struct ConfigValueJson {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn tracker_to_json(view: &TrackerView) -> TrackerJson {
    TrackerJson {
        id: view.id.to_string(),
        short_id: view.id.short(),
        title: view.title.clone(),
        emoji: view.emoji.clone(),
        color: view.color.clone(),
        category: view.category.clone(),
        pinned: view.pinned,
        days: view.days.clone(),
        schedule: describe_days(&view.days),
        completed: view.completed,
        completion_count: view.completion_count,
        disabled: view.disabled,
    }
}

pub fn section_to_json(section: &Section) -> SectionJson {
    SectionJson {
        title: section.title.clone(),
        kind: section.kind,
        trackers: section.items.iter().map(tracker_to_json).collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn checkbox(view: &TrackerView) -> &'static str {
    if view.disabled {
        "[-]"
    } else if view.completed {
        "[x]"
    } else {
        "[ ]"
    }
}

fn days_word(count: usize) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", count)
    }
}

/// `[x] 1a2b3c4d 💧 Drink water  mon, wed · 3 days`
pub fn format_tracker_line(view: &TrackerView, title_width: usize) -> String {
    format!(
        "{} {} {} {}  {} · {}",
        checkbox(view),
        view.id.short(),
        view.emoji,
        fit_to_width(&view.title, title_width),
        describe_days(&view.days),
        days_word(view.completion_count)
    )
}

/// Header line naming the day and the filter type
pub fn format_list_header(filter: &Filter, date_format: &str) -> String {
    format!(
        "{} {} · {}",
        Weekday::of(filter.date).short(),
        filter.date.format(date_format),
        filter.kind.label()
    )
}

/// All sections, titles aligned across the whole list
pub fn format_sections(sections: &[Section]) -> Vec<String> {
    if sections.is_empty() {
        return vec!["nothing to show".to_string()];
    }
    let title_width = sections
        .iter()
        .flat_map(|s| s.items.iter())
        .map(|v| display_width(&v.title))
        .max()
        .unwrap_or(0);

    let mut lines = Vec::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("== {} ==", section.title));
        for view in &section.items {
            lines.push(format_tracker_line(view, title_width));
        }
    }
    lines
}

pub fn format_tracker_detail(view: &TrackerView, date: NaiveDate, date_format: &str) -> Vec<String> {
    let state = if view.disabled {
        "not yet (future date)"
    } else if view.completed {
        "done"
    } else {
        "not done"
    };
    let mut lines = vec![
        format!("{} {}", view.emoji, view.title),
        format!("id: {}", view.id),
        format!("category: {}", view.category),
        format!("schedule: {}", describe_days(&view.days)),
        format!("color: {}", view.color),
    ];
    if view.pinned {
        lines.push("pinned: yes".to_string());
    }
    lines.push(format!("completed: {}", days_word(view.completion_count)));
    lines.push(format!("on {}: {}", date.format(date_format), state));
    lines
}

fn paths(set: &BTreeSet<IndexPath>) -> String {
    set.iter()
        .map(|p| format!("{}.{}", p.section, p.row))
        .collect::<Vec<_>>()
        .join(" ")
}

fn indexes(set: &BTreeSet<usize>) -> String {
    set.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}

/// One line per non-empty part of a notification
pub fn format_notification(notification: &Notification) -> Vec<String> {
    let diff: &Diff = match notification {
        Notification::Reload => return vec!["reload".to_string()],
        Notification::Diff(diff) => diff,
    };
    let mut lines = Vec::new();
    if !diff.deleted_sections.is_empty() {
        lines.push(format!("- sections {}", indexes(&diff.deleted_sections)));
    }
    if !diff.inserted_sections.is_empty() {
        lines.push(format!("+ sections {}", indexes(&diff.inserted_sections)));
    }
    if !diff.deleted.is_empty() {
        lines.push(format!("- rows {}", paths(&diff.deleted)));
    }
    if !diff.inserted.is_empty() {
        lines.push(format!("+ rows {}", paths(&diff.inserted)));
    }
    if !diff.updated.is_empty() {
        lines.push(format!("~ rows {}", paths(&diff.updated)));
    }
    lines
}

pub fn format_stats(stats: &Statistics, date_format: &str) -> Vec<String> {
    let mut lines = vec![
        format!("trackers: {}", stats.trackers),
        format!("categories: {}", stats.categories),
        format!("trackers completed: {}", stats.completed_trackers),
        format!("completions: {}", stats.total_completions),
        format!("active days: {}", stats.active_days),
    ];
    if let (Some(first), Some(last)) = (stats.first_completion, stats.last_completion) {
        lines.push(format!(
            "range: {} .. {}",
            first.format(date_format),
            last.format(date_format)
        ));
    }
    lines
}
