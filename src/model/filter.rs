use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which trackers the list shows for the reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Everything scheduled on the date (plus irregular events)
    All,
    /// Same as `All`, pinned to the current date
    Today,
    /// Trackers with a completion record on the date
    Completed,
    /// Trackers without a completion record on the date
    NotCompleted,
}

impl FilterType {
    pub const ALL: [FilterType; 4] = [
        FilterType::All,
        FilterType::Today,
        FilterType::Completed,
        FilterType::NotCompleted,
    ];

    /// The command-line spelling
    pub fn key(self) -> &'static str {
        match self {
            FilterType::All => "all",
            FilterType::Today => "today",
            FilterType::Completed => "completed",
            FilterType::NotCompleted => "not-completed",
        }
    }

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            FilterType::All => "All trackers",
            FilterType::Today => "Trackers for today",
            FilterType::Completed => "Completed",
            FilterType::NotCompleted => "Not completed",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterType::All),
            "today" => Ok(FilterType::Today),
            "completed" | "done" => Ok(FilterType::Completed),
            "not-completed" | "notcompleted" | "not_completed" | "pending" => {
                Ok(FilterType::NotCompleted)
            }
            other => Err(format!(
                "unknown filter type: {} (expected all, today, completed, not-completed)",
                other
            )),
        }
    }
}

/// The active view state: reference date plus completion type.
///
/// Invariants, maintained by the constructors and setters:
/// - type `Today` always carries the current date;
/// - moving the date away from the current date while `Today` is selected
///   falls back to `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: FilterType,
}

impl Filter {
    /// Build a filter, forcing the date to `today` when `kind` is `Today`
    pub fn new(date: NaiveDate, kind: FilterType, today: NaiveDate) -> Self {
        let mut filter = Filter {
            date,
            kind: FilterType::All,
        };
        filter.set_kind(kind, today);
        filter
    }

    /// The default view: all trackers for the current date
    pub fn for_today(today: NaiveDate) -> Self {
        Filter {
            date: today,
            kind: FilterType::All,
        }
    }

    pub fn set_kind(&mut self, kind: FilterType, today: NaiveDate) {
        if kind == FilterType::Today {
            self.date = today;
        }
        self.kind = kind;
    }

    pub fn set_date(&mut self, date: NaiveDate, today: NaiveDate) {
        if self.kind == FilterType::Today && date != today {
            self.kind = FilterType::All;
        }
        self.date = date;
    }
}
