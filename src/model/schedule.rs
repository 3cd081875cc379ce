use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical day-of-week identifier.
///
/// Serialized as the lower-case English day name. This is an internal key and
/// never depends on the display locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days, Monday first
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// The weekday a calendar date falls on
    pub fn of(date: NaiveDate) -> Weekday {
        Weekday::from(date.weekday())
    }

    /// The canonical key (`"monday"`, `"tuesday"`, ...)
    pub fn key(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Three-letter abbreviation used in listings
    pub fn short(self) -> &'static str {
        &self.key()[..3]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Accepts the full canonical name or any prefix of at least three letters,
    /// case-insensitively (`mon`, `Monday`, `WED`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        if needle.len() >= 3
            && let Some(day) = Weekday::ALL.iter().find(|d| d.key().starts_with(&needle))
        {
            return Ok(*day);
        }
        Err(format!("unknown weekday: {}", s.trim()))
    }
}

/// Identity of a persisted schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub Uuid);

impl ScheduleId {
    pub fn new() -> Self {
        ScheduleId(Uuid::new_v4())
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

/// The recurrence rule of a tracker.
///
/// An empty day list marks an irregular (one-off) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl Schedule {
    /// A recurring schedule. Days are de-duplicated and kept Monday-first.
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut schedule = Schedule {
            id: ScheduleId::new(),
            days: Vec::new(),
        };
        schedule.set_days(days);
        schedule
    }

    /// A schedule with no days (irregular event)
    pub fn irregular() -> Self {
        Schedule {
            id: ScheduleId::new(),
            days: Vec::new(),
        }
    }

    pub fn is_irregular(&self) -> bool {
        self.days.is_empty()
    }

    /// Replace the day list, keeping the schedule's identity
    pub fn set_days(&mut self, days: impl IntoIterator<Item = Weekday>) {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort();
        days.dedup();
        self.days = days;
    }
}

/// Short human description of a normalized day list, e.g. `"mon, wed, fri"`
pub fn describe_days(days: &[Weekday]) -> String {
    if days.is_empty() {
        "irregular".to_string()
    } else if days.len() == Weekday::ALL.len() {
        "every day".to_string()
    } else {
        days.iter().map(|d| d.short()).collect::<Vec<_>>().join(", ")
    }
}

/// Parse a comma-separated day list (`"mon,wed,fri"`).
/// `daily` expands to all seven days; an empty string is an empty list.
pub fn parse_days(s: &str) -> Result<Vec<Weekday>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    if s.eq_ignore_ascii_case("daily") {
        return Ok(Weekday::ALL.to_vec());
    }
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
