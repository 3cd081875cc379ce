use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::filter::{Filter, FilterType};

pub const STATE_FILE: &str = ".state.json";

/// Per-directory view state (written to .state.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewState {
    /// Last filter the user picked
    #[serde(default)]
    pub filter: Option<Filter>,
}

/// Read .state.json. A missing or malformed file reads as no state.
pub fn read_view_state(dir: &Path) -> Option<ViewState> {
    let content = fs::read_to_string(dir.join(STATE_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_view_state(dir: &Path, state: &ViewState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(dir.join(STATE_FILE), content)
}

/// The filter to start from: the saved one, or all trackers for today.
///
/// A saved `Today` filter always follows the clock. Any other saved filter
/// keeps its date.
pub fn restore_filter(dir: &Path, today: NaiveDate) -> Filter {
    match read_view_state(dir).and_then(|s| s.filter) {
        Some(saved) => {
            debug!(date = %saved.date, kind = saved.kind.key(), "restored filter");
            Filter::new(saved.date, saved.kind, today)
        }
        None => Filter::for_today(today),
    }
}

pub fn save_filter(dir: &Path, filter: &Filter) -> Result<(), std::io::Error> {
    let mut state = read_view_state(dir).unwrap_or_default();
    state.filter = Some(*filter);
    write_view_state(dir, &state)
}

/// Forget the saved filter type. The date is kept; the type reverts to all.
pub fn reset_filter(dir: &Path, today: NaiveDate) -> Result<Filter, std::io::Error> {
    let mut state = read_view_state(dir).unwrap_or_default();
    let date = state.filter.map(|f| f.date).unwrap_or(today);
    let filter = Filter::new(date, FilterType::All, today);
    state.filter = Some(filter);
    write_view_state(dir, &state)?;
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn save_and_restore() {
        let dir = TempDir::new().unwrap();
        let today = d(2024, 5, 10);
        let filter = Filter::new(d(2024, 5, 1), FilterType::Completed, today);
        save_filter(dir.path(), &filter).unwrap();
        assert_eq!(restore_filter(dir.path(), today), filter);
    }

    #[test]
    fn missing_state_defaults_to_today() {
        let dir = TempDir::new().unwrap();
        let today = d(2024, 5, 10);
        assert_eq!(restore_filter(dir.path(), today), Filter::for_today(today));
    }

    #[test]
    fn malformed_state_reads_as_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json {{{").unwrap();
        assert!(read_view_state(dir.path()).is_none());
        assert_eq!(
            restore_filter(dir.path(), d(2024, 5, 10)),
            Filter::for_today(d(2024, 5, 10))
        );
    }

    #[test]
    fn saved_today_filter_follows_the_clock() {
        let dir = TempDir::new().unwrap();
        let saved = Filter::new(d(2024, 5, 1), FilterType::Today, d(2024, 5, 1));
        save_filter(dir.path(), &saved).unwrap();

        let restored = restore_filter(dir.path(), d(2024, 5, 2));
        assert_eq!(restored.date, d(2024, 5, 2));
        assert_eq!(restored.kind, FilterType::Today);
    }

    #[test]
    fn reset_keeps_date_and_clears_type() {
        let dir = TempDir::new().unwrap();
        let today = d(2024, 5, 10);
        save_filter(
            dir.path(),
            &Filter::new(d(2024, 5, 3), FilterType::NotCompleted, today),
        )
        .unwrap();
        let filter = reset_filter(dir.path(), today).unwrap();
        assert_eq!(filter.date, d(2024, 5, 3));
        assert_eq!(filter.kind, FilterType::All);
        assert_eq!(restore_filter(dir.path(), today), filter);
    }
}
