use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::dataset::Dataset;

/// Totals over the whole dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub trackers: usize,
    pub categories: usize,
    /// Distinct trackers with at least one completion record
    pub completed_trackers: usize,
    /// All completion records, duplicates included
    pub total_completions: usize,
    /// Distinct dates with at least one completion
    pub active_days: usize,
    pub first_completion: Option<NaiveDate>,
    pub last_completion: Option<NaiveDate>,
}

pub fn compute(dataset: &Dataset) -> Statistics {
    let dates: BTreeSet<NaiveDate> = dataset
        .trackers
        .iter()
        .flat_map(|t| t.records.iter().map(|r| r.date))
        .collect();

    Statistics {
        trackers: dataset.trackers.len(),
        categories: dataset.categories.len(),
        completed_trackers: dataset
            .trackers
            .iter()
            .filter(|t| !t.records.is_empty())
            .count(),
        total_completions: dataset.trackers.iter().map(|t| t.records.len()).sum(),
        active_days: dates.len(),
        first_completion: dates.first().copied(),
        last_completion: dates.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::model::record::CompletionRecord;
    use crate::model::tracker::{Tracker, TrackerDraft};
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn tracker(title: &str, dates: &[u32]) -> Tracker {
        let mut t = Tracker::from_draft(TrackerDraft {
            title: title.into(),
            color: "#000000".into(),
            emoji: "⭐".into(),
            category: "Health".into(),
            days: Vec::new(),
        });
        t.records = dates.iter().map(|day| CompletionRecord::new(d(*day))).collect();
        t
    }

    #[test]
    fn empty_dataset() {
        assert_eq!(compute(&Dataset::default()), Statistics::default());
    }

    #[test]
    fn counts_distinct_trackers_and_days() {
        let data = Dataset {
            categories: vec![Category::new("Health")],
            trackers: vec![
                tracker("Run", &[1, 1, 3]),
                tracker("Swim", &[3]),
                tracker("Yoga", &[]),
            ],
            ..Default::default()
        };
        assert_eq!(
            compute(&data),
            Statistics {
                trackers: 3,
                categories: 1,
                completed_trackers: 2,
                total_completions: 4,
                active_days: 2,
                first_completion: Some(d(1)),
                last_completion: Some(d(3)),
            }
        );
    }
}
