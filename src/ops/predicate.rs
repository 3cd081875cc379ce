use chrono::NaiveDate;

use crate::model::filter::{Filter, FilterType};
use crate::model::schedule::Weekday;
use crate::model::tracker::Tracker;
use crate::util::text::{contains_folded, fold};

/// A query condition over trackers.
///
/// Conditions are plain data: they compare, print and evaluate, and building
/// one cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Matches everything
    Always,
    /// Schedule has no days
    Irregular,
    /// Schedule contains the given day
    ScheduledOn(Weekday),
    /// Some completion record is on the given date
    CompletedOn(NaiveDate),
    /// No completion records at all
    NoRecords,
    /// Pinned flag equals the value
    Pinned(bool),
    /// Title contains the (already folded) text, ignoring case and diacritics
    TitleContains(String),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    /// Evaluate against one tracker
    pub fn matches(&self, tracker: &Tracker) -> bool {
        match self {
            Condition::Always => true,
            Condition::Irregular => tracker.schedule.is_irregular(),
            Condition::ScheduledOn(day) => tracker.schedule.days.contains(day),
            Condition::CompletedOn(date) => tracker.is_completed_on(*date),
            Condition::NoRecords => tracker.records.is_empty(),
            Condition::Pinned(flag) => tracker.pinned == *flag,
            Condition::TitleContains(needle) => contains_folded(&tracker.title, needle),
            Condition::Not(inner) => !inner.matches(tracker),
            Condition::And(parts) => parts.iter().all(|c| c.matches(tracker)),
            Condition::Or(parts) => parts.iter().any(|c| c.matches(tracker)),
        }
    }

    /// Conjunction, flattening nested `And`s and dropping `Always`
    pub fn and(self, other: Condition) -> Condition {
        let mut parts = Vec::new();
        for c in [self, other] {
            match c {
                Condition::Always => {}
                Condition::And(inner) => parts.extend(inner),
                c => parts.push(c),
            }
        }
        match parts.len() {
            0 => Condition::Always,
            1 => parts.remove(0),
            _ => Condition::And(parts),
        }
    }
}

/// The completion-type part of a filter.
///
/// - `Completed`: a record on the reference date.
/// - `NotCompleted`: no records, or none on the reference date.
/// - `All` / `Today`: irregular, or scheduled on the date's weekday.
pub fn type_condition(filter: &Filter) -> Condition {
    match filter.kind {
        FilterType::Completed => Condition::CompletedOn(filter.date),
        FilterType::NotCompleted => Condition::Or(vec![
            Condition::NoRecords,
            Condition::Not(Box::new(Condition::CompletedOn(filter.date))),
        ]),
        FilterType::All | FilterType::Today => Condition::Or(vec![
            Condition::Irregular,
            Condition::ScheduledOn(Weekday::of(filter.date)),
        ]),
    }
}

/// Title search condition. Blank text means no condition.
pub fn search_condition(text: &str) -> Option<Condition> {
    let needle = fold(text.trim());
    if needle.is_empty() {
        None
    } else {
        Some(Condition::TitleContains(needle))
    }
}

/// Combine the type condition with the optional pinned and search parts
pub fn build(filter: &Filter, search: Option<&str>, pinned: Option<bool>) -> Condition {
    let mut condition = type_condition(filter);
    if let Some(flag) = pinned {
        condition = condition.and(Condition::Pinned(flag));
    }
    if let Some(search) = search.and_then(search_condition) {
        condition = condition.and(search);
    }
    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::CompletionRecord;
    use crate::model::schedule::Schedule;
    use crate::model::tracker::TrackerDraft;
    use crate::ops::schedule_match::is_active;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // 2024-01-01 is a Monday
    const MONDAY: (i32, u32, u32) = (2024, 1, 1);
    const TUESDAY: (i32, u32, u32) = (2024, 1, 2);

    fn tracker(title: &str, days: &[Weekday]) -> Tracker {
        Tracker::from_draft(TrackerDraft {
            title: title.into(),
            color: "#000000".into(),
            emoji: "⭐".into(),
            category: "Health".into(),
            days: days.to_vec(),
        })
    }

    fn filter(date: (i32, u32, u32), kind: FilterType) -> Filter {
        let date = d(date.0, date.1, date.2);
        Filter { date, kind }
    }

    #[test]
    fn drink_water_on_monday_not_tuesday() {
        let t = tracker(
            "Drink water",
            &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        );
        assert!(build(&filter(MONDAY, FilterType::All), None, None).matches(&t));
        assert!(!build(&filter(TUESDAY, FilterType::All), None, None).matches(&t));
    }

    #[test]
    fn all_condition_agrees_with_schedule_matcher() {
        let schedules = [
            Schedule::irregular(),
            Schedule::new([Weekday::Monday]),
            Schedule::new([Weekday::Saturday, Weekday::Sunday]),
        ];
        for schedule in schedules {
            let mut t = tracker("x", &[]);
            t.schedule = schedule;
            for date in d(2024, 1, 1).iter_days().take(7) {
                let f = Filter {
                    date,
                    kind: FilterType::All,
                };
                assert_eq!(type_condition(&f).matches(&t), is_active(&t.schedule, date));
            }
        }
    }

    #[test]
    fn completed_means_record_on_date() {
        let mut t = tracker("Run", &[Weekday::Monday]);
        let f = filter(MONDAY, FilterType::Completed);
        assert!(!type_condition(&f).matches(&t));
        t.records.push(CompletionRecord::new(d(2024, 1, 2)));
        assert!(!type_condition(&f).matches(&t));
        t.records.push(CompletionRecord::new(d(2024, 1, 1)));
        assert!(type_condition(&f).matches(&t));
    }

    #[test]
    fn completed_ignores_schedule() {
        // Completed on a day it is not scheduled for still counts
        let mut t = tracker("Run", &[Weekday::Friday]);
        t.records.push(CompletionRecord::new(d(2024, 1, 1)));
        assert!(type_condition(&filter(MONDAY, FilterType::Completed)).matches(&t));
    }

    #[test]
    fn completed_and_not_completed_are_exclusive() {
        let mut with_records = tracker("a", &[]);
        with_records.records.push(CompletionRecord::new(d(2024, 1, 1)));
        with_records.records.push(CompletionRecord::new(d(2024, 1, 3)));
        let trackers = [tracker("b", &[Weekday::Monday]), with_records];

        for t in &trackers {
            for date in d(2024, 1, 1).iter_days().take(5) {
                let done = type_condition(&Filter {
                    date,
                    kind: FilterType::Completed,
                })
                .matches(t);
                let not_done = type_condition(&Filter {
                    date,
                    kind: FilterType::NotCompleted,
                })
                .matches(t);
                assert!(done ^ not_done, "{} on {}", t.title, date);
                assert_eq!(done, t.records.iter().any(|r| r.date == date));
            }
        }
    }

    #[test]
    fn pinned_flag_is_compared() {
        let mut t = tracker("Meditate", &[]);
        let f = filter(MONDAY, FilterType::All);
        assert!(build(&f, None, Some(false)).matches(&t));
        assert!(!build(&f, None, Some(true)).matches(&t));
        t.pinned = true;
        assert!(build(&f, None, Some(true)).matches(&t));
        assert!(build(&f, None, None).matches(&t));
    }

    #[test]
    fn search_is_case_and_diacritic_insensitive() {
        let f = filter(MONDAY, FilterType::All);
        let water = tracker("Пить воду", &[]);
        let run = tracker("Бегать", &[]);
        let cafe = tracker("Café visit", &[]);
        let c = build(&f, Some("вод"), None);
        assert!(c.matches(&water));
        assert!(!c.matches(&run));
        assert!(build(&f, Some("CAFE"), None).matches(&cafe));
    }

    #[test]
    fn blank_search_adds_nothing() {
        let f = filter(MONDAY, FilterType::Completed);
        assert_eq!(build(&f, Some("   "), None), type_condition(&f));
        assert_eq!(build(&f, None, None), type_condition(&f));
    }

    #[test]
    fn build_flattens_conjunction() {
        let f = filter(MONDAY, FilterType::Completed);
        let c = build(&f, Some("Run"), Some(false));
        assert_eq!(
            c,
            Condition::And(vec![
                Condition::CompletedOn(d(2024, 1, 1)),
                Condition::Pinned(false),
                Condition::TitleContains("run".into()),
            ])
        );
    }

    #[test]
    fn and_with_always_is_identity() {
        assert_eq!(
            Condition::Always.and(Condition::Pinned(true)),
            Condition::Pinned(true)
        );
        assert_eq!(Condition::Always.and(Condition::Always), Condition::Always);
    }
}
