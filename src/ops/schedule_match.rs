use chrono::NaiveDate;

use crate::model::schedule::{Schedule, Weekday};

/// Whether a tracker with this schedule is eligible on `date`.
///
/// Irregular events (no days) are eligible on every date; their completion
/// state decides what is shown. Recurring habits are eligible on their days.
pub fn is_active(schedule: &Schedule, date: NaiveDate) -> bool {
    schedule.is_irregular() || schedule.days.contains(&Weekday::of(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2024-01-01 is a Monday; the following six days cover the week.
    fn week() -> impl Iterator<Item = NaiveDate> {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        monday.iter_days().take(7)
    }

    #[test]
    fn recurring_matches_exactly_its_days() {
        let schedule = Schedule::new([Weekday::Monday, Weekday::Wednesday, Weekday::Friday]);
        for date in week() {
            assert_eq!(
                is_active(&schedule, date),
                schedule.days.contains(&Weekday::of(date)),
                "mismatch on {}",
                date
            );
        }
    }

    #[test]
    fn irregular_matches_every_day() {
        let schedule = Schedule::irregular();
        assert!(week().all(|date| is_active(&schedule, date)));
    }

    #[test]
    fn single_day_schedule() {
        let schedule = Schedule::new([Weekday::Sunday]);
        let active: Vec<_> = week().filter(|d| is_active(&schedule, *d)).collect();
        assert_eq!(active, vec![NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()]);
    }
}
