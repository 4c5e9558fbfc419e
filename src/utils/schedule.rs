use chrono::{Datelike, NaiveDate};

use crate::models::Schedule;

/// A date on which a class meets, with its start time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySlot {
    pub date: NaiveDate,
    pub time: String,
}

/// Every date in `[start, end]` whose weekday has a scheduled time
pub fn activity_slots(start: NaiveDate, end: NaiveDate, schedule: &Schedule) -> Vec<ActivitySlot> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter_map(|date| {
            schedule.time_for(date.weekday()).map(|time| ActivitySlot {
                date,
                time: time.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_slots_follow_weekday_schedule() {
        // 2024-09-02 is a Monday
        let schedule = Schedule {
            day1: Some("10:00".into()),
            day3: Some("14:00".into()),
            ..Default::default()
        };
        let slots = activity_slots(date(2024, 9, 2), date(2024, 9, 15), &schedule);

        let dates: Vec<_> = slots.iter().map(|s| s.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 9, 2), date(2024, 9, 4), date(2024, 9, 9), date(2024, 9, 11)]
        );
        assert_eq!(slots[1].time, "14:00");
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        // 2024-09-08 is a Sunday
        let schedule = Schedule {
            day7: Some("09:00".into()),
            ..Default::default()
        };
        let slots = activity_slots(date(2024, 9, 8), date(2024, 9, 8), &schedule);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].date, date(2024, 9, 8));
    }

    #[test]
    fn test_empty_schedule_or_inverted_range_yields_nothing() {
        let schedule = Schedule {
            day1: Some("10:00".into()),
            ..Default::default()
        };
        assert!(activity_slots(date(2024, 9, 2), date(2024, 9, 30), &Schedule::default()).is_empty());
        assert!(activity_slots(date(2024, 9, 9), date(2024, 9, 2), &schedule).is_empty());
    }
}
