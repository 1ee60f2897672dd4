use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::{diapers_in, nursings_in, sleeps_overlapping};
use crate::day::DayBoundary;
use crate::event::{DiaperEvent, NursingEvent, SleepEvent};
use crate::store::{EventStore, StoreError};
use crate::types::BabyId;

/// One reporting day of events for one baby.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub baby_id: BabyId,
    pub date: NaiveDate,
    /// The day boundary instant the report starts at.
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub diapers: Vec<DiaperEvent>,
    pub nursings: Vec<NursingEvent>,
    pub sleeps: Vec<SleepEvent>,
    pub total_hours_slept: f64,
}

/// Builds the report for `date`.
///
/// Diapers and nursings are those whose instant falls in the day. Sleeps are
/// every interval touching the day, ordered by start. The total counts the
/// full length of each listed sleep that *starts* in the day, so a sleep
/// crossing a boundary is counted exactly once, on its first day.
pub fn daily_report<S: EventStore + ?Sized>(
    store: &S,
    baby: &BabyId,
    date: NaiveDate,
    boundary: &DayBoundary,
) -> Result<DailyReport, StoreError> {
    let window = boundary.day_window(date);

    let diapers = diapers_in(store, baby, &window)?;
    let nursings = nursings_in(store, baby, &window)?;
    let sleeps = sleeps_overlapping(store, baby, &window)?;

    let total_hours_slept = sleeps
        .iter()
        .filter(|sleep| window.contains(sleep.start))
        .map(SleepEvent::hours)
        .sum();

    tracing::debug!(
        %baby,
        %date,
        diapers = diapers.len(),
        nursings = nursings.len(),
        sleeps = sleeps.len(),
        "daily report computed"
    );

    Ok(DailyReport {
        baby_id: baby.clone(),
        date,
        day_start: window.start,
        day_end: window.end,
        diapers,
        nursings,
        sleeps,
        total_hours_slept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::{
        add_diaper, add_nursing, add_sleep, assert_hours, date, family, utc,
    };

    #[test]
    fn counts_events_inside_the_reporting_day() {
        let (store, _, baby) = family();
        add_diaper(&store, &baby, "d1", utc(2024, 3, 10, 5, 0));
        add_diaper(&store, &baby, "d2", utc(2024, 3, 10, 8, 0));
        add_nursing(&store, &baby, "n1", utc(2024, 3, 10, 6, 0));

        let report =
            daily_report(&store, &baby, date(2024, 3, 10), &DayBoundary::default()).unwrap();

        assert_eq!(report.day_start, utc(2024, 3, 10, 0, 0));
        assert_eq!(report.diapers.len(), 2);
        assert_eq!(report.nursings.len(), 1);
        assert!(report.sleeps.is_empty());
        assert_hours(report.total_hours_slept, 0.0);
    }

    #[test]
    fn boundary_is_offset_from_midnight() {
        let (store, _, baby) = family();
        // 00:30 Paris on Mar 10: still Mar 9.
        add_diaper(&store, &baby, "late", utc(2024, 3, 9, 23, 30));
        // 01:00 Paris on Mar 10: first instant of Mar 10.
        add_diaper(&store, &baby, "edge", utc(2024, 3, 10, 0, 0));

        let boundary = DayBoundary::default();
        let mar9 = daily_report(&store, &baby, date(2024, 3, 9), &boundary).unwrap();
        let mar10 = daily_report(&store, &baby, date(2024, 3, 10), &boundary).unwrap();

        assert_eq!(mar9.diapers.len(), 1);
        assert_eq!(mar9.diapers[0].id.as_str(), "late");
        assert_eq!(mar10.diapers.len(), 1);
        assert_eq!(mar10.diapers[0].id.as_str(), "edge");
    }

    #[test]
    fn events_are_ordered_by_time() {
        let (store, _, baby) = family();
        add_diaper(&store, &baby, "b", utc(2024, 3, 10, 9, 0));
        add_diaper(&store, &baby, "a", utc(2024, 3, 10, 4, 0));
        add_sleep(&store, &baby, "s2", utc(2024, 3, 10, 13, 0), utc(2024, 3, 10, 14, 0));
        add_sleep(&store, &baby, "s1", utc(2024, 3, 10, 2, 0), utc(2024, 3, 10, 3, 0));

        let report =
            daily_report(&store, &baby, date(2024, 3, 10), &DayBoundary::default()).unwrap();

        let diapers: Vec<_> = report.diapers.iter().map(|d| d.id.as_str()).collect();
        let sleeps: Vec<_> = report.sleeps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(diapers, ["a", "b"]);
        assert_eq!(sleeps, ["s1", "s2"]);
        assert_hours(report.total_hours_slept, 2.0);
    }

    #[test]
    fn cross_midnight_sleep_counts_fully_on_its_start_day_only() {
        let (store, _, baby) = family();
        add_sleep(&store, &baby, "night", utc(2024, 1, 1, 23, 0), utc(2024, 1, 2, 3, 0));
        let boundary = DayBoundary::default();

        let jan1 = daily_report(&store, &baby, date(2024, 1, 1), &boundary).unwrap();
        let jan2 = daily_report(&store, &baby, date(2024, 1, 2), &boundary).unwrap();

        assert_hours(jan1.total_hours_slept, 4.0);
        assert_hours(jan2.total_hours_slept, 0.0);
        // Still listed on the second day, since it overlaps it.
        assert_eq!(jan2.sleeps.len(), 1);
    }

    #[test]
    fn inverted_sleep_contributes_zero() {
        let (store, _, baby) = family();
        add_sleep(&store, &baby, "bad", utc(2024, 3, 10, 10, 0), utc(2024, 3, 10, 8, 0));
        add_sleep(&store, &baby, "good", utc(2024, 3, 10, 12, 0), utc(2024, 3, 10, 13, 30));

        let report =
            daily_report(&store, &baby, date(2024, 3, 10), &DayBoundary::default()).unwrap();

        assert_eq!(report.sleeps.len(), 2);
        assert_hours(report.total_hours_slept, 1.5);
    }

    #[test]
    fn other_babies_are_not_included() {
        let (store, _, baby) = family();
        let other = BabyId::new("other").unwrap();
        add_diaper(&store, &other, "x", utc(2024, 3, 10, 5, 0));

        let report =
            daily_report(&store, &baby, date(2024, 3, 10), &DayBoundary::default()).unwrap();
        assert!(report.diapers.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let (store, _, baby) = family();
        add_sleep(&store, &baby, "s", utc(2024, 3, 10, 1, 0), utc(2024, 3, 10, 2, 0));

        let report =
            daily_report(&store, &baby, date(2024, 3, 10), &DayBoundary::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["date"], "2024-03-10");
        assert_eq!(json["dayStart"], "2024-03-10T00:00:00Z");
        assert_eq!(json["totalHoursSlept"], 1.0);
        assert_eq!(json["sleeps"][0]["start"], "2024-03-10T01:00:00Z");
        assert_eq!(json["sleeps"][0]["babyId"], "ada");
    }
}
