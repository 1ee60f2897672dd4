use chrono::{DateTime, Duration, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;

use super::{diapers_in, nursings_in, sleeps_overlapping};
use crate::day::DayBoundary;
use crate::store::{EventStore, StoreError};
use crate::types::BabyId;

/// Number of reporting days a weekly report covers.
pub const WINDOW_DAYS: i64 = 7;

/// Per-day aggregate used as a row of the weekly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub day_start: DateTime<Utc>,
    pub total_hours_slept: f64,
    pub diaper_count: usize,
    pub nursing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub baby_id: BabyId,
    /// Start of the oldest day in the window.
    pub start_date: DateTime<Utc>,
    /// End (exclusive) of the newest day in the window.
    pub end_date: DateTime<Utc>,
    /// Newest first, without the window's last day.
    pub daily_summaries: Vec<DailySummary>,
    pub avg_sleep_hours: f64,
    pub avg_diapers_per_day: f64,
    pub avg_nursings_per_day: f64,
}

/// Builds the 7-day report ending at `end_date` (inclusive).
///
/// Each day is queried independently and in parallel. Any failing query fails
/// the whole report.
///
/// The newest day (normally today, still in progress) is computed but left
/// out of `daily_summaries`, which therefore always has six rows. Averages
/// skip `today` and, per metric, skip days with no activity of that kind.
pub fn weekly_report<S: EventStore + Sync + ?Sized>(
    store: &S,
    baby: &BabyId,
    end_date: NaiveDate,
    boundary: &DayBoundary,
    today: NaiveDate,
) -> Result<WeeklyReport, StoreError> {
    let dates: Vec<NaiveDate> = (0..WINDOW_DAYS)
        .rev()
        .map(|back| end_date - Duration::days(back))
        .collect();

    let mut summaries = dates
        .par_iter()
        .map(|&date| summarize_day(store, baby, date, boundary))
        .collect::<Result<Vec<_>, _>>()?;

    let start_date = boundary.day_window(dates[0]).start;
    let end_date_instant = boundary.day_window(end_date).end;

    let mut sleep = Average::default();
    let mut diapers = Average::default();
    let mut nursings = Average::default();
    for summary in summaries.iter().filter(|s| s.date != today) {
        sleep.add(summary.total_hours_slept);
        diapers.add(count_as_f64(summary.diaper_count));
        nursings.add(count_as_f64(summary.nursing_count));
    }

    summaries.pop();
    summaries.reverse();

    tracing::debug!(%baby, %end_date, %today, "weekly report computed");

    Ok(WeeklyReport {
        baby_id: baby.clone(),
        start_date,
        end_date: end_date_instant,
        daily_summaries: summaries,
        avg_sleep_hours: sleep.value(),
        avg_diapers_per_day: diapers.value(),
        avg_nursings_per_day: nursings.value(),
    })
}

fn summarize_day<S: EventStore + ?Sized>(
    store: &S,
    baby: &BabyId,
    date: NaiveDate,
    boundary: &DayBoundary,
) -> Result<DailySummary, StoreError> {
    let window = boundary.day_window(date);
    let total_hours_slept = sleeps_overlapping(store, baby, &window)?
        .iter()
        .map(|sleep| window.clipped_hours(sleep.start, sleep.end))
        .sum();
    let diaper_count = diapers_in(store, baby, &window)?.len();
    let nursing_count = nursings_in(store, baby, &window)?.len();

    Ok(DailySummary {
        date,
        day_start: window.start,
        total_hours_slept,
        diaper_count,
        nursing_count,
    })
}

/// Mean over the days that had any activity.
#[derive(Debug, Default)]
struct Average {
    total: f64,
    days: u32,
}

impl Average {
    fn add(&mut self, value: f64) {
        if value > 0.0 {
            self.total += value;
            self.days += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.days == 0 {
            0.0
        } else {
            self.total / f64::from(self.days)
        }
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "per-day event counts are tiny"
)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}
