//! Daily and weekly report engines.
//!
//! The two engines count sleep differently on purpose:
//! - the daily report attributes the full, unclipped duration of a sleep to
//!   the day it started on ("which sleeps began today");
//! - the weekly report clips every sleep to each day it overlaps ("how many
//!   hours of sleep fell on each day").

mod daily;
mod weekly;

pub use daily::{DailyReport, daily_report};
pub use weekly::{DailySummary, WINDOW_DAYS, WeeklyReport, weekly_report};

use crate::day::TimeRange;
use crate::event::{DiaperEvent, EventKind, NursingEvent, SleepEvent};
use crate::store::{EventStore, RangeField, StoreError};
use crate::types::BabyId;

fn sleeps_overlapping<S: EventStore + ?Sized>(
    store: &S,
    baby: &BabyId,
    range: &TimeRange,
) -> Result<Vec<SleepEvent>, StoreError> {
    Ok(store
        .list_events_in_range(EventKind::Sleep, baby, range, RangeField::Overlap)?
        .into_iter()
        .filter_map(crate::event::Event::into_sleep)
        .collect())
}

fn diapers_in<S: EventStore + ?Sized>(
    store: &S,
    baby: &BabyId,
    range: &TimeRange,
) -> Result<Vec<DiaperEvent>, StoreError> {
    Ok(store
        .list_events_in_range(EventKind::Diaper, baby, range, RangeField::Time)?
        .into_iter()
        .filter_map(crate::event::Event::into_diaper)
        .collect())
}

fn nursings_in<S: EventStore + ?Sized>(
    store: &S,
    baby: &BabyId,
    range: &TimeRange,
) -> Result<Vec<NursingEvent>, StoreError> {
    Ok(store
        .list_events_in_range(EventKind::Nursing, baby, range, RangeField::Time)?
        .into_iter()
        .filter_map(crate::event::Event::into_nursing)
        .collect())
}
