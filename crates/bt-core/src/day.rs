//! Reporting-day boundaries.
//!
//! A reporting day does not start at midnight. It starts at a fixed hour in a
//! fixed reference timezone (01:00 `Europe/Paris` by default), so late-evening
//! activity still belongs to the day it started on.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::hours_between;
use crate::types::ValidationError;

/// Length of every reporting day, regardless of DST transitions.
pub const DAY_LENGTH: Duration = Duration::hours(24);

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether an interval is admitted by an overlap query on this range.
    ///
    /// True when the interval overlaps the range, or when either endpoint
    /// lies inside it. The endpoint clauses keep zero-length and inverted
    /// intervals visible.
    pub fn admits_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        (start < self.end && end > self.start) || self.contains(start) || self.contains(end)
    }

    /// Hours of `[start, end)` that fall inside this range, clamped at zero.
    pub fn clipped_hours(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        hours_between(start.max(self.start), end.min(self.end))
    }
}

/// Where reporting days start: an hour of day in a reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    timezone: Tz,
    hour: u32,
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Paris,
            hour: 1,
        }
    }
}

impl DayBoundary {
    pub fn new(timezone: Tz, hour: u32) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::DayStartHourOutOfRange { hour });
        }
        Ok(Self { timezone, hour })
    }

    /// Builds a boundary from an IANA timezone name such as `Europe/Paris`.
    pub fn from_name(timezone: &str, hour: u32) -> Result<Self, ValidationError> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| ValidationError::UnknownTimezone {
                name: timezone.to_string(),
            })?;
        Self::new(timezone, hour)
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub const fn hour(&self) -> u32 {
        self.hour
    }

    /// The instant the reporting day for `date` starts.
    ///
    /// An ambiguous local time (DST fall-back) resolves to the earlier
    /// instant. A local time inside a DST gap moves forward hour by hour to
    /// the first one that exists.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let mut local = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.hour));
        loop {
            match self.timezone.from_local_datetime(&local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    return dt.with_timezone(&Utc);
                }
                LocalResult::None => local += Duration::hours(1),
            }
        }
    }

    /// The `[start, start + 24h)` window of the reporting day for `date`.
    pub fn day_window(&self, date: NaiveDate) -> TimeRange {
        let start = self.day_start(date);
        TimeRange::new(start, start + DAY_LENGTH)
    }

    /// The reporting day an instant belongs to.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        let local = instant.with_timezone(&self.timezone).naive_local();
        let date = (local - Duration::hours(i64::from(self.hour))).date();
        // DST shifts can put the instant just outside the naive guess.
        if instant < self.day_start(date) {
            date.pred_opt().unwrap_or(date)
        } else if date
            .succ_opt()
            .is_some_and(|next| instant >= self.day_start(next))
        {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        }
    }
}
