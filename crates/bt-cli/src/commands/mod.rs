//! CLI subcommand implementations.
//!
//! Every command writes to a caller-supplied writer and runs against any
//! [`Store`], so tests can drive them over the in-memory store.

pub mod baby;
pub mod events;
pub mod log;
pub mod report;
pub mod user;

use anyhow::{Result, bail};
use bt_core::{AccessStore, EventStore, Tracker, User};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Everything a [`Tracker`] needs from its store.
pub trait Store: AccessStore + EventStore + Sync {}

impl<S: AccessStore + EventStore + Sync> Store for S {}

/// Resolves the user commands act as.
pub fn acting_user<S: Store>(tracker: &Tracker<S>, username: Option<&str>) -> Result<User> {
    let Some(username) = username else {
        bail!("no user selected: pass --user or set BT_USER");
    };
    Ok(tracker.find_user(username)?)
}

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are shown as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats fractional hours, rounded to the minute.
#[expect(
    clippy::cast_possible_truncation,
    reason = "report totals are at most a few hundred hours"
)]
pub fn format_hours(hours: f64) -> String {
    let minutes = (hours * 60.0).round() as i64;
    format_duration(minutes * 60_000)
}

/// Formats an instant as local wall-clock time in `tz`.
pub fn format_instant(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}
