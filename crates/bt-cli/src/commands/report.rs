//! Report command for daily and weekly summaries.
//!
//! This module implements `bt report day` and `bt report week`, addressed
//! either by baby ID (as a parent) or by share token (read-only), with
//! human-readable or JSON output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use bt_core::report::WINDOW_DAYS;
use bt_core::{BabyId, DailyReport, DayBoundary, Tracker, WeeklyReport, parse_date};
use chrono::Duration;
use clap::Args;

use super::{Store, acting_user, format_duration, format_hours, format_instant};

/// Which baby a report is for.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Baby ID (requires being one of its parents).
    #[arg(long)]
    pub baby: Option<String>,
    /// Share token granting read-only access.
    #[arg(long)]
    pub share_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct DayArgs {
    #[command(flatten)]
    pub target: Target,
    /// Reporting day (YYYY-MM-DD). Defaults to the day in progress.
    #[arg(long)]
    pub date: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WeekArgs {
    #[command(flatten)]
    pub target: Target,
    /// Last day of the week (YYYY-MM-DD). Defaults to the day in progress.
    #[arg(long)]
    pub end_date: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn day<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    username: Option<&str>,
    args: &DayArgs,
) -> Result<()> {
    let date = args.date.as_deref().map(parse_date).transpose()?;
    let (name, report) = match (&args.target.baby, &args.target.share_token) {
        (Some(baby), _) => {
            let user = acting_user(tracker, username)?;
            let baby = BabyId::new(baby.as_str())?;
            let report = tracker.daily_report(&user.id, &baby, date)?;
            (tracker.baby(&user.id, &baby)?.name, report)
        }
        (None, Some(token)) => {
            let report = tracker.shared_daily_report(token, date)?;
            (tracker.shared_baby(token)?.name, report)
        }
        (None, None) => anyhow::bail!("either --baby or --share-token is required"),
    };

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_daily(&name, &report, tracker.boundary()))?;
    Ok(())
}

pub fn week<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    username: Option<&str>,
    args: &WeekArgs,
) -> Result<()> {
    let end_date = args.end_date.as_deref().map(parse_date).transpose()?;
    let (name, report) = match (&args.target.baby, &args.target.share_token) {
        (Some(baby), _) => {
            let user = acting_user(tracker, username)?;
            let baby = BabyId::new(baby.as_str())?;
            let report = tracker.weekly_report(&user.id, &baby, end_date)?;
            (tracker.baby(&user.id, &baby)?.name, report)
        }
        (None, Some(token)) => {
            let report = tracker.shared_weekly_report(token, end_date)?;
            (tracker.shared_baby(token)?.name, report)
        }
        (None, None) => anyhow::bail!("either --baby or --share-token is required"),
    };

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_weekly(&name, &report, tracker.boundary()))?;
    Ok(())
}

// ========== Human-Readable Output ==========

/// Formats a daily report, times shown in the boundary's timezone.
pub fn format_daily(name: &str, report: &DailyReport, boundary: &DayBoundary) -> String {
    let tz = boundary.timezone();
    let mut output = String::new();

    let _ = writeln!(output, "DAILY REPORT: {name}");
    let _ = writeln!(
        output,
        "{}  ({} -> {} {})",
        report.date,
        format_instant(report.day_start, tz),
        format_instant(report.day_end, tz),
        tz.name()
    );

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "SLEEP  {} total",
        format_hours(report.total_hours_slept)
    );
    for sleep in &report.sleeps {
        let duration = (sleep.end - sleep.start).num_milliseconds();
        let line = format!(
            "{} -> {}  {}  {}",
            format_instant(sleep.start, tz),
            format_instant(sleep.end, tz),
            format_duration(duration),
            sleep.note.as_deref().unwrap_or_default()
        );
        let _ = writeln!(output, "  {}", line.trim_end());
    }
    if report.sleeps.is_empty() {
        let _ = writeln!(output, "  (none)");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "DIAPERS  {}", report.diapers.len());
    for diaper in &report.diapers {
        let line = format!(
            "{}  {}  {}",
            format_instant(diaper.time, tz),
            diaper.type_tag,
            diaper.note.as_deref().unwrap_or_default()
        );
        let _ = writeln!(output, "  {}", line.trim_end());
    }
    if report.diapers.is_empty() {
        let _ = writeln!(output, "  (none)");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "NURSINGS  {}", report.nursings.len());
    for nursing in &report.nursings {
        let line = format!(
            "{}  {}  {}  {}",
            format_instant(nursing.time, tz),
            nursing.type_tag,
            nursing.amount,
            nursing.note.as_deref().unwrap_or_default()
        );
        let _ = writeln!(output, "  {}", line.trim_end());
    }
    if report.nursings.is_empty() {
        let _ = writeln!(output, "  (none)");
    }

    output
}

/// Formats a weekly report as a table of completed days plus averages.
pub fn format_weekly(name: &str, report: &WeeklyReport, boundary: &DayBoundary) -> String {
    let first = boundary.date_of(report.start_date);
    let last = first + Duration::days(WINDOW_DAYS - 1);
    let mut output = String::new();

    let _ = writeln!(output, "WEEKLY REPORT: {name}");
    let _ = writeln!(
        output,
        "{first} to {last} ({})",
        boundary.timezone().name()
    );
    let _ = writeln!(output);

    let _ = writeln!(
        output,
        "{:<10}  {:>7}  {:>7}  {:>8}",
        "Date", "Sleep", "Diapers", "Nursings"
    );
    let _ = writeln!(output, "──────────  ───────  ───────  ────────");
    for summary in &report.daily_summaries {
        let _ = writeln!(
            output,
            "{:<10}  {:>7}  {:>7}  {:>8}",
            summary.date.to_string(),
            format_hours(summary.total_hours_slept),
            summary.diaper_count,
            summary.nursing_count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Daily averages (days with activity, current day excluded)");
    let _ = writeln!(output, "  Sleep:     {}", format_hours(report.avg_sleep_hours));
    let _ = writeln!(output, "  Diapers:   {:.1}", report.avg_diapers_per_day);
    let _ = writeln!(output, "  Nursings:  {:.1}", report.avg_nursings_per_day);
    output
}
