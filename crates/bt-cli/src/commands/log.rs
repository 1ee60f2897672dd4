//! Recording new events.

use std::io::Write;

use anyhow::Result;
use bt_core::{BabyId, Event, NewDiaper, NewEvent, NewNursing, NewSleep, Tracker, User, parse_instant};
use clap::Args;

use super::Store;

#[derive(Debug, Args)]
pub struct SleepArgs {
    /// Baby ID.
    #[arg(long)]
    pub baby: String,
    /// When the sleep started (RFC 3339, e.g. 2024-03-10T21:30:00+01:00).
    #[arg(long)]
    pub start: String,
    /// When the sleep ended (RFC 3339).
    #[arg(long)]
    pub end: String,
    /// Free-form note.
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiaperArgs {
    /// Baby ID.
    #[arg(long)]
    pub baby: String,
    /// Diaper type, e.g. wet or dirty.
    #[arg(long)]
    pub kind: String,
    /// When the change happened (RFC 3339).
    #[arg(long)]
    pub time: String,
    /// Free-form note.
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Args)]
pub struct NursingArgs {
    /// Baby ID.
    #[arg(long)]
    pub baby: String,
    /// Nursing type, e.g. left, right or bottle.
    #[arg(long)]
    pub kind: String,
    /// Amount, e.g. 120ml or 15min.
    #[arg(long, default_value = "")]
    pub amount: String,
    /// When the nursing happened (RFC 3339).
    #[arg(long)]
    pub time: String,
    /// Free-form note.
    #[arg(long)]
    pub note: Option<String>,
}

impl SleepArgs {
    fn to_request(&self) -> Result<NewEvent> {
        Ok(NewSleep {
            baby_id: BabyId::new(self.baby.as_str())?,
            start: parse_instant("start", &self.start)?,
            end: parse_instant("end", &self.end)?,
            note: self.note.clone(),
        }
        .into())
    }
}

impl DiaperArgs {
    fn to_request(&self) -> Result<NewEvent> {
        Ok(NewDiaper {
            baby_id: BabyId::new(self.baby.as_str())?,
            type_tag: self.kind.clone(),
            time: parse_instant("time", &self.time)?,
            note: self.note.clone(),
        }
        .into())
    }
}

impl NursingArgs {
    fn to_request(&self) -> Result<NewEvent> {
        Ok(NewNursing {
            baby_id: BabyId::new(self.baby.as_str())?,
            type_tag: self.kind.clone(),
            amount: self.amount.clone(),
            time: parse_instant("time", &self.time)?,
            note: self.note.clone(),
        }
        .into())
    }
}

pub fn sleep<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &SleepArgs,
) -> Result<()> {
    record(writer, tracker, user, args.to_request()?)
}

pub fn diaper<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &DiaperArgs,
) -> Result<()> {
    record(writer, tracker, user, args.to_request()?)
}

pub fn nursing<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &NursingArgs,
) -> Result<()> {
    record(writer, tracker, user, args.to_request()?)
}

fn record<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    request: NewEvent,
) -> Result<()> {
    let event: Event = tracker.log_event(&user.id, request)?;
    writeln!(writer, "Logged {} {}", event.kind(), event.id())?;
    Ok(())
}
