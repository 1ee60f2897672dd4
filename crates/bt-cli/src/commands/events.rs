//! Listing, correcting and removing recorded events.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use bt_core::{
    BabyId, Event, EventId, EventKind, EventPatch, RangeField, TimeRange, Tracker, User,
    parse_instant,
};
use chrono_tz::Tz;
use clap::Args;

use super::{Store, format_duration, format_instant};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Baby ID.
    #[arg(long)]
    pub baby: String,
    /// Only list one kind (sleep, diaper or nursing).
    #[arg(long)]
    pub kind: Option<EventKind>,
    /// Range start (RFC 3339, inclusive).
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Range end (RFC 3339, exclusive).
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Event kind (sleep, diaper or nursing).
    pub kind: EventKind,
    /// Event ID.
    pub id: String,
    /// New sleep start (RFC 3339).
    #[arg(long)]
    pub start: Option<String>,
    /// New sleep end (RFC 3339).
    #[arg(long)]
    pub end: Option<String>,
    /// New diaper or nursing time (RFC 3339).
    #[arg(long)]
    pub time: Option<String>,
    /// New diaper or nursing type.
    #[arg(long = "type")]
    pub type_tag: Option<String>,
    /// New nursing amount.
    #[arg(long)]
    pub amount: Option<String>,
    /// New note.
    #[arg(long, conflicts_with = "clear_note")]
    pub note: Option<String>,
    /// Remove the note.
    #[arg(long)]
    pub clear_note: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Event kind (sleep, diaper or nursing).
    pub kind: EventKind,
    /// Event ID.
    pub id: String,
}

impl UpdateArgs {
    fn to_patch(&self) -> Result<EventPatch> {
        let instant = |field: &'static str, value: Option<&String>| {
            value.map(|v| parse_instant(field, v)).transpose()
        };
        let note = if self.clear_note {
            Some(None)
        } else {
            self.note.clone().map(Some)
        };
        Ok(EventPatch {
            start: instant("start", self.start.as_ref())?,
            end: instant("end", self.end.as_ref())?,
            time: instant("time", self.time.as_ref())?,
            type_tag: self.type_tag.clone(),
            amount: self.amount.clone(),
            note,
        })
    }
}

pub fn list<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &ListArgs,
) -> Result<()> {
    let baby = BabyId::new(args.baby.as_str())?;
    let range = match (&args.from, &args.to) {
        (Some(from), Some(to)) => Some(TimeRange::new(
            parse_instant("from", from)?,
            parse_instant("to", to)?,
        )),
        (None, None) => None,
        _ => bail!("--from and --to must be given together"),
    };
    let kinds = args.kind.map_or_else(|| EventKind::ALL.to_vec(), |kind| vec![kind]);

    let mut events = Vec::new();
    for kind in kinds {
        let batch = match &range {
            Some(range) => {
                let field = if kind == EventKind::Sleep {
                    RangeField::Overlap
                } else {
                    RangeField::Time
                };
                tracker.list_events_in_range(&user.id, &baby, kind, range, field)?
            }
            None => tracker.list_events(&user.id, &baby, kind)?,
        };
        events.push((kind, batch));
    }

    if args.json {
        let flat: Vec<&Event> = events.iter().flat_map(|(_, batch)| batch).collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&flat)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_events(&events, tracker.boundary().timezone()))?;
    Ok(())
}

pub fn update<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &UpdateArgs,
) -> Result<()> {
    let id = EventId::new(args.id.as_str())?;
    let patch = args.to_patch()?;
    let event = tracker.update_event(&user.id, args.kind, &id, &patch)?;
    writeln!(writer, "Updated {} {}", event.kind(), event.id())?;
    Ok(())
}

pub fn delete<W: Write, S: Store>(
    writer: &mut W,
    tracker: &Tracker<S>,
    user: &User,
    args: &DeleteArgs,
) -> Result<()> {
    let id = EventId::new(args.id.as_str())?;
    tracker.delete_event(&user.id, args.kind, &id)?;
    writeln!(writer, "Deleted {} {id}", args.kind)?;
    Ok(())
}

/// Formats events grouped by kind, times shown in `tz`.
pub fn format_events(groups: &[(EventKind, Vec<Event>)], tz: Tz) -> String {
    let mut output = String::new();
    for (index, (kind, events)) in groups.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(output);
        }
        let _ = writeln!(
            output,
            "{} ({})",
            kind.as_str().to_uppercase(),
            events.len()
        );
        for event in events {
            let line = format_event_line(event, tz);
            let _ = writeln!(output, "  {}", line.trim_end());
        }
    }
    output
}

fn format_event_line(event: &Event, tz: Tz) -> String {
    let note = event.note().unwrap_or_default();
    match event {
        Event::Sleep(e) => {
            let duration = (e.end - e.start).num_milliseconds();
            format!(
                "{} -> {}  {}  {:>7}  {note}",
                format_instant(e.start, tz),
                format_instant(e.end, tz),
                e.id,
                format_duration(duration),
            )
        }
        Event::Diaper(e) => format!(
            "{}  {:<8}  {}  {note}",
            format_instant(e.time, tz),
            e.type_tag,
            e.id,
        ),
        Event::Nursing(e) => format!(
            "{}  {:<8}  {:<6}  {}  {note}",
            format_instant(e.time, tz),
            e.type_tag,
            e.amount,
            e.id,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bt_core::{DayBoundary, DiaperEvent, EventStore, MemoryStore, NursingEvent, SleepEvent};
    use chrono::{DateTime, TimeZone, Utc};
    use insta::assert_snapshot;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn setup() -> (Tracker<MemoryStore>, User, BabyId) {
        let tracker = Tracker::new(MemoryStore::new(), DayBoundary::default());
        let alice = tracker.register_user("alice", "").unwrap();
        let baby = tracker.create_baby(&alice.id, "Ada").unwrap();
        let store = tracker.store();
        store
            .insert_event(&Event::Sleep(SleepEvent {
                id: EventId::new("s-1").unwrap(),
                baby_id: baby.id.clone(),
                start: utc(9, 22, 0),
                end: utc(10, 5, 30),
                note: Some("woke once".to_string()),
            }))
            .unwrap();
        store
            .insert_event(&Event::Diaper(DiaperEvent {
                id: EventId::new("d-1").unwrap(),
                baby_id: baby.id.clone(),
                type_tag: "wet".to_string(),
                time: utc(10, 6, 0),
                note: None,
            }))
            .unwrap();
        store
            .insert_event(&Event::Nursing(NursingEvent {
                id: EventId::new("n-1").unwrap(),
                baby_id: baby.id.clone(),
                type_tag: "bottle".to_string(),
                amount: "120ml".to_string(),
                time: utc(10, 6, 15),
                note: None,
            }))
            .unwrap();
        (tracker, alice, baby.id)
    }

    fn list_args(baby: &BabyId) -> ListArgs {
        ListArgs {
            baby: baby.to_string(),
            kind: None,
            from: None,
            to: None,
            json: false,
        }
    }

    fn run_list(tracker: &Tracker<MemoryStore>, user: &User, args: &ListArgs) -> String {
        let mut output = Vec::new();
        list(&mut output, tracker, user, args).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn list_groups_by_kind_in_local_time() {
        let (tracker, alice, baby) = setup();
        let output = run_list(&tracker, &alice, &list_args(&baby));
        assert_snapshot!(output, @r"
        SLEEP (1)
          2024-03-09 23:00 -> 2024-03-10 06:30  s-1   7h 30m  woke once

        DIAPER (1)
          2024-03-10 07:00  wet       d-1

        NURSING (1)
          2024-03-10 07:15  bottle    120ml   n-1
        ");
    }

    #[test]
    fn list_range_uses_overlap_for_sleeps() {
        let (tracker, alice, baby) = setup();
        let args = ListArgs {
            kind: Some(EventKind::Sleep),
            from: Some("2024-03-10T00:00:00Z".to_string()),
            to: Some("2024-03-11T00:00:00Z".to_string()),
            ..list_args(&baby)
        };
        let output = run_list(&tracker, &alice, &args);
        assert!(output.starts_with("SLEEP (1)\n"));

        let args = ListArgs {
            kind: Some(EventKind::Diaper),
            from: Some("2024-03-10T07:00:00Z".to_string()),
            to: Some("2024-03-11T00:00:00Z".to_string()),
            ..list_args(&baby)
        };
        assert_eq!(run_list(&tracker, &alice, &args), "DIAPER (0)\n");
    }

    #[test]
    fn list_json_is_flat_array() {
        let (tracker, alice, baby) = setup();
        let args = ListArgs {
            json: true,
            ..list_args(&baby)
        };
        let output = run_list(&tracker, &alice, &args);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let kinds: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["sleep", "diaper", "nursing"]);
    }

    #[test]
    fn update_changes_fields_and_clears_note() {
        let (tracker, alice, baby) = setup();
        let args = UpdateArgs {
            kind: EventKind::Sleep,
            id: "s-1".to_string(),
            start: None,
            end: Some("2024-03-10T07:00:00+01:00".to_string()),
            time: None,
            type_tag: None,
            amount: None,
            note: None,
            clear_note: true,
        };
        let mut output = Vec::new();
        update(&mut output, &tracker, &alice, &args).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Updated sleep s-1\n");

        let sleep = tracker
            .list_events(&alice.id, &baby, EventKind::Sleep)
            .unwrap()
            .remove(0)
            .into_sleep()
            .unwrap();
        assert_eq!(sleep.end, utc(10, 6, 0));
        assert_eq!(sleep.note, None);
    }

    #[test]
    fn update_rejects_fields_of_other_kinds() {
        let (tracker, alice, _) = setup();
        let args = UpdateArgs {
            kind: EventKind::Diaper,
            id: "d-1".to_string(),
            start: Some("2024-03-10T07:00:00Z".to_string()),
            end: None,
            time: None,
            type_tag: None,
            amount: None,
            note: None,
            clear_note: false,
        };
        let err = update(&mut Vec::new(), &tracker, &alice, &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: diaper events have no start field"
        );
    }

    #[test]
    fn delete_by_non_parent_is_refused() {
        let (tracker, _, _) = setup();
        let bob = tracker.register_user("bob", "").unwrap();
        let args = DeleteArgs {
            kind: EventKind::Diaper,
            id: "d-1".to_string(),
        };
        assert!(delete(&mut Vec::new(), &tracker, &bob, &args).is_err());
    }
}
