//! The three event kinds, typed creation requests and update patches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BabyId, EventId, ValidationError, require_non_empty};

/// Canonical event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Sleep,
    Diaper,
    Nursing,
}

impl EventKind {
    pub const ALL: [Self; 3] = [Self::Sleep, Self::Diaper, Self::Nursing];

    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Diaper => "diaper",
            Self::Nursing => "nursing",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sleep" | "sleeps" => Ok(Self::Sleep),
            "diaper" | "diapers" => Ok(Self::Diaper),
            "nursing" | "nursings" => Ok(Self::Nursing),
            _ => Err(ValidationError::UnknownEventKind {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepEvent {
    pub id: EventId,
    pub baby_id: BabyId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub note: Option<String>,
}

impl SleepEvent {
    /// Length of the interval in hours, clamped at zero.
    pub fn hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaperEvent {
    pub id: EventId,
    pub baby_id: BabyId,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub time: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NursingEvent {
    pub id: EventId,
    pub baby_id: BabyId,
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Free-form, e.g. `"120ml"` or `"15min"`.
    pub amount: String,
    pub time: DateTime<Utc>,
    pub note: Option<String>,
}

/// Any stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Sleep(SleepEvent),
    Diaper(DiaperEvent),
    Nursing(NursingEvent),
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Sleep(_) => EventKind::Sleep,
            Self::Diaper(_) => EventKind::Diaper,
            Self::Nursing(_) => EventKind::Nursing,
        }
    }

    pub const fn id(&self) -> &EventId {
        match self {
            Self::Sleep(e) => &e.id,
            Self::Diaper(e) => &e.id,
            Self::Nursing(e) => &e.id,
        }
    }

    pub const fn baby_id(&self) -> &BabyId {
        match self {
            Self::Sleep(e) => &e.baby_id,
            Self::Diaper(e) => &e.baby_id,
            Self::Nursing(e) => &e.baby_id,
        }
    }

    /// The timestamp events of this kind are ordered by.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Sleep(e) => e.start,
            Self::Diaper(e) => e.time,
            Self::Nursing(e) => e.time,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Sleep(e) => e.note.as_deref(),
            Self::Diaper(e) => e.note.as_deref(),
            Self::Nursing(e) => e.note.as_deref(),
        }
    }

    /// Checks the invariants enforced at ingestion.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Sleep(e) if e.end < e.start => Err(ValidationError::SleepEndsBeforeStart {
                start: e.start,
                end: e.end,
            }),
            Self::Sleep(_) => Ok(()),
            Self::Diaper(e) => require_non_empty("diaper type", &e.type_tag).map(|_| ()),
            Self::Nursing(e) => require_non_empty("nursing type", &e.type_tag).map(|_| ()),
        }
    }

    /// Applies `patch` in place. The baby association never changes.
    pub fn apply(&mut self, patch: &EventPatch) -> Result<(), ValidationError> {
        patch.validate_for(self.kind())?;
        match self {
            Self::Sleep(e) => {
                if let Some(start) = patch.start {
                    e.start = start;
                }
                if let Some(end) = patch.end {
                    e.end = end;
                }
                if let Some(note) = &patch.note {
                    e.note = normalize_note(note.as_deref());
                }
            }
            Self::Diaper(e) => {
                if let Some(time) = patch.time {
                    e.time = time;
                }
                if let Some(type_tag) = &patch.type_tag {
                    e.type_tag = require_non_empty("diaper type", type_tag)?;
                }
                if let Some(note) = &patch.note {
                    e.note = normalize_note(note.as_deref());
                }
            }
            Self::Nursing(e) => {
                if let Some(time) = patch.time {
                    e.time = time;
                }
                if let Some(type_tag) = &patch.type_tag {
                    e.type_tag = require_non_empty("nursing type", type_tag)?;
                }
                if let Some(amount) = &patch.amount {
                    e.amount = amount.trim().to_string();
                }
                if let Some(note) = &patch.note {
                    e.note = normalize_note(note.as_deref());
                }
            }
        }
        self.validate()
    }

    pub fn into_sleep(self) -> Option<SleepEvent> {
        match self {
            Self::Sleep(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_diaper(self) -> Option<DiaperEvent> {
        match self {
            Self::Diaper(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_nursing(self) -> Option<NursingEvent> {
        match self {
            Self::Nursing(e) => Some(e),
            _ => None,
        }
    }
}

/// Request to log a sleep interval.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSleep {
    pub baby_id: BabyId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request to log a diaper change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiaper {
    pub baby_id: BabyId,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request to log a nursing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNursing {
    pub baby_id: BabyId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub amount: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A typed request to create any event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewEvent {
    Sleep(NewSleep),
    Diaper(NewDiaper),
    Nursing(NewNursing),
}

impl NewEvent {
    pub const fn baby_id(&self) -> &BabyId {
        match self {
            Self::Sleep(r) => &r.baby_id,
            Self::Diaper(r) => &r.baby_id,
            Self::Nursing(r) => &r.baby_id,
        }
    }

    /// Validates the request and assigns a fresh identifier.
    pub fn into_event(self) -> Result<Event, ValidationError> {
        let event = match self {
            Self::Sleep(r) => Event::Sleep(SleepEvent {
                id: EventId::generate(),
                baby_id: r.baby_id,
                start: r.start,
                end: r.end,
                note: normalize_note(r.note.as_deref()),
            }),
            Self::Diaper(r) => Event::Diaper(DiaperEvent {
                id: EventId::generate(),
                baby_id: r.baby_id,
                type_tag: require_non_empty("diaper type", &r.type_tag)?,
                time: r.time,
                note: normalize_note(r.note.as_deref()),
            }),
            Self::Nursing(r) => Event::Nursing(NursingEvent {
                id: EventId::generate(),
                baby_id: r.baby_id,
                type_tag: require_non_empty("nursing type", &r.type_tag)?,
                amount: r.amount.trim().to_string(),
                time: r.time,
                note: normalize_note(r.note.as_deref()),
            }),
        };
        event.validate()?;
        Ok(event)
    }
}

impl From<NewSleep> for NewEvent {
    fn from(request: NewSleep) -> Self {
        Self::Sleep(request)
    }
}

impl From<NewDiaper> for NewEvent {
    fn from(request: NewDiaper) -> Self {
        Self::Diaper(request)
    }
}

impl From<NewNursing> for NewEvent {
    fn from(request: NewNursing) -> Self {
        Self::Nursing(request)
    }
}

/// Partial update of an event.
///
/// `note: Some(None)` clears the note. Setting a field the event kind does not
/// have is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub time: Option<DateTime<Utc>>,
    pub type_tag: Option<String>,
    pub amount: Option<String>,
    pub note: Option<Option<String>>,
}

impl EventPatch {
    pub const fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.time.is_none()
            && self.type_tag.is_none()
            && self.amount.is_none()
            && self.note.is_none()
    }

    /// Rejects empty patches and fields `kind` does not have.
    pub fn validate_for(&self, kind: EventKind) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Empty { field: "patch" });
        }
        let foreign = match kind {
            EventKind::Sleep => [
                ("time", self.time.is_some()),
                ("type", self.type_tag.is_some()),
                ("amount", self.amount.is_some()),
            ],
            EventKind::Diaper => [
                ("start", self.start.is_some()),
                ("end", self.end.is_some()),
                ("amount", self.amount.is_some()),
            ],
            EventKind::Nursing => [
                ("start", self.start.is_some()),
                ("end", self.end.is_some()),
                ("amount", false),
            ],
        };
        match foreign.into_iter().find(|(_, set)| *set) {
            Some((field, _)) => Err(ValidationError::PatchMismatch { kind, field }),
            None => Ok(()),
        }
    }
}

/// Hours between two instants, clamped at zero.
#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond counts for sleep intervals are far below 2^52"
)]
pub(crate) fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = end.signed_duration_since(start).num_milliseconds().max(0);
    ms as f64 / 3_600_000.0
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap()
    }

    fn baby() -> BabyId {
        BabyId::new("baby-1").unwrap()
    }

    #[test]
    fn kind_roundtrip_and_aliases() {
        for kind in EventKind::ALL {
            assert_eq!(kind.to_string().parse::<EventKind>().unwrap(), kind);
        }
        assert_eq!("diapers".parse::<EventKind>().unwrap(), EventKind::Diaper);
        let err = "bath".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event kind: bath");
    }

    #[test]
    fn new_sleep_rejects_inverted_interval() {
        let request = NewEvent::from(NewSleep {
            baby_id: baby(),
            start: at(10, 0),
            end: at(9, 0),
            note: None,
        });
        assert!(matches!(
            request.into_event(),
            Err(ValidationError::SleepEndsBeforeStart { .. })
        ));
    }

    #[test]
    fn new_sleep_accepts_zero_length() {
        let event = NewEvent::from(NewSleep {
            baby_id: baby(),
            start: at(10, 0),
            end: at(10, 0),
            note: Some("  ".to_string()),
        })
        .into_event()
        .unwrap();
        assert_eq!(event.kind(), EventKind::Sleep);
        assert_eq!(event.note(), None);
    }

    #[test]
    fn new_diaper_requires_type() {
        let request = NewEvent::from(NewDiaper {
            baby_id: baby(),
            type_tag: " ".to_string(),
            time: at(5, 0),
            note: None,
        });
        assert_eq!(
            request.into_event(),
            Err(ValidationError::Empty {
                field: "diaper type"
            })
        );
    }

    #[test]
    fn sleep_hours_clamp_negative() {
        let sleep = SleepEvent {
            id: EventId::new("s").unwrap(),
            baby_id: baby(),
            start: at(10, 0),
            end: at(9, 0),
            note: None,
        };
        assert!(sleep.hours().abs() < f64::EPSILON);

        let sleep = SleepEvent {
            end: at(11, 30),
            ..sleep
        };
        assert!((sleep.hours() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn patch_updates_nursing_fields() {
        let mut event = NewEvent::from(NewNursing {
            baby_id: baby(),
            type_tag: "bottle".to_string(),
            amount: "90ml".to_string(),
            time: at(6, 0),
            note: Some("fussy".to_string()),
        })
        .into_event()
        .unwrap();

        let patch = EventPatch {
            amount: Some("120ml".to_string()),
            note: Some(None),
            ..EventPatch::default()
        };
        event.apply(&patch).unwrap();

        let nursing = event.into_nursing().unwrap();
        assert_eq!(nursing.amount, "120ml");
        assert_eq!(nursing.note, None);
        assert_eq!(nursing.type_tag, "bottle");
    }

    #[test]
    fn patch_rejects_foreign_fields() {
        let mut event = NewEvent::from(NewDiaper {
            baby_id: baby(),
            type_tag: "wet".to_string(),
            time: at(5, 0),
            note: None,
        })
        .into_event()
        .unwrap();

        let patch = EventPatch {
            start: Some(at(4, 0)),
            ..EventPatch::default()
        };
        assert_eq!(
            event.apply(&patch),
            Err(ValidationError::PatchMismatch {
                kind: EventKind::Diaper,
                field: "start"
            })
        );
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert_eq!(
            EventPatch::default().validate_for(EventKind::Sleep),
            Err(ValidationError::Empty { field: "patch" })
        );
    }

    #[test]
    fn patch_revalidates_sleep_interval() {
        let mut event = NewEvent::from(NewSleep {
            baby_id: baby(),
            start: at(1, 0),
            end: at(3, 0),
            note: None,
        })
        .into_event()
        .unwrap();

        let patch = EventPatch {
            end: Some(at(0, 30)),
            ..EventPatch::default()
        };
        assert!(matches!(
            event.apply(&patch),
            Err(ValidationError::SleepEndsBeforeStart { .. })
        ));
    }

    #[test]
    fn events_serialize_camel_case_with_type_field() {
        let event = Event::Nursing(NursingEvent {
            id: EventId::new("n-1").unwrap(),
            baby_id: baby(),
            type_tag: "left".to_string(),
            amount: "10min".to_string(),
            time: at(6, 0),
            note: None,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "nursing");
        assert_eq!(json["babyId"], "baby-1");
        assert_eq!(json["type"], "left");
        assert_eq!(json["time"], "2024-03-10T06:00:00Z");
    }

    #[test]
    fn new_diaper_deserializes_from_typed_body() {
        let body = r#"{"babyId":"baby-1","type":"dirty","time":"2024-03-10T06:00:00+01:00"}"#;
        let request: NewDiaper = serde_json::from_str(body).unwrap();
        assert_eq!(request.baby_id, baby());
        assert_eq!(request.time, at(5, 0));
        assert_eq!(request.note, None);
    }
}
