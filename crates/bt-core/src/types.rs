//! Identifier newtypes, input validation and wire-format parsing.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::event::EventKind;

/// Validation errors for caller-supplied input.
///
/// These are always detected before the store is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A date was not in `YYYY-MM-DD` form.
    #[error("invalid date {value:?}, expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// An instant was not a valid RFC 3339 timestamp.
    #[error("invalid {field} {value:?}, expected an RFC 3339 timestamp with offset")]
    InvalidInstant { field: &'static str, value: String },

    /// A sleep interval ends before it starts.
    #[error("sleep ends at {end} before it starts at {start}")]
    SleepEndsBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The username is already registered.
    #[error("username already taken: {username}")]
    UsernameTaken { username: String },

    /// The reporting-day boundary hour is not a valid hour of day.
    #[error("day start hour must be between 0 and 23, got {hour}")]
    DayStartHourOutOfRange { hour: u32 },

    /// The reporting timezone is not a known IANA zone name.
    #[error("unknown timezone: {name}")]
    UnknownTimezone { name: String },

    /// Unknown event kind string.
    #[error("unknown event kind: {value}")]
    UnknownEventKind { value: String },

    /// A range query names a timestamp the event kind does not have.
    #[error("{kind} events cannot be ranged by {field}")]
    RangeFieldMismatch {
        kind: EventKind,
        field: &'static str,
    },

    /// A patch sets a field that the event kind does not have.
    #[error("{kind} events have no {field} field")]
    PatchMismatch {
        kind: EventKind,
        field: &'static str,
    },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Creates a fresh random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier.
    UserId, "user ID"
);

define_string_id!(
    /// A validated baby identifier.
    ///
    /// Knowing a baby ID is what lets a user join that baby as a parent.
    BabyId, "baby ID"
);

define_string_id!(
    /// A validated event identifier, unique across all event kinds.
    EventId, "event ID"
);

/// A secret granting anonymous read-only access to one baby.
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareToken(String);

impl ShareToken {
    /// Wraps an existing token, rejecting the empty string.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ValidationError::Empty {
                field: "share token",
            });
        }
        Ok(Self(token))
    }

    /// Creates a fresh unguessable token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareToken(<redacted>)")
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ShareToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShareToken> for String {
    fn from(token: ShareToken) -> Self {
        token.0
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidDate {
            value: value.to_string(),
        }
    })
}

/// Parses an RFC 3339 instant and normalizes it to UTC.
///
/// `field` names the input in the error message (e.g. `"start"`).
pub fn parse_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidInstant {
            field,
            value: value.to_string(),
        })
}

/// Trims `value` and rejects it if nothing is left.
pub(crate) fn require_non_empty(
    field: &'static str,
    value: &str,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn baby_id_rejects_empty() {
        assert!(BabyId::new("").is_err());
        assert!(BabyId::new("baby-1").is_ok());
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(EventId::generate(), EventId::generate());
        assert_ne!(ShareToken::generate(), ShareToken::generate());
    }

    #[test]
    fn user_id_serde_roundtrip() {
        let id = UserId::new("user-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-123\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn id_serde_rejects_empty() {
        let result: Result<EventId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn share_token_debug_is_redacted() {
        let token = ShareToken::new("super-secret").unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));
        assert_eq!(token.to_string(), "super-secret");
    }

    #[test]
    fn share_token_rejects_empty() {
        assert_eq!(
            ShareToken::new(""),
            Err(ValidationError::Empty {
                field: "share token"
            })
        );
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date("2024-03-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert!(matches!(
            parse_date("10/03/2024"),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn parse_instant_normalizes_to_utc() {
        let parsed = parse_instant("time", "2024-03-10T06:00:00+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
    }

    #[test]
    fn parse_instant_requires_offset() {
        let err = parse_instant("start", "2024-03-10T06:00:00").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidInstant {
                field: "start",
                value: "2024-03-10T06:00:00".to_string()
            }
        );
    }

    #[test]
    fn require_non_empty_trims() {
        assert_eq!(require_non_empty("name", "  Ada ").unwrap(), "Ada");
        assert!(require_non_empty("name", "   ").is_err());
    }
}
