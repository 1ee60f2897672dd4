//! Record store contracts.
//!
//! The engine never talks to a database directly. It is handed something that
//! implements [`AccessStore`] and [`EventStore`]; `bt-db` provides the SQLite
//! implementation and [`crate::memory::MemoryStore`] an in-process one.
//!
//! All instants crossing these traits are UTC.

use std::error::Error as StdError;

use thiserror::Error;

use crate::access::{Baby, User};
use crate::day::TimeRange;
use crate::event::{Event, EventKind};
use crate::types::{BabyId, EventId, ShareToken, UserId};

/// An opaque persistence failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Which timestamp bounds a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeField {
    /// The instant of a diaper or nursing event.
    Time,
    /// The start of a sleep.
    Start,
    /// The end of a sleep.
    End,
    /// Any sleep admitted by [`TimeRange::admits_interval`].
    Overlap,
}

impl RangeField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Start => "start",
            Self::End => "end",
            Self::Overlap => "overlap",
        }
    }

    pub const fn applies_to(self, kind: EventKind) -> bool {
        matches!(
            (self, kind),
            (Self::Time, EventKind::Diaper | EventKind::Nursing)
                | (Self::Start | Self::End | Self::Overlap, EventKind::Sleep)
        )
    }

    /// Reference predicate for store implementations.
    pub fn matches(self, event: &Event, range: &TimeRange) -> bool {
        match (self, event) {
            (Self::Time, Event::Diaper(e)) => range.contains(e.time),
            (Self::Time, Event::Nursing(e)) => range.contains(e.time),
            (Self::Start, Event::Sleep(e)) => range.contains(e.start),
            (Self::End, Event::Sleep(e)) => range.contains(e.end),
            (Self::Overlap, Event::Sleep(e)) => range.admits_interval(e.start, e.end),
            _ => false,
        }
    }
}

/// Users, babies, the parent relation and share tokens.
pub trait AccessStore {
    /// Inserts a user. Returns `false` when the username is taken.
    fn insert_user(&self, user: &User) -> Result<bool, StoreError>;

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a baby together with its first parent.
    fn insert_baby(&self, baby: &Baby, parent: &UserId) -> Result<(), StoreError>;

    fn get_baby(&self, id: &BabyId) -> Result<Option<Baby>, StoreError>;

    /// Returns `false` when the baby does not exist.
    fn rename_baby(&self, id: &BabyId, name: &str) -> Result<bool, StoreError>;

    /// Deletes a baby, its parent relations and its events.
    fn delete_baby(&self, id: &BabyId) -> Result<bool, StoreError>;

    /// Babies the user is a parent of, ordered by name then id.
    fn babies_for_user(&self, user: &UserId) -> Result<Vec<Baby>, StoreError>;

    /// Parent ids of a baby, ordered by id.
    fn parents_of(&self, baby: &BabyId) -> Result<Vec<UserId>, StoreError>;

    fn is_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError>;

    /// Adds a parent relation. Returns `false` when it already exists.
    fn insert_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError>;

    /// Stores `token` only if the baby has none. Returns `false` when the baby
    /// does not exist or already has a token.
    fn set_share_token_if_absent(
        &self,
        baby: &BabyId,
        token: &ShareToken,
    ) -> Result<bool, StoreError>;

    /// Clears the share token. Returns `false` when the baby does not exist.
    fn clear_share_token(&self, baby: &BabyId) -> Result<bool, StoreError>;

    fn find_baby_by_share_token(&self, token: &ShareToken) -> Result<Option<Baby>, StoreError>;
}

/// Sleep, diaper and nursing records keyed by baby.
pub trait EventStore {
    fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    fn get_event(&self, kind: EventKind, id: &EventId) -> Result<Option<Event>, StoreError>;

    /// All events of `kind` for a baby, ordered by timestamp then id.
    fn list_events(&self, kind: EventKind, baby: &BabyId) -> Result<Vec<Event>, StoreError>;

    /// Events of `kind` whose `field` falls in `range`, ordered by timestamp
    /// then id. A `field` that does not apply to `kind` is an error.
    fn list_events_in_range(
        &self,
        kind: EventKind,
        baby: &BabyId,
        range: &TimeRange,
        field: RangeField,
    ) -> Result<Vec<Event>, StoreError>;

    /// Replaces a stored event. Returns `false` when it does not exist.
    fn update_event(&self, event: &Event) -> Result<bool, StoreError>;

    /// Returns `false` when the event does not exist.
    fn delete_event(&self, kind: EventKind, id: &EventId) -> Result<bool, StoreError>;
}
