//! Core domain logic for the baby tracker.
//!
//! This crate contains:
//! - Access control: parents, babies and share tokens
//! - Event records: sleeps, diapers and nursings
//! - Report engines: daily and weekly summaries over a timezone-aware day
//!   boundary
//!
//! Persistence is abstracted behind [`AccessStore`] and [`EventStore`].

pub mod access;
pub mod day;
mod error;
pub mod event;
pub mod memory;
pub mod report;
mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use access::{AccessControl, Baby, User};
pub use day::{DayBoundary, TimeRange};
pub use error::TrackerError;
pub use event::{
    DiaperEvent, Event, EventKind, EventPatch, NewDiaper, NewEvent, NewNursing, NewSleep,
    NursingEvent, SleepEvent,
};
pub use memory::MemoryStore;
pub use report::{DailyReport, DailySummary, WeeklyReport};
pub use service::Tracker;
pub use store::{AccessStore, EventStore, RangeField, StoreError};
pub use types::{BabyId, EventId, ShareToken, UserId, ValidationError, parse_date, parse_instant};
