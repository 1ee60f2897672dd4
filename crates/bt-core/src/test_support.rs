//! Fixtures shared by the unit tests in this crate.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::access::{Baby, User};
use crate::event::{DiaperEvent, Event, NursingEvent, SleepEvent};
use crate::memory::MemoryStore;
use crate::store::{AccessStore, EventStore};
use crate::types::{BabyId, EventId, UserId};

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn assert_hours(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected} hours, got {actual}"
    );
}

/// A store holding one parent (`alice`) of one baby (`ada`).
pub fn family() -> (MemoryStore, UserId, BabyId) {
    let store = MemoryStore::new();
    let user = User {
        id: UserId::new("alice").unwrap(),
        username: "alice".to_string(),
        credential_hash: "hash".to_string(),
    };
    store.insert_user(&user).unwrap();
    let baby = Baby {
        id: BabyId::new("ada").unwrap(),
        name: "Ada".to_string(),
        share_token: None,
    };
    store.insert_baby(&baby, &user.id).unwrap();
    (store, user.id, baby.id)
}

pub fn add_sleep(
    store: &MemoryStore,
    baby: &BabyId,
    id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    store
        .insert_event(&Event::Sleep(SleepEvent {
            id: EventId::new(id).unwrap(),
            baby_id: baby.clone(),
            start,
            end,
            note: None,
        }))
        .unwrap();
}

pub fn add_diaper(store: &MemoryStore, baby: &BabyId, id: &str, time: DateTime<Utc>) {
    store
        .insert_event(&Event::Diaper(DiaperEvent {
            id: EventId::new(id).unwrap(),
            baby_id: baby.clone(),
            type_tag: "wet".to_string(),
            time,
            note: None,
        }))
        .unwrap();
}

pub fn add_nursing(store: &MemoryStore, baby: &BabyId, id: &str, time: DateTime<Utc>) {
    store
        .insert_event(&Event::Nursing(NursingEvent {
            id: EventId::new(id).unwrap(),
            baby_id: baby.clone(),
            type_tag: "bottle".to_string(),
            amount: "120ml".to_string(),
            time,
            note: None,
        }))
        .unwrap();
}
