//! In-process store, used by tests and by embedders that do not need
//! persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::access::{Baby, User};
use crate::day::TimeRange;
use crate::event::{Event, EventKind};
use crate::store::{AccessStore, EventStore, RangeField, StoreError};
use crate::types::{BabyId, EventId, ShareToken, UserId};

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    babies: BTreeMap<BabyId, Baby>,
    /// (baby, user) pairs.
    parents: BTreeSet<(BabyId, UserId)>,
    events: BTreeMap<EventId, Event>,
}

/// A [`AccessStore`] + [`EventStore`] kept in memory behind a lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::new("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::new("memory store lock poisoned"))
    }
}

fn sorted(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| {
        a.timestamp()
            .cmp(&b.timestamp())
            .then_with(|| a.id().cmp(b.id()))
    });
    events
}

impl AccessStore for MemoryStore {
    fn insert_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.username == user.username) {
            return Ok(false);
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn insert_baby(&self, baby: &Baby, parent: &UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.babies.contains_key(&baby.id) {
            return Err(StoreError::new(format!("duplicate baby id {}", baby.id)));
        }
        state.babies.insert(baby.id.clone(), baby.clone());
        state.parents.insert((baby.id.clone(), parent.clone()));
        Ok(())
    }

    fn get_baby(&self, id: &BabyId) -> Result<Option<Baby>, StoreError> {
        Ok(self.read()?.babies.get(id).cloned())
    }

    fn rename_baby(&self, id: &BabyId, name: &str) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        Ok(state.babies.get_mut(id).is_some_and(|baby| {
            baby.name = name.to_string();
            true
        }))
    }

    fn delete_baby(&self, id: &BabyId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.babies.remove(id).is_none() {
            return Ok(false);
        }
        state.parents.retain(|(baby, _)| baby != id);
        state.events.retain(|_, event| event.baby_id() != id);
        Ok(true)
    }

    fn babies_for_user(&self, user: &UserId) -> Result<Vec<Baby>, StoreError> {
        let state = self.read()?;
        let mut babies: Vec<Baby> = state
            .parents
            .iter()
            .filter(|(_, parent)| parent == user)
            .filter_map(|(baby, _)| state.babies.get(baby).cloned())
            .collect();
        babies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(babies)
    }

    fn parents_of(&self, baby: &BabyId) -> Result<Vec<UserId>, StoreError> {
        Ok(self
            .read()?
            .parents
            .iter()
            .filter(|(b, _)| b == baby)
            .map(|(_, user)| user.clone())
            .collect())
    }

    fn is_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .parents
            .contains(&(baby.clone(), user.clone())))
    }

    fn insert_parent(&self, baby: &BabyId, user: &UserId) -> Result<bool, StoreError> {
        Ok(self.write()?.parents.insert((baby.clone(), user.clone())))
    }

    fn set_share_token_if_absent(
        &self,
        baby: &BabyId,
        token: &ShareToken,
    ) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.babies.get_mut(baby) {
            Some(record) if record.share_token.is_none() => {
                record.share_token = Some(token.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn clear_share_token(&self, baby: &BabyId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        Ok(state.babies.get_mut(baby).is_some_and(|record| {
            record.share_token = None;
            true
        }))
    }

    fn find_baby_by_share_token(&self, token: &ShareToken) -> Result<Option<Baby>, StoreError> {
        Ok(self
            .read()?
            .babies
            .values()
            .find(|baby| baby.share_token.as_ref() == Some(token))
            .cloned())
    }
}

impl EventStore for MemoryStore {
    fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.events.contains_key(event.id()) {
            return Err(StoreError::new(format!("duplicate event id {}", event.id())));
        }
        state.events.insert(event.id().clone(), event.clone());
        Ok(())
    }

    fn get_event(&self, kind: EventKind, id: &EventId) -> Result<Option<Event>, StoreError> {
        Ok(self
            .read()?
            .events
            .get(id)
            .filter(|event| event.kind() == kind)
            .cloned())
    }

    fn list_events(&self, kind: EventKind, baby: &BabyId) -> Result<Vec<Event>, StoreError> {
        let state = self.read()?;
        Ok(sorted(
            state
                .events
                .values()
                .filter(|event| event.kind() == kind && event.baby_id() == baby)
                .cloned()
                .collect(),
        ))
    }

    fn list_events_in_range(
        &self,
        kind: EventKind,
        baby: &BabyId,
        range: &TimeRange,
        field: RangeField,
    ) -> Result<Vec<Event>, StoreError> {
        if !field.applies_to(kind) {
            return Err(StoreError::new(format!(
                "range field {field:?} does not apply to {kind} events"
            )));
        }
        let state = self.read()?;
        Ok(sorted(
            state
                .events
                .values()
                .filter(|event| event.kind() == kind && event.baby_id() == baby)
                .filter(|event| field.matches(event, range))
                .cloned()
                .collect(),
        ))
    }

    fn update_event(&self, event: &Event) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.events.get_mut(event.id()) {
            Some(existing) if existing.kind() == event.kind() => {
                *existing = event.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_event(&self, kind: EventKind, id: &EventId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.events.get(id).is_some_and(|event| event.kind() == kind) {
            state.events.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}
