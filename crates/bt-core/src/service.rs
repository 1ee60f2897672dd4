//! The engine's public surface: every operation with authorization applied.

use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{AccessControl, Baby, User};
use crate::day::{DayBoundary, TimeRange};
use crate::error::TrackerError;
use crate::event::{Event, EventKind, EventPatch, NewEvent};
use crate::report::{self, DailyReport, WeeklyReport};
use crate::store::{AccessStore, EventStore, RangeField};
use crate::types::{BabyId, EventId, ShareToken, UserId, ValidationError, require_non_empty};

/// Access-checked operations over an injected store.
///
/// Every call re-reads whatever it needs from the store; the tracker itself
/// holds no per-user state.
#[derive(Debug)]
pub struct Tracker<S> {
    store: S,
    boundary: DayBoundary,
}

impl<S: AccessStore + EventStore + Sync> Tracker<S> {
    pub const fn new(store: S, boundary: DayBoundary) -> Self {
        Self { store, boundary }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn boundary(&self) -> &DayBoundary {
        &self.boundary
    }

    const fn access(&self) -> AccessControl<'_, S> {
        AccessControl::new(&self.store)
    }

    // ========== Users ==========

    /// Registers a user under a fresh id.
    pub fn register_user(
        &self,
        username: &str,
        credential_hash: &str,
    ) -> Result<User, TrackerError> {
        let user = User {
            id: UserId::generate(),
            username: require_non_empty("username", username)?,
            credential_hash: credential_hash.to_string(),
        };
        if !self.store.insert_user(&user)? {
            return Err(ValidationError::UsernameTaken {
                username: user.username,
            }
            .into());
        }
        tracing::info!(user = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Result<User, TrackerError> {
        let username = require_non_empty("username", username)?;
        self.store
            .find_user_by_username(&username)?
            .ok_or_else(|| TrackerError::not_found("user", &username))
    }

    /// Whether `user` is a parent of `baby`.
    pub fn authorize(&self, user: &UserId, baby: &BabyId) -> Result<bool, TrackerError> {
        Ok(self.access().authorize(user, baby)?)
    }

    // ========== Babies ==========

    /// Creates a baby with `user` as its only parent.
    pub fn create_baby(&self, user: &UserId, name: &str) -> Result<Baby, TrackerError> {
        let name = require_non_empty("baby name", name)?;
        if self.store.get_user(user)?.is_none() {
            return Err(TrackerError::not_found("user", user));
        }
        let baby = Baby {
            id: BabyId::generate(),
            name,
            share_token: None,
        };
        self.store.insert_baby(&baby, user)?;
        tracing::debug!(%user, baby = %baby.id, "baby created");
        Ok(baby)
    }

    /// Babies `user` is a parent of.
    pub fn babies(&self, user: &UserId) -> Result<Vec<Baby>, TrackerError> {
        Ok(self.store.babies_for_user(user)?)
    }

    pub fn baby(&self, user: &UserId, baby: &BabyId) -> Result<Baby, TrackerError> {
        self.access().require_parent(user, baby)
    }

    /// The parents of a baby, visible to any of them.
    pub fn parents(&self, user: &UserId, baby: &BabyId) -> Result<Vec<User>, TrackerError> {
        self.access().require_parent(user, baby)?;
        let mut parents = Vec::new();
        for id in self.store.parents_of(baby)? {
            if let Some(parent) = self.store.get_user(&id)? {
                parents.push(parent);
            }
        }
        Ok(parents)
    }

    pub fn rename_baby(
        &self,
        user: &UserId,
        baby: &BabyId,
        name: &str,
    ) -> Result<Baby, TrackerError> {
        let name = require_non_empty("baby name", name)?;
        let mut record = self.access().require_parent(user, baby)?;
        if !self.store.rename_baby(baby, &name)? {
            return Err(TrackerError::not_found("baby", baby));
        }
        record.name = name;
        Ok(record)
    }

    /// Deletes a baby together with all of its events.
    pub fn delete_baby(&self, user: &UserId, baby: &BabyId) -> Result<(), TrackerError> {
        self.access().require_parent(user, baby)?;
        if !self.store.delete_baby(baby)? {
            return Err(TrackerError::not_found("baby", baby));
        }
        tracing::info!(%user, %baby, "baby deleted");
        Ok(())
    }

    /// Adds `new_parent` to the parents of `baby`.
    ///
    /// Any user holding the baby id may add themselves. Adding someone else
    /// requires `acting` to already be a parent.
    pub fn add_parent(
        &self,
        acting: &UserId,
        baby: &BabyId,
        new_parent: &UserId,
    ) -> Result<(), TrackerError> {
        let access = self.access();
        if acting != new_parent {
            access.require_parent(acting, baby)?;
        }
        access.add_parent(baby, new_parent)
    }

    pub fn issue_share_token(
        &self,
        user: &UserId,
        baby: &BabyId,
    ) -> Result<ShareToken, TrackerError> {
        let access = self.access();
        access.require_parent(user, baby)?;
        access.issue_share_token(baby)
    }

    pub fn revoke_share_token(&self, user: &UserId, baby: &BabyId) -> Result<(), TrackerError> {
        let access = self.access();
        access.require_parent(user, baby)?;
        access.revoke_share_token(baby)
    }

    pub fn resolve_share_token(&self, token: &str) -> Result<BabyId, TrackerError> {
        self.access().resolve_share_token(token)
    }

    // ========== Events ==========

    /// Validates and stores a new event for the request's baby.
    pub fn log_event(
        &self,
        user: &UserId,
        request: impl Into<NewEvent>,
    ) -> Result<Event, TrackerError> {
        let event = request.into().into_event()?;
        self.access().require_parent(user, event.baby_id())?;
        self.store.insert_event(&event)?;
        tracing::debug!(
            %user,
            baby = %event.baby_id(),
            kind = %event.kind(),
            id = %event.id(),
            "event logged"
        );
        Ok(event)
    }

    pub fn list_events(
        &self,
        user: &UserId,
        baby: &BabyId,
        kind: EventKind,
    ) -> Result<Vec<Event>, TrackerError> {
        self.access().require_parent(user, baby)?;
        Ok(self.store.list_events(kind, baby)?)
    }

    pub fn list_events_in_range(
        &self,
        user: &UserId,
        baby: &BabyId,
        kind: EventKind,
        range: &TimeRange,
        field: RangeField,
    ) -> Result<Vec<Event>, TrackerError> {
        if !field.applies_to(kind) {
            return Err(ValidationError::RangeFieldMismatch {
                kind,
                field: field.as_str(),
            }
            .into());
        }
        self.access().require_parent(user, baby)?;
        Ok(self.store.list_events_in_range(kind, baby, range, field)?)
    }

    /// Applies `patch` to a stored event.
    ///
    /// Authorization is checked against the baby the stored event belongs to.
    pub fn update_event(
        &self,
        user: &UserId,
        kind: EventKind,
        id: &EventId,
        patch: &EventPatch,
    ) -> Result<Event, TrackerError> {
        patch.validate_for(kind)?;
        let mut event = self.stored_event(kind, id)?;
        self.access().require_parent(user, event.baby_id())?;
        event.apply(patch)?;
        if !self.store.update_event(&event)? {
            return Err(TrackerError::not_found("event", id));
        }
        tracing::debug!(%user, %kind, %id, "event updated");
        Ok(event)
    }

    pub fn delete_event(
        &self,
        user: &UserId,
        kind: EventKind,
        id: &EventId,
    ) -> Result<(), TrackerError> {
        let event = self.stored_event(kind, id)?;
        self.access().require_parent(user, event.baby_id())?;
        if !self.store.delete_event(kind, id)? {
            return Err(TrackerError::not_found("event", id));
        }
        tracing::debug!(%user, %kind, %id, "event deleted");
        Ok(())
    }

    fn stored_event(&self, kind: EventKind, id: &EventId) -> Result<Event, TrackerError> {
        self.store
            .get_event(kind, id)?
            .ok_or_else(|| TrackerError::not_found("event", id))
    }

    // ========== Reports ==========

    /// Daily report for `date`, defaulting to the reporting day in progress.
    pub fn daily_report(
        &self,
        user: &UserId,
        baby: &BabyId,
        date: Option<NaiveDate>,
    ) -> Result<DailyReport, TrackerError> {
        self.daily_report_at(user, baby, date, Utc::now())
    }

    pub fn daily_report_at(
        &self,
        user: &UserId,
        baby: &BabyId,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<DailyReport, TrackerError> {
        self.access().require_parent(user, baby)?;
        self.build_daily(baby, date, now)
    }

    /// Weekly report ending at `end_date`, defaulting to the reporting day in
    /// progress.
    pub fn weekly_report(
        &self,
        user: &UserId,
        baby: &BabyId,
        end_date: Option<NaiveDate>,
    ) -> Result<WeeklyReport, TrackerError> {
        self.weekly_report_at(user, baby, end_date, Utc::now())
    }

    pub fn weekly_report_at(
        &self,
        user: &UserId,
        baby: &BabyId,
        end_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<WeeklyReport, TrackerError> {
        self.access().require_parent(user, baby)?;
        self.build_weekly(baby, end_date, now)
    }

    // ========== Shared (read-only) ==========

    pub fn shared_baby(&self, token: &str) -> Result<Baby, TrackerError> {
        self.access().shared_baby(token)
    }

    pub fn shared_events(&self, token: &str, kind: EventKind) -> Result<Vec<Event>, TrackerError> {
        let baby = self.access().resolve_share_token(token)?;
        Ok(self.store.list_events(kind, &baby)?)
    }

    pub fn shared_daily_report(
        &self,
        token: &str,
        date: Option<NaiveDate>,
    ) -> Result<DailyReport, TrackerError> {
        self.shared_daily_report_at(token, date, Utc::now())
    }

    pub fn shared_daily_report_at(
        &self,
        token: &str,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<DailyReport, TrackerError> {
        let baby = self.access().resolve_share_token(token)?;
        self.build_daily(&baby, date, now)
    }

    pub fn shared_weekly_report(
        &self,
        token: &str,
        end_date: Option<NaiveDate>,
    ) -> Result<WeeklyReport, TrackerError> {
        self.shared_weekly_report_at(token, end_date, Utc::now())
    }

    pub fn shared_weekly_report_at(
        &self,
        token: &str,
        end_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<WeeklyReport, TrackerError> {
        let baby = self.access().resolve_share_token(token)?;
        self.build_weekly(&baby, end_date, now)
    }

    fn build_daily(
        &self,
        baby: &BabyId,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<DailyReport, TrackerError> {
        let date = date.unwrap_or_else(|| self.boundary.date_of(now));
        Ok(report::daily_report(&self.store, baby, date, &self.boundary)?)
    }

    fn build_weekly(
        &self,
        baby: &BabyId,
        end_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<WeeklyReport, TrackerError> {
        let today = self.boundary.date_of(now);
        let end_date = end_date.unwrap_or(today);
        Ok(report::weekly_report(
            &self.store,
            baby,
            end_date,
            &self.boundary,
            today,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::{NewDiaper, NewNursing, NewSleep};
    use crate::memory::MemoryStore;
    use crate::test_support::{assert_hours, date, utc};

    struct Fixture {
        tracker: Tracker<MemoryStore>,
        alice: UserId,
        bob: UserId,
        ada: BabyId,
    }

    fn fixture() -> Fixture {
        let tracker = Tracker::new(MemoryStore::new(), DayBoundary::default());
        let alice = tracker.register_user("alice", "h1").unwrap().id;
        let bob = tracker.register_user("bob", "h2").unwrap().id;
        let ada = tracker.create_baby(&alice, "Ada").unwrap().id;
        Fixture {
            tracker,
            alice,
            bob,
            ada,
        }
    }

    fn sleep(baby: &BabyId, start: DateTime<Utc>, end: DateTime<Utc>) -> NewSleep {
        NewSleep {
            baby_id: baby.clone(),
            start,
            end,
            note: None,
        }
    }

    fn diaper(baby: &BabyId, time: DateTime<Utc>) -> NewDiaper {
        NewDiaper {
            baby_id: baby.clone(),
            type_tag: "wet".to_string(),
            time,
            note: None,
        }
    }

    #[test]
    fn duplicate_username_is_invalid_input() {
        let f = fixture();
        let err = f.tracker.register_user("alice", "other").unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidInput(ValidationError::UsernameTaken { .. })
        ));
        assert_eq!(f.tracker.find_user("alice").unwrap().id, f.alice);
    }

    #[test]
    fn creator_is_the_only_parent() {
        let f = fixture();
        assert!(f.tracker.authorize(&f.alice, &f.ada).unwrap());
        assert!(!f.tracker.authorize(&f.bob, &f.ada).unwrap());
        assert_eq!(f.tracker.babies(&f.alice).unwrap().len(), 1);
        assert!(f.tracker.babies(&f.bob).unwrap().is_empty());
    }

    #[test]
    fn joining_by_id_grants_access() {
        let f = fixture();
        f.tracker.add_parent(&f.bob, &f.ada, &f.bob).unwrap();

        assert!(f.tracker.authorize(&f.bob, &f.ada).unwrap());
        let parents: Vec<_> = f
            .tracker
            .parents(&f.bob, &f.ada)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(parents.len(), 2);
        assert!(parents.contains(&"alice".to_string()));

        let err = f.tracker.add_parent(&f.alice, &f.ada, &f.bob).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyParent { .. }));
    }

    #[test]
    fn non_parent_cannot_add_someone_else() {
        let f = fixture();
        let carol = f.tracker.register_user("carol", "h3").unwrap().id;
        let err = f.tracker.add_parent(&f.bob, &f.ada, &carol).unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));
        assert!(!f.tracker.authorize(&carol, &f.ada).unwrap());
    }

    #[test]
    fn inverted_sleep_is_rejected_before_authorization() {
        let f = fixture();
        // bob is not a parent, but validation fails first.
        let err = f
            .tracker
            .log_event(
                &f.bob,
                sleep(&f.ada, utc(2024, 3, 10, 10, 0), utc(2024, 3, 10, 9, 0)),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidInput(ValidationError::SleepEndsBeforeStart { .. })
        ));
    }

    #[test]
    fn logging_requires_parent() {
        let f = fixture();
        let err = f
            .tracker
            .log_event(&f.bob, diaper(&f.ada, utc(2024, 3, 10, 5, 0)))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));

        let ghost = BabyId::new("ghost").unwrap();
        let err = f
            .tracker
            .log_event(&f.alice, diaper(&ghost, utc(2024, 3, 10, 5, 0)))
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: "baby", .. }));
    }

    #[test]
    fn mutations_are_authorized_against_the_stored_event() {
        let f = fixture();
        let event = f
            .tracker
            .log_event(&f.alice, diaper(&f.ada, utc(2024, 3, 10, 5, 0)))
            .unwrap();
        let patch = EventPatch {
            type_tag: Some("dirty".to_string()),
            ..EventPatch::default()
        };

        let err = f
            .tracker
            .update_event(&f.bob, EventKind::Diaper, event.id(), &patch)
            .unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));
        let err = f
            .tracker
            .delete_event(&f.bob, EventKind::Diaper, event.id())
            .unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));

        let updated = f
            .tracker
            .update_event(&f.alice, EventKind::Diaper, event.id(), &patch)
            .unwrap();
        assert_eq!(updated.into_diaper().unwrap().type_tag, "dirty");

        f.tracker
            .delete_event(&f.alice, EventKind::Diaper, event.id())
            .unwrap();
        let err = f
            .tracker
            .delete_event(&f.alice, EventKind::Diaper, event.id())
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: "event", .. }));
    }

    #[test]
    fn range_field_must_match_kind() {
        let f = fixture();
        let range = TimeRange::new(utc(2024, 3, 10, 0, 0), utc(2024, 3, 11, 0, 0));
        let err = f
            .tracker
            .list_events_in_range(&f.alice, &f.ada, EventKind::Sleep, &range, RangeField::Time)
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidInput(ValidationError::RangeFieldMismatch { .. })
        ));
    }

    #[test]
    fn daily_report_defaults_to_current_reporting_day() {
        let f = fixture();
        f.tracker
            .log_event(&f.alice, diaper(&f.ada, utc(2024, 3, 10, 5, 0)))
            .unwrap();
        f.tracker
            .log_event(&f.alice, diaper(&f.ada, utc(2024, 3, 10, 8, 0)))
            .unwrap();
        f.tracker
            .log_event(
                &f.alice,
                NewNursing {
                    baby_id: f.ada.clone(),
                    type_tag: "bottle".to_string(),
                    amount: "120ml".to_string(),
                    time: utc(2024, 3, 10, 6, 0),
                    note: None,
                },
            )
            .unwrap();

        let report = f
            .tracker
            .daily_report_at(&f.alice, &f.ada, None, utc(2024, 3, 10, 20, 0))
            .unwrap();

        assert_eq!(report.date, date(2024, 3, 10));
        assert_eq!(report.diapers.len(), 2);
        assert_eq!(report.nursings.len(), 1);
        assert!(report.sleeps.is_empty());
        assert_hours(report.total_hours_slept, 0.0);
    }

    #[test]
    fn weekly_report_excludes_today_from_averages() {
        let f = fixture();
        f.tracker
            .log_event(
                &f.alice,
                sleep(&f.ada, utc(2024, 3, 8, 12, 0), utc(2024, 3, 8, 14, 0)),
            )
            .unwrap();
        f.tracker
            .log_event(
                &f.alice,
                sleep(&f.ada, utc(2024, 3, 10, 12, 0), utc(2024, 3, 10, 22, 0)),
            )
            .unwrap();

        let report = f
            .tracker
            .weekly_report_at(&f.alice, &f.ada, None, utc(2024, 3, 10, 23, 30))
            .unwrap();

        assert_eq!(report.daily_summaries.len(), 6);
        assert_eq!(report.daily_summaries[0].date, date(2024, 3, 9));
        assert_hours(report.avg_sleep_hours, 2.0);
    }

    #[test]
    fn reports_require_parent() {
        let f = fixture();
        let now = utc(2024, 3, 10, 12, 0);
        assert!(matches!(
            f.tracker.daily_report_at(&f.bob, &f.ada, None, now),
            Err(TrackerError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.tracker.weekly_report_at(&f.bob, &f.ada, None, now),
            Err(TrackerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn share_token_grants_read_only_reports() {
        let f = fixture();
        f.tracker
            .log_event(&f.alice, diaper(&f.ada, utc(2024, 3, 10, 5, 0)))
            .unwrap();

        let err = f.tracker.issue_share_token(&f.bob, &f.ada).unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized { .. }));

        let token = f.tracker.issue_share_token(&f.alice, &f.ada).unwrap();
        assert_eq!(f.tracker.shared_baby(token.as_str()).unwrap().name, "Ada");
        assert_eq!(
            f.tracker
                .shared_events(token.as_str(), EventKind::Diaper)
                .unwrap()
                .len(),
            1
        );
        let report = f
            .tracker
            .shared_daily_report_at(token.as_str(), Some(date(2024, 3, 10)), utc(2024, 3, 12, 0, 0))
            .unwrap();
        assert_eq!(report.diapers.len(), 1);

        f.tracker.revoke_share_token(&f.alice, &f.ada).unwrap();
        assert!(matches!(
            f.tracker
                .shared_weekly_report_at(token.as_str(), None, utc(2024, 3, 12, 0, 0)),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn deleting_a_baby_removes_its_events() {
        let f = fixture();
        let event = f
            .tracker
            .log_event(&f.alice, diaper(&f.ada, utc(2024, 3, 10, 5, 0)))
            .unwrap();

        assert!(matches!(
            f.tracker.delete_baby(&f.bob, &f.ada),
            Err(TrackerError::Unauthorized { .. })
        ));
        f.tracker.delete_baby(&f.alice, &f.ada).unwrap();

        assert!(
            f.tracker
                .store()
                .get_event(EventKind::Diaper, event.id())
                .unwrap()
                .is_none()
        );
        assert!(f.tracker.babies(&f.alice).unwrap().is_empty());
    }

    #[test]
    fn rename_rejects_blank_names() {
        let f = fixture();
        assert!(matches!(
            f.tracker.rename_baby(&f.alice, &f.ada, "  "),
            Err(TrackerError::InvalidInput(ValidationError::Empty { .. }))
        ));
        let renamed = f.tracker.rename_baby(&f.alice, &f.ada, "Ada Grace").unwrap();
        assert_eq!(renamed.name, "Ada Grace");
    }
}
