//! Identity and access model.
//!
//! A baby has a symmetric set of parents; every parent may read and write all
//! of that baby's records. A baby may also carry a share token granting
//! anonymous read-only access, independent of the parent set.
//!
//! Nothing here caches: every check re-reads the parent relation from the
//! store so a freshly added or removed parent is seen immediately.

use std::fmt;

use serde::Serialize;

use crate::error::TrackerError;
use crate::store::{AccessStore, StoreError};
use crate::types::{BabyId, ShareToken, UserId};

/// A registered user.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Produced and checked outside this crate.
    #[serde(skip)]
    pub credential_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A child whose events are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Baby {
    pub id: BabyId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<ShareToken>,
}

/// Authorization checks and share-token management over an [`AccessStore`].
pub struct AccessControl<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AccessStore + ?Sized> AccessControl<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Whether `user` is a parent of `baby`.
    ///
    /// A baby that does not exist has no parents, so this is `false` rather
    /// than an error.
    pub fn authorize(&self, user: &UserId, baby: &BabyId) -> Result<bool, StoreError> {
        self.store.is_parent(baby, user)
    }

    /// Loads `baby` and checks that `user` is one of its parents.
    pub fn require_parent(&self, user: &UserId, baby: &BabyId) -> Result<Baby, TrackerError> {
        let record = self
            .store
            .get_baby(baby)?
            .ok_or_else(|| TrackerError::not_found("baby", baby))?;
        if !self.authorize(user, baby)? {
            tracing::warn!(%user, %baby, "access denied");
            return Err(TrackerError::Unauthorized {
                user: user.clone(),
                baby: baby.clone(),
            });
        }
        Ok(record)
    }

    /// Resolves a share token to the baby it grants access to.
    ///
    /// Empty and unknown tokens are `NotFound`. The empty token never reaches
    /// the store.
    pub fn resolve_share_token(&self, token: &str) -> Result<BabyId, TrackerError> {
        self.shared_baby(token).map(|baby| baby.id)
    }

    /// Loads the baby a share token grants access to.
    pub fn shared_baby(&self, token: &str) -> Result<Baby, TrackerError> {
        let Ok(token) = ShareToken::new(token.trim()) else {
            return Err(TrackerError::not_found("share token", "<empty>"));
        };
        self.store
            .find_baby_by_share_token(&token)?
            .ok_or_else(|| TrackerError::not_found("share token", "<redacted>"))
    }

    /// Adds `user` to the parents of `baby`.
    pub fn add_parent(&self, baby: &BabyId, user: &UserId) -> Result<(), TrackerError> {
        if self.store.get_baby(baby)?.is_none() {
            return Err(TrackerError::not_found("baby", baby));
        }
        if self.store.get_user(user)?.is_none() {
            return Err(TrackerError::not_found("user", user));
        }
        if !self.store.insert_parent(baby, user)? {
            return Err(TrackerError::AlreadyParent {
                user: user.clone(),
                baby: baby.clone(),
            });
        }
        tracing::debug!(%baby, %user, "parent added");
        Ok(())
    }

    /// Returns the baby's share token, creating one if it has none.
    ///
    /// An existing token is never rotated, so links already handed out keep
    /// working.
    pub fn issue_share_token(&self, baby: &BabyId) -> Result<ShareToken, TrackerError> {
        let record = self
            .store
            .get_baby(baby)?
            .ok_or_else(|| TrackerError::not_found("baby", baby))?;
        if let Some(token) = record.share_token {
            return Ok(token);
        }

        let candidate = ShareToken::generate();
        if self.store.set_share_token_if_absent(baby, &candidate)? {
            tracing::info!(%baby, "share token issued");
            return Ok(candidate);
        }

        // Lost a race with another issuer (or the baby vanished): report
        // whatever token is stored now.
        self.store
            .get_baby(baby)?
            .and_then(|record| record.share_token)
            .ok_or_else(|| TrackerError::not_found("baby", baby))
    }

    /// Clears the baby's share token; the old token stops resolving.
    pub fn revoke_share_token(&self, baby: &BabyId) -> Result<(), TrackerError> {
        if !self.store.clear_share_token(baby)? {
            return Err(TrackerError::not_found("baby", baby));
        }
        tracing::info!(%baby, "share token revoked");
        Ok(())
    }
}
