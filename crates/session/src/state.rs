//! Session state and its transitions.
//!
//! Transitions are crate-private; the only writer is [`crate::SessionStore`],
//! which applies each one atomically through its watch channel.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kitchenhub_auth::{IdentityId, PermissionSet};

use crate::FetchError;

/// Cached permission state for the current identity.
///
/// # Invariants
/// - `is_loaded` implies `permissions` came from the latest applied fetch (or
///   adoption) for `identity_id`.
/// - `identity_id` only changes on (re)initialization or clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub permissions: PermissionSet,
    pub is_loaded: bool,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    pub identity_id: Option<IdentityId>,
    /// When `permissions` were obtained.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Whether the identity store has been consulted since process start.
    pub identity_checked: bool,
}

impl SessionState {
    /// Process-start state: nothing known, identity not yet checked.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Permissions usable for decisions (empty until something is loaded).
    pub fn granted(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Whether this state still describes some identity.
    pub fn believes_identity(&self) -> bool {
        !self.permissions.is_empty() || self.is_loaded || self.identity_id.is_some()
    }

    pub(crate) fn cleared() -> Self {
        Self {
            identity_checked: true,
            ..Self::default()
        }
    }

    pub(crate) fn adopted(id: IdentityId, permissions: PermissionSet, now: DateTime<Utc>) -> Self {
        Self {
            permissions,
            is_loaded: true,
            is_loading: false,
            error: None,
            identity_id: Some(id),
            loaded_at: Some(now),
            identity_checked: true,
        }
    }

    /// Start loading for `id`. Permissions survive only if `id` is unchanged.
    pub(crate) fn begin_loading(&mut self, id: IdentityId) {
        if self.identity_id.as_ref() != Some(&id) {
            *self = Self {
                identity_id: Some(id),
                ..Self::cleared()
            };
        }
        self.identity_checked = true;
        self.is_loading = true;
    }

    pub(crate) fn apply_fetch_success(&mut self, permissions: PermissionSet, now: DateTime<Utc>) {
        self.permissions = permissions;
        self.is_loaded = true;
        self.is_loading = false;
        self.error = None;
        self.loaded_at = Some(now);
    }

    /// Record a failure, keeping loaded permissions unless they outlived `ttl`.
    pub(crate) fn apply_fetch_failure(
        &mut self,
        error: FetchError,
        now: DateTime<Utc>,
        ttl: Option<chrono::Duration>,
    ) {
        self.error = Some(error);
        self.is_loading = false;

        let expired = match (ttl, self.loaded_at) {
            (Some(ttl), Some(loaded_at)) => now - loaded_at >= ttl,
            _ => false,
        };
        if expired {
            self.permissions = PermissionSet::empty();
            self.is_loaded = false;
            self.loaded_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use kitchenhub_auth::catalog;

    fn loaded(id: &str) -> SessionState {
        SessionState::adopted(
            IdentityId::new(id),
            [catalog::KITCHEN_VIEW].into_iter().collect(),
            Utc::now(),
        )
    }

    #[test]
    fn empty_state_believes_nothing() {
        let state = SessionState::empty();
        assert!(!state.believes_identity());
        assert!(!state.identity_checked);
        assert!(state.granted().is_empty());
    }

    #[test]
    fn begin_loading_same_identity_keeps_permissions() {
        let mut state = loaded("a");
        state.begin_loading(IdentityId::new("a"));
        assert!(state.is_loading);
        assert!(state.is_loaded);
        assert_eq!(state.permissions.len(), 1);
    }

    #[test]
    fn begin_loading_new_identity_drops_permissions() {
        let mut state = loaded("a");
        state.begin_loading(IdentityId::new("b"));
        assert!(state.is_loading);
        assert!(!state.is_loaded);
        assert!(state.permissions.is_empty());
        assert_eq!(state.identity_id, Some(IdentityId::new("b")));
    }

    #[test]
    fn failure_keeps_stale_permissions() {
        let mut state = loaded("a");
        state.begin_loading(IdentityId::new("a"));
        state.apply_fetch_failure(FetchError::network("down"), Utc::now(), None);

        assert!(!state.is_loading);
        assert!(state.is_loaded);
        assert_eq!(state.permissions.len(), 1);
        assert_eq!(state.error, Some(FetchError::network("down")));
    }

    #[test]
    fn failure_past_ttl_drops_permissions() {
        let mut state = loaded("a");
        let later = Utc::now() + Duration::minutes(10);
        state.apply_fetch_failure(FetchError::status(503, "busy"), later, Some(Duration::minutes(5)));

        assert!(!state.is_loaded);
        assert!(state.permissions.is_empty());
        assert_eq!(state.identity_id, Some(IdentityId::new("a")));
    }

    #[test]
    fn failure_within_ttl_keeps_permissions() {
        let mut state = loaded("a");
        let soon = Utc::now() + Duration::seconds(30);
        state.apply_fetch_failure(FetchError::status(503, "busy"), soon, Some(Duration::minutes(5)));
        assert!(state.is_loaded);
    }

    #[test]
    fn success_clears_previous_error() {
        let mut state = loaded("a");
        state.apply_fetch_failure(FetchError::decode("bad json"), Utc::now(), None);
        state.apply_fetch_success([catalog::ORDER_VIEW].into_iter().collect(), Utc::now());
        assert!(state.error.is_none());
        assert!(state.permissions.contains(&catalog::ORDER_VIEW));
        assert!(!state.permissions.contains(&catalog::KITCHEN_VIEW));
    }
}
