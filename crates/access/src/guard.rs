//! Route Guard: protects a navigable destination.
//!
//! A [`RouteGuard`] runs a small state machine per navigation attempt:
//!
//! ```text
//! CheckingIdentity ──(no identity)──────────────▶ Unauthenticated ─▶ redirect to login
//!        │
//!        └──(identity, permissions settled)─────▶ CheckingPermission ─┬▶ Authorized ─▶ render
//!                                                                     └▶ Denied ─────▶ redirect to unauthorized
//! ```
//!
//! `Authorized`, `Denied` and `Unauthenticated` are terminal until
//! [`RouteGuard::navigate`] starts a new attempt.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kitchenhub_auth::{AuthzError, Permission, PermissionSet, Registry, Requirement, authorize};
use kitchenhub_session::SessionState;

/// Guard progress for the current navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    CheckingIdentity,
    Unauthenticated,
    CheckingPermission,
    Authorized,
    Denied,
}

impl GuardState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GuardState::Unauthenticated | GuardState::Authorized | GuardState::Denied
        )
    }
}

/// Where the guard sends the user instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum Redirect {
    /// Login, carrying the originally requested location.
    Login { return_to: String },
    Unauthorized,
}

/// What the host should do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    Loading,
    Render,
    Redirect { redirect: Redirect },
}

impl GuardOutcome {
    fn redirect(redirect: Redirect) -> Self {
        GuardOutcome::Redirect { redirect }
    }
}

/// One navigation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardRequest {
    /// Requested location, including any query string.
    pub location: String,
    /// Route name (or path) to look up in the registry's route map.
    pub route: Option<String>,
    /// Explicit requirement on top of the route map.
    pub requirement: Option<Requirement>,
}

impl GuardRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Check the location itself against the route map.
    pub fn for_path(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            route: Some(location.clone()),
            location,
            requirement: None,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }
}

/// Options of a protected page, as the UI layer receives them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedRouteProps {
    pub permission: Option<Permission>,
    pub permissions: Option<Vec<Permission>>,
    pub require_all: bool,
    /// Also apply the registry's route map to the page's path.
    pub check_route: bool,
}

impl ProtectedRouteProps {
    /// Explicit requirement. A single `permission` wins over the list.
    pub fn requirement(&self) -> Option<Requirement> {
        match (&self.permission, &self.permissions) {
            (Some(p), _) => Some(Requirement::Single(p.clone())),
            (None, Some(ps)) => Some(Requirement::list(ps.clone(), self.require_all)),
            (None, None) => None,
        }
    }

    /// Navigation attempt for the page at `path` with query string `search`.
    pub fn request(&self, path: &str, search: &str) -> GuardRequest {
        let mut request = GuardRequest::new(compose_location(path, search));
        if self.check_route {
            request = request.with_route(path);
        }
        if let Some(requirement) = self.requirement() {
            request = request.with_requirement(requirement);
        }
        request
    }
}

/// `path` followed by `?search` when there is a query string. A leading `?` on
/// `search` is accepted.
pub fn compose_location(path: &str, search: &str) -> String {
    match search.trim_start_matches('?') {
        "" => path.to_string(),
        query => format!("{path}?{query}"),
    }
}

/// Login and unauthorized destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    pub login_path: String,
    pub unauthorized_path: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
        }
    }
}

impl Destinations {
    /// Concrete URL for a redirect. The login URL carries `returnTo`.
    pub fn url_for(&self, redirect: &Redirect) -> String {
        match redirect {
            Redirect::Login { return_to } => {
                format!("{}?returnTo={}", self.login_path, urlencoding::encode(return_to))
            }
            Redirect::Unauthorized => self.unauthorized_path.clone(),
        }
    }
}

/// Per-navigation guard state machine.
#[derive(Debug, Clone)]
pub struct RouteGuard<'r> {
    registry: &'r Registry,
    request: GuardRequest,
    state: GuardState,
}

impl<'r> RouteGuard<'r> {
    pub fn new(registry: &'r Registry, request: GuardRequest) -> Self {
        Self {
            registry,
            request,
            state: GuardState::CheckingIdentity,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn request(&self) -> &GuardRequest {
        &self.request
    }

    /// Start a new navigation attempt.
    pub fn navigate(&mut self, request: GuardRequest) {
        debug!(location = %request.location, "guard restarted");
        self.request = request;
        self.state = GuardState::CheckingIdentity;
    }

    /// Start a new attempt only if `request` differs from the current one.
    /// Returns whether the guard restarted.
    pub fn follow(&mut self, request: GuardRequest) -> bool {
        if self.request == request {
            return false;
        }
        self.navigate(request);
        true
    }

    /// Advance with the current session state and report what to do.
    pub fn evaluate(&mut self, session: &SessionState) -> GuardOutcome {
        loop {
            match self.state {
                GuardState::CheckingIdentity => {
                    if !session.identity_checked {
                        return GuardOutcome::Loading;
                    }
                    if session.identity_id.is_none() {
                        self.state = GuardState::Unauthenticated;
                        continue;
                    }
                    // An errored, never-loaded session falls through and is
                    // checked against the empty set.
                    if session.is_loading || (!session.is_loaded && session.error.is_none()) {
                        return GuardOutcome::Loading;
                    }
                    self.state = GuardState::CheckingPermission;
                }
                GuardState::CheckingPermission => {
                    self.state = match self.check(session.granted()) {
                        Ok(()) => GuardState::Authorized,
                        Err(err) => {
                            info!(location = %self.request.location, error = %err, "navigation denied");
                            GuardState::Denied
                        }
                    };
                }
                GuardState::Unauthenticated => {
                    return GuardOutcome::redirect(Redirect::Login {
                        return_to: self.request.location.clone(),
                    });
                }
                GuardState::Authorized => return GuardOutcome::Render,
                GuardState::Denied => return GuardOutcome::redirect(Redirect::Unauthorized),
            }
        }
    }

    /// Route map check (OR semantics) followed by the explicit requirement.
    fn check(&self, granted: &PermissionSet) -> Result<(), AuthzError> {
        if let Some(route) = &self.request.route {
            let required = self.registry.permissions_of(route);
            if !required.is_empty() {
                authorize(granted, &Requirement::Any(required.to_vec()))?;
            }
        }
        if let Some(requirement) = &self.request.requirement {
            authorize(granted, requirement)?;
        }
        Ok(())
    }
}
