//! JSON access report printed by the console.

use serde::Serialize;

use kitchenhub_access::{Destinations, GuardOutcome, GuardRequest, RouteGuard};
use kitchenhub_auth::{
    AuthorizationExplanation, IdentityId, NavigationItem, Permission, Registry, Requirement,
    explain,
};
use kitchenhub_session::{FetchError, SessionState};

#[derive(Debug, Serialize)]
pub struct AccessReport<'a> {
    pub identity_id: Option<IdentityId>,
    pub is_loaded: bool,
    pub error: Option<FetchError>,
    pub permissions: Vec<Permission>,
    pub navigation: Vec<&'a NavigationItem>,
    pub routes: Vec<RouteReport>,
}

#[derive(Debug, Serialize)]
pub struct RouteReport {
    pub path: String,
    pub outcome: GuardOutcome,
    /// Redirect target, when the guard redirects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Why the route map allowed or denied the path (mapped routes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<AuthorizationExplanation>,
}

/// Evaluate navigation and each of `paths` against `session`.
pub fn build<'a>(
    registry: &'a Registry,
    destinations: &Destinations,
    session: &SessionState,
    paths: &[String],
) -> AccessReport<'a> {
    let granted = session.granted();

    let routes = paths
        .iter()
        .map(|path| {
            let mut guard = RouteGuard::new(registry, GuardRequest::for_path(path.as_str()));
            let outcome = guard.evaluate(session);
            let redirect_url = match &outcome {
                GuardOutcome::Redirect { redirect } => Some(destinations.url_for(redirect)),
                _ => None,
            };

            let required = registry.permissions_of(path);
            let explanation = (!required.is_empty())
                .then(|| explain(granted, &Requirement::Any(required.to_vec())));

            RouteReport {
                path: path.clone(),
                outcome,
                redirect_url,
                explanation,
            }
        })
        .collect();

    AccessReport {
        identity_id: session.identity_id.clone(),
        is_loaded: session.is_loaded,
        error: session.error.clone(),
        permissions: granted.sorted().into_iter().cloned().collect(),
        navigation: registry.accessible_navigation(granted),
        routes,
    }
}
