//! Leptos bindings for the gate and the route guard.
//!
//! Call [`provide_access`] once near the root of the app with a signal fed
//! from the session store; the components below read it from context.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::*;
use leptos_router::*;

use kitchenhub_auth::{Permission, Registry};
use kitchenhub_session::SessionState;

use crate::gate::{GateDecision, GateProps, decide};
use crate::guard::{Destinations, GuardOutcome, GuardRequest, ProtectedRouteProps, RouteGuard};

#[derive(Clone, Copy)]
pub struct AccessContext {
    pub session: Signal<SessionState>,
    pub registry: &'static Registry,
}

/// Make the session signal and redirect destinations available to
/// `PermissionGate` and `ProtectedRoute`.
pub fn provide_access(session: impl Into<Signal<SessionState>>, destinations: Destinations) {
    provide_context(AccessContext {
        session: session.into(),
        registry: Registry::standard(),
    });
    provide_context(destinations);
}

/// Render children only when the current identity may see them.
#[component]
pub fn PermissionGate(
    #[prop(optional, into)] permission: Option<Permission>,
    #[prop(optional)] permissions: Option<Vec<Permission>>,
    #[prop(optional)] require_all: bool,
    #[prop(optional, into)] module: Option<String>,
    #[prop(optional, into)] action: Option<String>,
    #[prop(optional, into)] fallback: ViewFn,
    #[prop(optional, into)] loading: ViewFn,
    children: ChildrenFn,
) -> impl IntoView {
    let ctx = expect_context::<AccessContext>();
    let props = GateProps {
        permission,
        permissions,
        require_all,
        module,
        action,
    };

    move || match ctx.session.with(|s| decide(ctx.registry, s, &props)) {
        GateDecision::Loading => loading.run(),
        GateDecision::Allowed => children().into_view(),
        GateDecision::Denied => fallback.run(),
    }
}

/// Guard a routed page. `check_route` also applies the registry's route map
/// to the current path.
#[component]
pub fn ProtectedRoute(
    #[prop(optional, into)] permission: Option<Permission>,
    #[prop(optional)] permissions: Option<Vec<Permission>>,
    #[prop(optional)] require_all: bool,
    #[prop(optional)] check_route: bool,
    #[prop(optional, into)] loading: ViewFn,
    children: ChildrenFn,
) -> impl IntoView {
    let ctx = expect_context::<AccessContext>();
    let destinations = use_context::<Destinations>().unwrap_or_default();
    let location = use_location();

    let props = ProtectedRouteProps {
        permission,
        permissions,
        require_all,
        check_route,
    };

    // Restarted whenever the location changes.
    let guard = Rc::new(RefCell::new(RouteGuard::new(
        ctx.registry,
        GuardRequest::default(),
    )));

    move || {
        let request = props.request(&location.pathname.get(), &location.search.get());
        let mut guard = guard.borrow_mut();
        guard.follow(request);

        match ctx.session.with(|s| guard.evaluate(s)) {
            GuardOutcome::Loading => loading.run(),
            GuardOutcome::Render => children().into_view(),
            GuardOutcome::Redirect { redirect } => {
                let url = destinations.url_for(&redirect);
                view! { <Redirect path=url/> }.into_view()
            }
        }
    }
}
