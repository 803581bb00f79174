//! Access Gate: declarative "should this render?" decisions.
//!
//! The gate is stateless. Callers re-run it whenever the session state
//! changes; it never caches a decision.

use serde::Serialize;
use tracing::debug;

use kitchenhub_auth::{Permission, PermissionSet, Registry, has, has_all, has_any};
use kitchenhub_session::SessionState;

/// Gate inputs. At most one mode is used, see [`GateProps::request`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateProps {
    pub permission: Option<Permission>,
    pub permissions: Option<Vec<Permission>>,
    pub require_all: bool,
    pub module: Option<String>,
    pub action: Option<String>,
}

impl GateProps {
    pub fn permission(permission: Permission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    pub fn any_of(permissions: impl Into<Vec<Permission>>) -> Self {
        Self {
            permissions: Some(permissions.into()),
            ..Self::default()
        }
    }

    pub fn all_of(permissions: impl Into<Vec<Permission>>) -> Self {
        Self {
            permissions: Some(permissions.into()),
            require_all: true,
            ..Self::default()
        }
    }

    pub fn module_action(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// The input mode in effect, by precedence: module+action, single
    /// permission, permission list, nothing. A lone module or action does not
    /// select the module/action mode.
    pub fn request(&self) -> AccessRequest<'_> {
        if let (Some(module), Some(action)) = (&self.module, &self.action) {
            return AccessRequest::ModuleAction { module, action };
        }
        if let Some(permission) = &self.permission {
            return AccessRequest::Single(permission);
        }
        if let Some(permissions) = &self.permissions {
            return AccessRequest::List {
                permissions,
                require_all: self.require_all,
            };
        }
        AccessRequest::Unspecified
    }
}

/// Resolved gate input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequest<'a> {
    ModuleAction { module: &'a str, action: &'a str },
    Single(&'a Permission),
    List { permissions: &'a [Permission], require_all: bool },
    Unspecified,
}

impl AccessRequest<'_> {
    /// Evaluate against a granted set. Unresolvable or empty requests deny.
    pub fn is_allowed(&self, registry: &Registry, granted: &PermissionSet) -> bool {
        match *self {
            AccessRequest::ModuleAction { module, action } => registry
                .resolve(module, action)
                .is_some_and(|p| has(granted, p)),
            AccessRequest::Single(p) => has(granted, p),
            AccessRequest::List {
                permissions,
                require_all: true,
            } => has_all(granted, permissions),
            AccessRequest::List {
                permissions,
                require_all: false,
            } => has_any(granted, permissions),
            AccessRequest::Unspecified => false,
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    /// Permissions not loaded yet; neither allowed nor denied.
    Loading,
    Allowed,
    Denied,
}

impl GateDecision {
    /// Whether an action guarded by this decision should be enabled.
    pub fn is_enabled(self) -> bool {
        self == GateDecision::Allowed
    }
}

/// Decide for the given session state.
pub fn decide(registry: &Registry, session: &SessionState, props: &GateProps) -> GateDecision {
    if !session.is_loaded {
        return GateDecision::Loading;
    }

    let request = props.request();
    if request.is_allowed(registry, session.granted()) {
        GateDecision::Allowed
    } else {
        debug!(?request, "gate denied");
        GateDecision::Denied
    }
}

/// A gate with optional fallback and loading substitutes.
#[derive(Debug, Clone)]
pub struct Gate<T> {
    props: GateProps,
    fallback: Option<T>,
    loading: Option<T>,
}

impl<T> Gate<T> {
    pub fn new(props: GateProps) -> Self {
        Self {
            props,
            fallback: None,
            loading: None,
        }
    }

    /// Rendered when access is denied (default: nothing).
    pub fn fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Rendered while permissions are loading (default: nothing).
    pub fn loading(mut self, loading: T) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn props(&self) -> &GateProps {
        &self.props
    }

    /// Produce the content, fallback or loading substitute for `session`.
    ///
    /// `content` is only invoked when access is allowed.
    pub fn render(
        self,
        registry: &Registry,
        session: &SessionState,
        content: impl FnOnce() -> T,
    ) -> Option<T> {
        match decide(registry, session, &self.props) {
            GateDecision::Loading => self.loading,
            GateDecision::Allowed => Some(content()),
            GateDecision::Denied => self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchenhub_auth::catalog::*;

    fn loaded(keys: &[Permission]) -> SessionState {
        SessionState {
            permissions: keys.iter().cloned().collect(),
            is_loaded: true,
            identity_checked: true,
            ..SessionState::empty()
        }
    }

    fn registry() -> &'static Registry {
        Registry::standard()
    }

    #[test]
    fn unloaded_session_renders_loading_substitute() {
        let session = SessionState {
            permissions: [KITCHEN_VIEW].into_iter().collect(),
            is_loading: true,
            ..SessionState::empty()
        };

        for props in [
            GateProps::permission(KITCHEN_VIEW),
            GateProps::module_action("kitchen", "view"),
            GateProps::default(),
        ] {
            let out = Gate::new(props)
                .loading("spinner")
                .fallback("no")
                .render(registry(), &session, || "yes");
            assert_eq!(out, Some("spinner"));
        }
    }

    #[test]
    fn unloaded_session_without_loading_substitute_renders_nothing() {
        let out = Gate::new(GateProps::permission(KITCHEN_VIEW)).render(
            registry(),
            &SessionState::empty(),
            || "yes",
        );
        assert_eq!(out, None);
    }

    #[test]
    fn module_action_resolves_through_registry() {
        let session = loaded(&[KITCHEN_EDIT]);
        let out = Gate::new(GateProps::module_action("kitchen", "edit"))
            .render(registry(), &session, || "edit form");
        assert_eq!(out, Some("edit form"));

        let upper = decide(registry(), &session, &GateProps::module_action("kitchen", "EDIT"));
        assert_eq!(upper, GateDecision::Allowed);
    }

    #[test]
    fn unresolved_module_action_is_denied() {
        let session = loaded(&[KITCHEN_EDIT]);
        let out = Gate::new(GateProps::module_action("kitchen", "teleport"))
            .fallback("hidden")
            .render(registry(), &session, || "shown");
        assert_eq!(out, Some("hidden"));
    }

    #[test]
    fn module_action_takes_precedence_over_permission() {
        let session = loaded(&[ORDER_VIEW]);
        let props = GateProps {
            permission: Some(ORDER_VIEW),
            ..GateProps::module_action("kitchen", "view")
        };
        assert_eq!(decide(registry(), &session, &props), GateDecision::Denied);
    }

    #[test]
    fn partial_module_action_falls_through() {
        let session = loaded(&[ORDER_VIEW]);
        let props = GateProps {
            module: Some("kitchen".to_string()),
            ..GateProps::permission(ORDER_VIEW)
        };
        assert!(matches!(props.request(), AccessRequest::Single(_)));
        assert_eq!(decide(registry(), &session, &props), GateDecision::Allowed);
    }

    #[test]
    fn single_permission_beats_list() {
        let session = loaded(&[MENU_VIEW]);
        let props = GateProps {
            permission: Some(MENU_EDIT),
            ..GateProps::any_of(vec![MENU_VIEW])
        };
        assert_eq!(decide(registry(), &session, &props), GateDecision::Denied);
    }

    #[test]
    fn list_honours_require_all() {
        let session = loaded(&[USER_VIEW]);
        let keys = vec![USER_VIEW, USER_EDIT];
        assert!(decide(registry(), &session, &GateProps::any_of(keys.clone())).is_enabled());
        assert!(!decide(registry(), &session, &GateProps::all_of(keys)).is_enabled());
        assert_eq!(
            decide(registry(), &session, &GateProps::any_of(Vec::new())),
            GateDecision::Denied
        );
        assert_eq!(
            decide(registry(), &session, &GateProps::all_of(Vec::new())),
            GateDecision::Allowed
        );
    }

    #[test]
    fn no_input_fails_closed() {
        let session = loaded(&[USER_VIEW]);
        let out = Gate::new(GateProps::default()).render(registry(), &session, || "secret");
        assert_eq!(out, None);
    }

    #[test]
    fn content_is_not_built_when_denied() {
        let session = loaded(&[]);
        let mut built = false;
        let _ = Gate::new(GateProps::permission(ROLE_MANAGE)).render(registry(), &session, || {
            built = true;
        });
        assert!(!built);
    }
}
