//! Permission Registry: route, module/action and navigation lookups.
//!
//! The registry is read-only once built. Lookups never fail; a miss is an
//! ordinary answer (`[]` for routes, `None` for module/action pairs).

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use serde::Serialize;
use tracing::warn;

use crate::catalog;
use crate::evaluate::has_any;
use crate::{Permission, PermissionSet};

/// One entry of the side navigation.
///
/// Visible when the identity holds at least one of `required_permissions`;
/// an empty list means always visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationItem {
    pub name: Cow<'static, str>,
    pub path: Cow<'static, str>,
    pub required_permissions: Vec<Permission>,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
struct RoutePattern {
    segments: Vec<String>,
    permissions: Vec<Permission>,
}

impl RoutePattern {
    fn matches(&self, path_segments: &[&str]) -> bool {
        self.segments.len() == path_segments.len()
            && self
                .segments
                .iter()
                .zip(path_segments)
                .all(|(pat, seg)| match pat.strip_prefix(':') {
                    Some(_) => !seg.is_empty(),
                    None => pat == seg,
                })
    }
}

/// Read-only catalog of route, module/action and navigation requirements.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    exact_routes: HashMap<String, Vec<Permission>>,
    pattern_routes: Vec<RoutePattern>,
    modules: HashMap<String, HashMap<String, Permission>>,
    navigation: Vec<NavigationItem>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The registry describing the admin console.
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(build_standard)
    }

    /// Permissions required by a route (any one suffices).
    ///
    /// Exact routes win over `:param` patterns; patterns are tried in
    /// registration order. Unmapped routes return `[]` (open access).
    pub fn permissions_of(&self, route: &str) -> &[Permission] {
        let route = normalize_path(route);
        if let Some(perms) = self.exact_routes.get(route) {
            return perms;
        }

        let segments: Vec<&str> = route.split('/').collect();
        self.pattern_routes
            .iter()
            .find(|p| p.matches(&segments))
            .map(|p| p.permissions.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a module/action pair to its permission key.
    ///
    /// `action` is matched case-insensitively; `module` exactly.
    pub fn resolve(&self, module: &str, action: &str) -> Option<&Permission> {
        self.modules
            .get(module)?
            .get(action.to_lowercase().as_str())
    }

    /// Navigation items visible to `granted`, in declaration order.
    pub fn accessible_navigation(&self, granted: &PermissionSet) -> Vec<&NavigationItem> {
        self.navigation
            .iter()
            .filter(|item| {
                item.required_permissions.is_empty()
                    || has_any(granted, &item.required_permissions)
            })
            .collect()
    }

    pub fn navigation(&self) -> &[NavigationItem] {
        &self.navigation
    }

    /// Every permission key referenced by this registry, with a derived
    /// description and category, sorted by key.
    pub fn definitions(&self) -> Vec<PermissionDefinition> {
        let mut keys: BTreeSet<&Permission> = BTreeSet::new();
        keys.extend(self.modules.values().flat_map(|actions| actions.values()));
        keys.extend(self.exact_routes.values().flatten());
        keys.extend(self.pattern_routes.iter().flat_map(|p| &p.permissions));
        keys.extend(self.navigation.iter().flat_map(|n| &n.required_permissions));

        keys.into_iter()
            .map(|p| PermissionDefinition {
                name: p.as_str().to_string(),
                description: permission_description(p),
                category: p.module().map(str::to_string),
            })
            .collect()
    }
}

/// Incremental construction of a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Map a route (exact path or `:param` pattern) to its required permissions.
    pub fn route(mut self, route: &str, permissions: impl Into<Vec<Permission>>) -> Self {
        let route = normalize_path(route);
        let permissions = permissions.into();
        if route.split('/').any(|s| s.starts_with(':')) {
            self.registry.pattern_routes.push(RoutePattern {
                segments: route.split('/').map(str::to_string).collect(),
                permissions,
            });
        } else if let Some(previous) = self
            .registry
            .exact_routes
            .insert(route.to_string(), permissions)
        {
            warn!(route, ?previous, "route registered twice; keeping the later entry");
        }
        self
    }

    pub fn module_action(mut self, module: &str, action: &str, permission: Permission) -> Self {
        let previous = self
            .registry
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(action.to_lowercase(), permission.clone());
        if let Some(previous) = previous.filter(|p| *p != permission) {
            warn!(module, action, %previous, %permission, "module action remapped");
        }
        self
    }

    pub fn navigation_item(
        mut self,
        name: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
        required_permissions: impl Into<Vec<Permission>>,
    ) -> Self {
        self.registry.navigation.push(NavigationItem {
            name: name.into(),
            path: path.into(),
            required_permissions: required_permissions.into(),
        });
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

/// Strip the query/fragment and any trailing slash (except for the root).
fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

fn build_standard() -> Registry {
    use catalog::*;

    let mut builder = Registry::builder();

    for permission in ALL {
        if let (Some(module), Some(action)) = (permission.module(), permission.action()) {
            builder = builder.module_action(module, action, permission.clone());
        }
    }

    builder
        .route("/profile", Vec::new())
        .route("/dashboard", [DASHBOARD_VIEW])
        .route("/kitchens", [KITCHEN_VIEW])
        .route("/kitchens/new", [KITCHEN_CREATE])
        .route("/kitchens/:id", [KITCHEN_VIEW])
        .route("/kitchens/:id/edit", [KITCHEN_EDIT])
        .route("/orders", [ORDER_VIEW])
        .route("/orders/new", [ORDER_CREATE])
        .route("/orders/:id", [ORDER_VIEW, ORDER_EDIT])
        .route("/customers", [CUSTOMER_VIEW])
        .route("/customers/new", [CUSTOMER_CREATE])
        .route("/customers/:id", [CUSTOMER_VIEW, CUSTOMER_EDIT])
        .route("/menu", [MENU_VIEW])
        .route("/menu/:id/edit", [MENU_EDIT])
        .route("/reports", [REPORT_VIEW, REPORT_EXPORT])
        .route("/users", [USER_VIEW])
        .route("/users/new", [USER_CREATE])
        .route("/users/:id/edit", [USER_EDIT])
        .route("/roles", [ROLE_VIEW, ROLE_MANAGE])
        .route("/settings", [SETTINGS_VIEW, SETTINGS_EDIT])
        .navigation_item("Dashboard", "/dashboard", [DASHBOARD_VIEW])
        .navigation_item("Kitchens", "/kitchens", [KITCHEN_VIEW])
        .navigation_item("Orders", "/orders", [ORDER_VIEW])
        .navigation_item("Customers", "/customers", [CUSTOMER_VIEW])
        .navigation_item("Menu", "/menu", [MENU_VIEW])
        .navigation_item("Reports", "/reports", [REPORT_VIEW, REPORT_EXPORT])
        .navigation_item("Users", "/users", [USER_VIEW])
        .navigation_item("Roles", "/roles", [ROLE_VIEW, ROLE_MANAGE])
        .navigation_item("Settings", "/settings", [SETTINGS_VIEW])
        .navigation_item("Profile", "/profile", Vec::new())
        .build()
}

fn permission_description(perm: &Permission) -> Option<String> {
    let module = perm.module()?;
    let action = perm.action()?;

    let action_desc = match action {
        "view" => "View/list",
        "create" => "Create new",
        "edit" => "Edit existing",
        "delete" => "Delete",
        "export" => "Export",
        "manage" => "Manage",
        other => other,
    };

    Some(format!("{action_desc} {module} records"))
}
