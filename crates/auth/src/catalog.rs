//! Static permission catalog for the admin console.
//!
//! Every key the console knows about is declared here once. Route, module and
//! navigation tables in [`crate::registry`] refer to these constants only.

use crate::Permission;

pub const DASHBOARD_VIEW: Permission = Permission::from_static("admin.dashboard.view");

pub const KITCHEN_VIEW: Permission = Permission::from_static("admin.kitchen.view");
pub const KITCHEN_CREATE: Permission = Permission::from_static("admin.kitchen.create");
pub const KITCHEN_EDIT: Permission = Permission::from_static("admin.kitchen.edit");
pub const KITCHEN_DELETE: Permission = Permission::from_static("admin.kitchen.delete");

pub const ORDER_VIEW: Permission = Permission::from_static("admin.order.view");
pub const ORDER_CREATE: Permission = Permission::from_static("admin.order.create");
pub const ORDER_EDIT: Permission = Permission::from_static("admin.order.edit");
pub const ORDER_DELETE: Permission = Permission::from_static("admin.order.delete");
pub const ORDER_EXPORT: Permission = Permission::from_static("admin.order.export");

pub const CUSTOMER_VIEW: Permission = Permission::from_static("admin.customer.view");
pub const CUSTOMER_CREATE: Permission = Permission::from_static("admin.customer.create");
pub const CUSTOMER_EDIT: Permission = Permission::from_static("admin.customer.edit");
pub const CUSTOMER_DELETE: Permission = Permission::from_static("admin.customer.delete");

pub const MENU_VIEW: Permission = Permission::from_static("admin.menu.view");
pub const MENU_CREATE: Permission = Permission::from_static("admin.menu.create");
pub const MENU_EDIT: Permission = Permission::from_static("admin.menu.edit");
pub const MENU_DELETE: Permission = Permission::from_static("admin.menu.delete");

pub const REPORT_VIEW: Permission = Permission::from_static("admin.report.view");
pub const REPORT_EXPORT: Permission = Permission::from_static("admin.report.export");

pub const USER_VIEW: Permission = Permission::from_static("admin.user.view");
pub const USER_CREATE: Permission = Permission::from_static("admin.user.create");
pub const USER_EDIT: Permission = Permission::from_static("admin.user.edit");
pub const USER_DELETE: Permission = Permission::from_static("admin.user.delete");

pub const ROLE_VIEW: Permission = Permission::from_static("admin.role.view");
pub const ROLE_MANAGE: Permission = Permission::from_static("admin.role.manage");

pub const SETTINGS_VIEW: Permission = Permission::from_static("admin.settings.view");
pub const SETTINGS_EDIT: Permission = Permission::from_static("admin.settings.edit");

/// Every catalog key.
pub const ALL: &[Permission] = &[
    DASHBOARD_VIEW,
    KITCHEN_VIEW,
    KITCHEN_CREATE,
    KITCHEN_EDIT,
    KITCHEN_DELETE,
    ORDER_VIEW,
    ORDER_CREATE,
    ORDER_EDIT,
    ORDER_DELETE,
    ORDER_EXPORT,
    CUSTOMER_VIEW,
    CUSTOMER_CREATE,
    CUSTOMER_EDIT,
    CUSTOMER_DELETE,
    MENU_VIEW,
    MENU_CREATE,
    MENU_EDIT,
    MENU_DELETE,
    REPORT_VIEW,
    REPORT_EXPORT,
    USER_VIEW,
    USER_CREATE,
    USER_EDIT,
    USER_DELETE,
    ROLE_VIEW,
    ROLE_MANAGE,
    SETTINGS_VIEW,
    SETTINGS_EDIT,
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let unique: HashSet<&str> = ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn catalog_keys_are_three_segment_admin_keys() {
        for p in ALL {
            assert_eq!(p.domain(), Some("admin"), "{p}");
            assert_eq!(p.as_str().split('.').count(), 3, "{p}");
        }
    }
}
