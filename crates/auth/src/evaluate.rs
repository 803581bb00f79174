//! Permission Evaluator.
//!
//! - No IO
//! - No panics
//! - Safe on an empty set (everything is simply denied)

use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionSet};

/// Membership test.
pub fn has(granted: &PermissionSet, key: &Permission) -> bool {
    granted.contains(key)
}

/// True iff at least one key is granted. An empty `keys` is never satisfied.
pub fn has_any(granted: &PermissionSet, keys: &[Permission]) -> bool {
    keys.iter().any(|k| granted.contains(k))
}

/// True iff every key is granted. An empty `keys` is vacuously satisfied.
pub fn has_all(granted: &PermissionSet, keys: &[Permission]) -> bool {
    keys.iter().all(|k| granted.contains(k))
}

impl PermissionSet {
    pub fn has(&self, key: &Permission) -> bool {
        has(self, key)
    }

    pub fn has_any(&self, keys: &[Permission]) -> bool {
        has_any(self, keys)
    }

    pub fn has_all(&self, keys: &[Permission]) -> bool {
        has_all(self, keys)
    }
}

/// An explicit permission requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "permissions", rename_all = "snake_case")]
pub enum Requirement {
    Single(Permission),
    Any(Vec<Permission>),
    All(Vec<Permission>),
}

impl Requirement {
    /// A list requirement; `require_all` selects AND over OR.
    pub fn list(permissions: impl Into<Vec<Permission>>, require_all: bool) -> Self {
        let permissions = permissions.into();
        if require_all {
            Self::All(permissions)
        } else {
            Self::Any(permissions)
        }
    }

    pub fn keys(&self) -> &[Permission] {
        match self {
            Self::Single(p) => std::slice::from_ref(p),
            Self::Any(ps) | Self::All(ps) => ps,
        }
    }

    pub fn is_satisfied_by(&self, granted: &PermissionSet) -> bool {
        match self {
            Self::Single(p) => has(granted, p),
            Self::Any(ps) => has_any(granted, ps),
            Self::All(ps) => has_all(granted, ps),
        }
    }
}

impl From<Permission> for Requirement {
    fn from(value: Permission) -> Self {
        Self::Single(value)
    }
}
