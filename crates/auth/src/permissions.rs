use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings following a dotted `domain.module.action`
/// convention (e.g. "admin.kitchen.view"). Nothing here enforces the
/// convention; the segment helpers simply return `None` when a key is shorter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a permission from a static key (usable in `const` items).
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment, e.g. `admin`.
    pub fn domain(&self) -> Option<&str> {
        self.segment(0)
    }

    /// Middle segment(s), e.g. `kitchen` for `admin.kitchen.view`.
    pub fn module(&self) -> Option<&str> {
        let key = self.as_str();
        let start = key.find('.')? + 1;
        let end = key.rfind('.')?;
        (start < end).then(|| &key[start..end])
    }

    /// Last segment, e.g. `view`.
    pub fn action(&self) -> Option<&str> {
        let key = self.as_str();
        key.rfind('.').map(|idx| &key[idx + 1..])
    }

    fn segment(&self, idx: usize) -> Option<&str> {
        self.as_str().split('.').nth(idx).filter(|s| !s.is_empty())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A single grant as delivered by the identity/permission source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub key: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl PermissionRecord {
    pub fn new(key: impl Into<Permission>) -> Self {
        Self {
            key: key.into(),
            metadata: None,
        }
    }
}

/// The set of permissions granted to one identity.
///
/// Built by projecting `key` out of each [`PermissionRecord`]; duplicates
/// collapse and ordering is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashSet<Permission>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PermissionRecord>) -> Self {
        Self(records.into_iter().map(|r| r.key.clone()).collect())
    }

    pub fn contains(&self, key: &Permission) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Keys in lexical order (stable output for logs and display).
    pub fn sorted(&self) -> Vec<&Permission> {
        let mut keys: Vec<&Permission> = self.0.iter().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<PermissionRecord>> for PermissionSet {
    fn from(records: Vec<PermissionRecord>) -> Self {
        Self(records.into_iter().map(|r| r.key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_follow_dotted_convention() {
        let p = Permission::from_static("admin.kitchen.view");
        assert_eq!(p.domain(), Some("admin"));
        assert_eq!(p.module(), Some("kitchen"));
        assert_eq!(p.action(), Some("view"));

        let short = Permission::from_static("dashboard");
        assert_eq!(short.module(), None);
        assert_eq!(short.action(), None);
    }

    #[test]
    fn duplicate_records_collapse() {
        let records = vec![
            PermissionRecord::new("admin.kitchen.view"),
            PermissionRecord::new("admin.kitchen.view"),
            PermissionRecord::new("admin.order.view"),
        ];
        let set = PermissionSet::from_records(&records);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Permission::from_static("admin.order.view")));
    }

    #[test]
    fn record_deserializes_without_metadata() {
        let rec: PermissionRecord =
            serde_json::from_str(r#"{"key":"admin.menu.edit"}"#).unwrap();
        assert_eq!(rec.key.as_str(), "admin.menu.edit");
        assert!(rec.metadata.is_none());

        let rec: PermissionRecord =
            serde_json::from_str(r#"{"key":"admin.menu.edit","metadata":{"scope":"all"}}"#).unwrap();
        assert_eq!(rec.metadata.unwrap()["scope"], "all");
    }
}
