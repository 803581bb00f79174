use serde::{Deserialize, Deserializer, Serialize};

use crate::{PermissionRecord, PermissionSet};

/// Identity of an authenticated console user.
///
/// The identity store hands out opaque ids (numeric or UUID-shaped, depending
/// on the backend); they are kept verbatim. Numeric ids are accepted on the
/// wire and stored in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IdentityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl<'de> Deserialize<'de> for IdentityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireId::deserialize(deserializer)? {
            WireId::Text(s) => Self(s),
            WireId::Number(n) => Self(n.to_string()),
        })
    }
}

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The identity record kept by the external identity store.
///
/// `fetchedPermissions` is present when the login flow already resolved the
/// grants; otherwise they must be fetched by id. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    #[serde(
        rename = "fetchedPermissions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_permissions: Option<Vec<PermissionRecord>>,
}

impl IdentityRecord {
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            fetched_permissions: None,
        }
    }

    pub fn with_permissions(mut self, records: Vec<PermissionRecord>) -> Self {
        self.fetched_permissions = Some(records);
        self
    }

    /// Pre-attached grants, if the record carries any.
    pub fn prefetched(&self) -> Option<PermissionSet> {
        self.fetched_permissions
            .as_ref()
            .map(|records| PermissionSet::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_permissions_deserializes() {
        let rec: IdentityRecord =
            serde_json::from_str(r#"{"id":"42","name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(rec.id.as_str(), "42");
        assert!(rec.prefetched().is_none());
    }

    #[test]
    fn numeric_id_is_kept_in_decimal_form() {
        let rec: IdentityRecord = serde_json::from_str(r#"{"id":1001}"#).unwrap();
        assert_eq!(rec.id, IdentityId::new("1001"));
    }

    #[test]
    fn record_with_prefetched_permissions() {
        let rec: IdentityRecord = serde_json::from_str(
            r#"{"id":"7","fetchedPermissions":[{"key":"admin.kitchen.view"},{"key":"admin.kitchen.view"}]}"#,
        )
        .unwrap();
        let granted = rec.prefetched().unwrap();
        assert_eq!(granted.len(), 1);
    }

    #[test]
    fn empty_prefetched_list_is_still_prefetched() {
        let rec = IdentityRecord::new("7").with_permissions(vec![]);
        assert!(rec.prefetched().unwrap().is_empty());
    }
}
