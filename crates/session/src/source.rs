//! External collaborators: the identity store and the permission source.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kitchenhub_auth::{IdentityId, IdentityRecord, PermissionRecord, PermissionSet};

use crate::FetchError;

/// Read access to the external identity store.
#[async_trait]
pub trait IdentitySource: Send + Sync + 'static {
    /// The current identity record; `None` means no active identity.
    async fn read_identity(&self) -> Option<IdentityRecord>;
}

/// Asynchronous permission lookup keyed by identity id.
#[async_trait]
pub trait PermissionSource: Send + Sync + 'static {
    async fn fetch_permissions(&self, id: &IdentityId) -> Result<PermissionResponse, FetchError>;
}

#[async_trait]
impl<S> IdentitySource for Arc<S>
where
    S: IdentitySource + ?Sized,
{
    async fn read_identity(&self) -> Option<IdentityRecord> {
        (**self).read_identity().await
    }
}

#[async_trait]
impl<S> PermissionSource for Arc<S>
where
    S: PermissionSource + ?Sized,
{
    async fn fetch_permissions(&self, id: &IdentityId) -> Result<PermissionResponse, FetchError> {
        (**self).fetch_permissions(id).await
    }
}

/// Response envelope of the permission source: `{ "data": { "permissions": [...] } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub data: PermissionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionPayload {
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
}

impl PermissionResponse {
    pub fn new(permissions: Vec<PermissionRecord>) -> Self {
        Self {
            data: PermissionPayload { permissions },
        }
    }

    pub fn into_set(self) -> PermissionSet {
        PermissionSet::from(self.data.permissions)
    }
}

/// In-memory identity store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentitySource {
    inner: RwLock<Option<IdentityRecord>>,
}

impl InMemoryIdentitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(record: IdentityRecord) -> Self {
        Self {
            inner: RwLock::new(Some(record)),
        }
    }

    pub fn set(&self, record: IdentityRecord) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(record);
        }
    }

    pub fn remove(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }
}

#[async_trait]
impl IdentitySource for InMemoryIdentitySource {
    async fn read_identity(&self) -> Option<IdentityRecord> {
        self.inner.read().ok()?.clone()
    }
}

/// In-memory permission source for tests/dev.
///
/// Unknown identities answer with a 404 status error.
#[derive(Debug, Default)]
pub struct InMemoryPermissionSource {
    grants: RwLock<HashMap<IdentityId, Result<Vec<PermissionRecord>, FetchError>>>,
}

impl InMemoryPermissionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, id: impl Into<IdentityId>, records: Vec<PermissionRecord>) {
        if let Ok(mut map) = self.grants.write() {
            map.insert(id.into(), Ok(records));
        }
    }

    /// Make every fetch for `id` fail with `error` until granted again.
    pub fn fail(&self, id: impl Into<IdentityId>, error: FetchError) {
        if let Ok(mut map) = self.grants.write() {
            map.insert(id.into(), Err(error));
        }
    }
}

#[async_trait]
impl PermissionSource for InMemoryPermissionSource {
    async fn fetch_permissions(&self, id: &IdentityId) -> Result<PermissionResponse, FetchError> {
        let map = self
            .grants
            .read()
            .map_err(|_| FetchError::network("permission map poisoned"))?;

        match map.get(id) {
            Some(Ok(records)) => Ok(PermissionResponse::new(records.clone())),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::status(404, format!("unknown identity {id}"))),
        }
    }
}
