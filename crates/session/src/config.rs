use std::time::Duration;

/// Session store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often the reconciler re-reads the identity store.
    pub reconcile_interval: Duration,
    /// Maximum age of permissions kept after a failed refresh.
    ///
    /// `None` keeps stale permissions indefinitely.
    pub stale_permissions_ttl: Option<chrono::Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(1),
            stale_permissions_ttl: None,
        }
    }
}

impl SessionConfig {
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    pub fn with_stale_permissions_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.stale_permissions_ttl = Some(ttl);
        self
    }
}
