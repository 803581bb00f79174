//! Background reconciliation between the session and the identity store.
//!
//! The identity store has no change notifications, so the reconciler polls it.
//! When the record disappears (e.g. another part of the app logged out by
//! writing to the store directly) the session is cleared.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{IdentitySource, PermissionSource, SessionStore};

/// Handle to a running reconciler.
///
/// Dropping the handle stops the loop at its next wake-up; `shutdown` also
/// waits for it to finish.
#[derive(Debug)]
pub struct ReconcilerHandle {
    shutdown: Arc<Notify>,
    join: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    /// Request graceful shutdown and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.shutdown.notify_one();
        }
    }
}

impl<I, P> SessionStore<I, P>
where
    I: IdentitySource,
    P: PermissionSource,
{
    /// One reconciliation pass. Returns `true` if the session was cleared.
    pub async fn reconcile(&self) -> bool {
        let epoch = self.current_epoch();
        if self.inner.identity.read_identity().await.is_some() {
            return false;
        }

        let cleared = self.clear_if_epoch(epoch);
        if cleared {
            info!("identity record vanished; session cleared");
        }
        cleared
    }

    /// Spawn the reconciliation loop on the current tokio runtime.
    ///
    /// The loop holds only a weak reference to the store and exits on its own
    /// once every store handle is dropped.
    pub fn spawn_reconciler(&self) -> ReconcilerHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();
        let store = Arc::downgrade(&self.inner);
        let period = self.inner.config.reconcile_interval;

        let join = tokio::spawn(async move {
            info!(interval_ms = period.as_millis() as u64, "session reconciler started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => {
                        debug!("session reconciler received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = store.upgrade() else {
                            debug!("session store dropped");
                            break;
                        };
                        SessionStore::from_inner(inner).reconcile().await;
                    }
                }
            }

            info!("session reconciler stopped");
        });

        ReconcilerHandle {
            shutdown,
            join: Some(join),
        }
    }
}
