//! Permission Session Store.
//!
//! Owns the [`SessionState`] for the current identity. The state lives in a
//! `tokio::sync::watch` channel whose sender never leaves this module, so every
//! mutation goes through the transition methods below and is applied in one
//! `send_modify`/`send_if_modified` call (all-or-nothing).
//!
//! Fetch ordering: each initialization or clear bumps the session *epoch*, and
//! each fetch gets a monotonically increasing *request* number. A fetch result
//! is applied only when its epoch is still current and no later-started fetch
//! has been applied already; otherwise it is discarded. `initialize` snapshots
//! the epoch before reading the identity store and gives up if another
//! initialization or clear happened meanwhile.
//!
//! `is_loading` stays set while any fetch of the current epoch is unfinished.
//! A fetch whose future is dropped (cancelled, or unwound by a panic) retires
//! itself through `PendingFetch`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kitchenhub_auth::{IdentityId, PermissionSet};

use crate::{FetchError, IdentitySource, PermissionSource, SessionConfig, SessionError, SessionState};

/// What `initialize` found in the identity store.
#[derive(Debug)]
pub enum InitOutcome {
    /// The record carried pre-fetched permissions; the session is loaded.
    Adopted,
    /// Only an id was present; a fetch is running in the background.
    Fetching(FetchTask),
    /// No identity record; the session is empty.
    NoIdentity,
    /// A newer `initialize` or a clear ran while the identity store was being
    /// read. Nothing was changed.
    Superseded,
}

/// Handle to a background permission fetch.
#[derive(Debug)]
pub struct FetchTask(JoinHandle<Result<(), SessionError>>);

impl FetchTask {
    /// Wait for the fetch to finish and report whether its result was applied.
    pub async fn join(self) -> Result<(), SessionError> {
        self.0.await.unwrap_or(Err(SessionError::Aborted))
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

#[derive(Debug, Clone)]
struct FetchTicket {
    id: IdentityId,
    epoch: u64,
    request: u64,
}

#[derive(Debug, Clone, Copy)]
struct InitTicket {
    epoch: u64,
    init: u64,
}

pub(crate) struct Inner<I, P> {
    pub(crate) identity: I,
    source: P,
    pub(crate) config: SessionConfig,
    state: watch::Sender<SessionState>,
    /// Mutated only while holding the watch channel's write lock.
    epoch: AtomicU64,
    latest_request: AtomicU64,
    applied_request: AtomicU64,
    /// Unfinished fetches of the current epoch. Lock-protected like `epoch`.
    in_flight: AtomicU64,
    latest_init: AtomicU64,
}

impl<I, P> Inner<I, P> {
    /// Start a new epoch. Fetches of the old one no longer count as in flight.
    /// Caller holds the channel lock.
    fn advance_epoch(&self) -> u64 {
        self.in_flight.store(0, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Retire one fetch of the current epoch and report whether any remain.
    /// Caller holds the channel lock.
    fn retire_request(&self) -> bool {
        let left = self.in_flight.load(Ordering::SeqCst).saturating_sub(1);
        self.in_flight.store(left, Ordering::SeqCst);
        left > 0
    }

    fn abandon_fetch(&self, ticket: &FetchTicket) {
        let mut still_loading = false;
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != ticket.epoch {
                return false;
            }
            still_loading = self.retire_request();
            let was_loading = std::mem::replace(&mut state.is_loading, still_loading);
            was_loading != still_loading
        });
        debug!(
            identity_id = %ticket.id,
            request = ticket.request,
            still_loading,
            "permission fetch abandoned before completion"
        );
    }
}

/// A started fetch that has not reached `apply_fetch` yet.
///
/// Dropping it while armed retires the request, so a cancelled `refetch` or a
/// panicking fetch task cannot leave `is_loading` set.
struct PendingFetch<I, P> {
    inner: Arc<Inner<I, P>>,
    ticket: FetchTicket,
    armed: bool,
}

impl<I, P> PendingFetch<I, P> {
    fn new(inner: Arc<Inner<I, P>>, ticket: FetchTicket) -> Self {
        Self {
            inner,
            ticket,
            armed: true,
        }
    }

    fn disarm(&mut self) -> &FetchTicket {
        self.armed = false;
        &self.ticket
    }
}

impl<I, P> Drop for PendingFetch<I, P> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.abandon_fetch(&self.ticket);
        }
    }
}

/// Single-writer store for the current identity's permissions.
///
/// Cloning is cheap; clones share the same state.
pub struct SessionStore<I, P> {
    pub(crate) inner: Arc<Inner<I, P>>,
}

impl<I, P> Clone for SessionStore<I, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, P> SessionStore<I, P>
where
    I: IdentitySource,
    P: PermissionSource,
{
    pub fn new(identity: I, source: P, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::empty());
        Self {
            inner: Arc::new(Inner {
                identity,
                source,
                config,
                state,
                epoch: AtomicU64::new(0),
                latest_request: AtomicU64::new(0),
                applied_request: AtomicU64::new(0),
                in_flight: AtomicU64::new(0),
                latest_init: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<Inner<I, P>>) -> Self {
        Self { inner }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Readers
    // ─────────────────────────────────────────────────────────────────────

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Currently granted permissions (empty while unloaded).
    pub fn granted(&self) -> PermissionSet {
        self.inner.state.borrow().permissions.clone()
    }

    /// Wait until no fetch is in flight and return that state.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Read the identity store once and (re)build the session from it.
    ///
    /// Must be called from within a tokio runtime when the record carries
    /// only an id (the fetch is spawned).
    pub async fn initialize(&self) -> InitOutcome {
        let init = self.begin_init();
        let record = self.inner.identity.read_identity().await;

        let Some(record) = record else {
            let mut current = false;
            self.inner.state.send_if_modified(|state| {
                current = self.init_is_current(init);
                current && self.reset_locked(state)
            });
            if !current {
                return self.superseded_init();
            }
            info!("no identity record; session empty");
            return InitOutcome::NoIdentity;
        };

        if let Some(permissions) = record.prefetched() {
            let count = permissions.len();
            let now = Utc::now();
            let adopted = self.inner.state.send_if_modified(|state| {
                if !self.init_is_current(init) {
                    return false;
                }
                self.inner.advance_epoch();
                *state = SessionState::adopted(record.id.clone(), permissions, now);
                true
            });
            if !adopted {
                return self.superseded_init();
            }
            info!(identity_id = %record.id, permissions = count, "adopted pre-fetched permissions");
            return InitOutcome::Adopted;
        }

        let mut ticket = None;
        self.inner.state.send_if_modified(|state| {
            if !self.init_is_current(init) {
                return false;
            }
            let epoch = self.inner.advance_epoch();
            ticket = Some(self.start_request(state, record.id.clone(), epoch));
            true
        });

        let Some(ticket) = ticket else {
            return self.superseded_init();
        };
        info!(identity_id = %ticket.id, "fetching permissions");
        let pending = PendingFetch::new(Arc::clone(&self.inner), ticket);
        let store = self.clone();
        InitOutcome::Fetching(FetchTask(tokio::spawn(async move {
            store.run_fetch(pending).await
        })))
    }

    /// Fetch permissions again for the current identity and wait for the result.
    ///
    /// Dropping the returned future retires the request; the session stops
    /// loading unless another fetch is still outstanding.
    pub async fn refetch(&self) -> Result<(), SessionError> {
        let mut ticket = None;
        self.inner.state.send_if_modified(|state| {
            let Some(id) = state.identity_id.clone() else {
                return false;
            };
            let epoch = self.inner.epoch.load(Ordering::SeqCst);
            ticket = Some(self.start_request(state, id, epoch));
            true
        });

        let ticket = ticket.ok_or(SessionError::NoIdentity)?;
        debug!(identity_id = %ticket.id, request = ticket.request, "refetching permissions");
        self.run_fetch(PendingFetch::new(Arc::clone(&self.inner), ticket))
            .await
    }

    /// Reset to the empty state and invalidate in-flight fetches. Idempotent.
    pub fn clear(&self) {
        let changed = self
            .inner
            .state
            .send_if_modified(|state| self.reset_locked(state));
        if changed {
            info!("session cleared");
        }
    }

    /// Clear only if nothing re-initialized the session since `epoch`.
    pub(crate) fn clear_if_epoch(&self, epoch: u64) -> bool {
        self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch || !state.believes_identity() {
                return false;
            }
            self.inner.advance_epoch();
            *state = SessionState::cleared();
            true
        })
    }

    pub(crate) fn current_epoch(&self) -> u64 {
        // Reading under the channel lock orders this against transitions.
        let _guard = self.inner.state.borrow();
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn begin_init(&self) -> InitTicket {
        let _guard = self.inner.state.borrow();
        InitTicket {
            epoch: self.inner.epoch.load(Ordering::SeqCst),
            init: self.inner.latest_init.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// No clear and no later `initialize` since `init` was taken.
    /// Caller holds the channel lock.
    fn init_is_current(&self, init: InitTicket) -> bool {
        self.inner.epoch.load(Ordering::SeqCst) == init.epoch
            && self.inner.latest_init.load(Ordering::SeqCst) == init.init
    }

    fn superseded_init(&self) -> InitOutcome {
        debug!("identity read superseded by a newer transition; ignored");
        InitOutcome::Superseded
    }

    /// Caller holds the channel lock.
    fn reset_locked(&self, state: &mut SessionState) -> bool {
        self.inner.advance_epoch();
        let cleared = SessionState::cleared();
        if *state == cleared {
            return false;
        }
        *state = cleared;
        true
    }

    /// Register a new fetch request. Caller holds the channel lock.
    fn start_request(&self, state: &mut SessionState, id: IdentityId, epoch: u64) -> FetchTicket {
        let request = self.inner.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        state.begin_loading(id.clone());
        FetchTicket { id, epoch, request }
    }

    async fn run_fetch(&self, mut pending: PendingFetch<I, P>) -> Result<(), SessionError> {
        let result = self
            .inner
            .source
            .fetch_permissions(&pending.ticket.id)
            .await
            .map(|resp| resp.into_set());
        let ticket = pending.disarm();

        if let Err(err) = &result {
            warn!(identity_id = %ticket.id, error = %err, "permission fetch failed");
        }

        if !self.apply_fetch(ticket, &result) {
            debug!(
                identity_id = %ticket.id,
                request = ticket.request,
                "discarding superseded fetch result"
            );
            return Err(SessionError::Superseded);
        }

        result.map(|_| ()).map_err(SessionError::from)
    }

    /// Retire `ticket` and apply its result unless it is stale. Returns whether
    /// the result was applied.
    fn apply_fetch(&self, ticket: &FetchTicket, result: &Result<PermissionSet, FetchError>) -> bool {
        let now = Utc::now();
        let ttl = self.inner.config.stale_permissions_ttl;
        let mut applied = false;

        self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != ticket.epoch {
                return false;
            }
            let still_loading = self.inner.retire_request();

            if self.inner.applied_request.load(Ordering::SeqCst) < ticket.request {
                self.inner
                    .applied_request
                    .store(ticket.request, Ordering::SeqCst);
                match result {
                    Ok(permissions) => self.on_fetch_success(state, permissions.clone(), now),
                    Err(err) => self.on_fetch_failure(state, err.clone(), now, ttl),
                }
                applied = true;
            }

            let was_loading = std::mem::replace(&mut state.is_loading, still_loading);
            applied || was_loading != still_loading
        });
        applied
    }

    fn on_fetch_success(&self, state: &mut SessionState, permissions: PermissionSet, now: chrono::DateTime<Utc>) {
        info!(permissions = permissions.len(), "permissions loaded");
        state.apply_fetch_success(permissions, now);
    }

    fn on_fetch_failure(
        &self,
        state: &mut SessionState,
        error: FetchError,
        now: chrono::DateTime<Utc>,
        ttl: Option<chrono::Duration>,
    ) {
        let had_permissions = state.is_loaded;
        state.apply_fetch_failure(error, now, ttl);
        if had_permissions && !state.is_loaded {
            warn!("stale permissions expired after failed refresh");
        }
    }
}
