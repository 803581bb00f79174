//! `kitchenhub-session` — session-scoped permission cache.
//!
//! This crate provides:
//! - The single-writer [`SessionStore`] and its [`SessionState`]
//! - Identity/permission source contracts (with in-memory implementations)
//! - The reconciliation loop against the external identity store

pub mod config;
pub mod error;
pub mod reconcile;
pub mod source;
pub mod state;
pub mod store;

pub use config::SessionConfig;
pub use error::{FetchError, SessionError};
pub use reconcile::ReconcilerHandle;
pub use source::{
    IdentitySource, InMemoryIdentitySource, InMemoryPermissionSource, PermissionPayload,
    PermissionResponse, PermissionSource,
};
pub use state::SessionState;
pub use store::{FetchTask, InitOutcome, SessionStore};
