//! KitchenHub console host.
//!
//! Wires the session store to a local SQLite identity store and the HTTP
//! permission API, and reports what the current identity may access.

pub mod api;
pub mod config;
pub mod report;
pub mod storage;

pub use api::HttpPermissionSource;
pub use config::ConsoleConfig;
pub use storage::{IDENTITY_KEY, SqliteIdentityStore, StorageError};
