//! `kitchenhub-auth` — permission catalog, registry and evaluator.
//!
//! This crate is pure: no IO, no async, no global mutation. Session state and
//! rendering decisions live in `kitchenhub-session` and `kitchenhub-access`.

pub mod authorize;
pub mod catalog;
pub mod evaluate;
pub mod identity;
pub mod permissions;
pub mod registry;

pub use authorize::{AuthorizationExplanation, AuthzError, authorize, explain};
pub use evaluate::{Requirement, has, has_all, has_any};
pub use identity::{IdentityId, IdentityRecord};
pub use permissions::{Permission, PermissionRecord, PermissionSet};
pub use registry::{NavigationItem, PermissionDefinition, Registry, RegistryBuilder};
