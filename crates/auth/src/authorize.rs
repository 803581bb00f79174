use serde::Serialize;
use thiserror::Error;

use crate::{Permission, PermissionSet, Requirement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission(s) {}", join(.0))]
    Forbidden(Vec<Permission>),

    #[error("forbidden: an empty any-of requirement matches nothing")]
    EmptyAnyOf,
}

fn join(perms: &[Permission]) -> String {
    perms
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a requirement against a granted set.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(granted: &PermissionSet, required: &Requirement) -> Result<(), AuthzError> {
    if required.is_satisfied_by(granted) {
        return Ok(());
    }

    match required {
        Requirement::Any(keys) if keys.is_empty() => Err(AuthzError::EmptyAnyOf),
        _ => Err(AuthzError::Forbidden(missing(granted, required))),
    }
}

fn missing(granted: &PermissionSet, required: &Requirement) -> Vec<Permission> {
    required
        .keys()
        .iter()
        .filter(|k| !granted.contains(k))
        .cloned()
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Answers "why was this allowed/denied?" for logs and admin display.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub requirement: Requirement,
    pub granted: bool,
    pub reason: String,
    /// Required keys the identity holds.
    pub matched: Vec<Permission>,
    /// Required keys the identity lacks.
    pub missing: Vec<Permission>,
    /// Size of the identity's granted set at decision time.
    pub effective_permission_count: usize,
}

/// Explain why a requirement is (or would be) satisfied or not.
pub fn explain(granted: &PermissionSet, required: &Requirement) -> AuthorizationExplanation {
    let (matched, missing): (Vec<Permission>, Vec<Permission>) = required
        .keys()
        .iter()
        .cloned()
        .partition(|k| granted.contains(k));

    let outcome = authorize(granted, required);
    let reason = match (&outcome, required) {
        (Ok(()), Requirement::Single(p)) => format!("Identity has permission '{p}'"),
        (Ok(()), Requirement::Any(_)) => {
            format!("Identity has {} of the listed permissions (any one suffices)", matched.len())
        }
        (Ok(()), Requirement::All(keys)) if keys.is_empty() => {
            "Empty all-of requirement is vacuously satisfied".to_string()
        }
        (Ok(()), Requirement::All(_)) => "Identity has every listed permission".to_string(),
        (Err(err), _) => err.to_string(),
    };

    AuthorizationExplanation {
        requirement: required.clone(),
        granted: outcome.is_ok(),
        reason,
        matched,
        missing,
        effective_permission_count: granted.len(),
    }
}
