//! `kitchenhub-access` — UI-facing access control.
//!
//! - [`gate`]: render/enable decisions for fragments and actions
//! - [`guard`]: per-navigation route protection with redirects
//!
//! On `wasm32` the `frontend` module wraps both as Leptos components.

pub mod gate;
pub mod guard;

#[cfg(target_arch = "wasm32")]
pub mod frontend;

pub use gate::{AccessRequest, Gate, GateDecision, GateProps, decide};
pub use guard::{
    Destinations, GuardOutcome, GuardRequest, GuardState, ProtectedRouteProps, Redirect, RouteGuard,
    compose_location,
};
