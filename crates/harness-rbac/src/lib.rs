//! # Harness RBAC
//!
//! Scope-based authorization for the event harness, shared by the
//! authentication core and the web application.
//!
//! ## Overview
//!
//! The harness-rbac crate handles:
//! - **Scopes**: Opaque role/group/app-role identifiers granted to a principal
//! - **Scope Sets**: Collections of scopes with subset/overlap checks
//! - **Authorization Gate**: The pure required-vs-granted access decision
//!
//! Scopes are deliberately opaque strings. In a deployment they are directory
//! app-role ids, group object ids, or delegated permission names; the gate
//! only cares about set membership, never about what a scope means.
//!
//! ## Usage
//!
//! ```rust
//! use harness_rbac::{AuthorizationGate, ScopeSet};
//!
//! let gate = AuthorizationGate::new(ScopeSet::from_strings(&["EventHarnessAdmin"]));
//!
//! let granted = ScopeSet::from_strings(&["EventHarnessAdmin", "User.Read"]);
//! assert!(gate.authorize(Some(&granted)));
//!
//! // No resolved principal is never authorized.
//! assert!(!gate.authorize(None));
//! ```
//!
//! ## Decision rule
//!
//! `authorize` is `true` iff a principal is present and every required scope
//! is granted. An empty requirement admits any authenticated principal.

pub mod gate;
pub mod scopes;

// Re-export main types for convenience
pub use gate::AuthorizationGate;
pub use scopes::ScopeSet;
