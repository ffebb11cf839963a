//! # Authorization Gate
//!
//! The pure access decision: does a resolved principal hold every scope a
//! route requires? The gate never performs I/O; whatever directory lookups
//! are needed to populate a principal's scopes happen once per session when
//! the session is created, not per check.

use serde::{Deserialize, Serialize};

use crate::scopes::ScopeSet;

/// Decides access from required scopes and a principal's granted scopes.
///
/// The decision is `true` iff a principal is present and
/// `required ⊆ granted`. An empty requirement admits any authenticated
/// principal; an absent principal is never authorized, even when nothing
/// is required.
///
/// # Example
///
/// ```
/// use harness_rbac::{AuthorizationGate, ScopeSet};
///
/// let gate = AuthorizationGate::new(ScopeSet::from_strings(&["EventHarnessAdmin"]));
/// let granted = ScopeSet::from_strings(&["User.Read"]);
///
/// assert!(!gate.authorize(Some(&granted)));
/// assert!(!gate.authorize(None));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationGate {
    /// The scopes a principal must hold to pass this gate.
    required: ScopeSet,
}

impl AuthorizationGate {
    /// Create a gate requiring the given scopes.
    pub fn new(required: ScopeSet) -> Self {
        Self { required }
    }

    /// Create a gate that admits any authenticated principal.
    pub fn allow_authenticated() -> Self {
        Self {
            required: ScopeSet::new(),
        }
    }

    /// The scopes this gate requires.
    pub fn required(&self) -> &ScopeSet {
        &self.required
    }

    /// Evaluate the access decision for a principal's granted scopes.
    ///
    /// # Arguments
    ///
    /// * `granted` - The resolved principal's scopes, or `None` when no
    ///   session resolved
    ///
    /// # Returns
    ///
    /// `true` if access is allowed, `false` otherwise
    pub fn authorize(&self, granted: Option<&ScopeSet>) -> bool {
        match granted {
            Some(scopes) => scopes.contains_all(&self.required),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(scopes: &[&str]) -> ScopeSet {
        ScopeSet::from_strings(scopes)
    }

    #[test]
    fn test_absent_principal_is_never_authorized() {
        let gate = AuthorizationGate::new(granted(&["X"]));
        assert!(!gate.authorize(None));

        // Even an empty requirement needs an authenticated principal.
        let open = AuthorizationGate::allow_authenticated();
        assert!(!open.authorize(None));
    }

    #[test]
    fn test_superset_of_required_is_authorized() {
        let gate = AuthorizationGate::new(granted(&["X"]));
        assert!(gate.authorize(Some(&granted(&["X", "Y"]))));
    }

    #[test]
    fn test_missing_required_scope_is_denied() {
        let gate = AuthorizationGate::new(granted(&["X"]));
        assert!(!gate.authorize(Some(&granted(&["Y"]))));
    }

    #[test]
    fn test_empty_requirement_admits_any_principal() {
        let gate = AuthorizationGate::allow_authenticated();
        assert!(gate.authorize(Some(&granted(&[]))));
        assert!(gate.authorize(Some(&granted(&["anything"]))));
    }

    #[test]
    fn test_all_required_scopes_must_be_granted() {
        let gate = AuthorizationGate::new(granted(&["X", "Y"]));
        assert!(!gate.authorize(Some(&granted(&["X"]))));
        assert!(gate.authorize(Some(&granted(&["X", "Y", "Z"]))));
    }

    #[test]
    fn test_admin_role_check() {
        let gate = AuthorizationGate::new(granted(&["EventHarnessAdmin"]));
        assert!(!gate.authorize(Some(&granted(&["User.Read"]))));
        assert!(gate.authorize(Some(&granted(&["User.Read", "EventHarnessAdmin"]))));
    }
}
