//! # Scopes
//!
//! Scope collections granted to a principal or required by a route.
//! A scope is an opaque string: an app-role id, a group object id, or a
//! delegated permission name such as `User.Read`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of scope strings.
///
/// Used both for the scopes a principal holds (roles, groups, app-role
/// assignments merged into one set) and for the scopes a route requires.
/// Backed by a `BTreeSet` so iteration order is stable in status output
/// and test assertions.
///
/// # Example
///
/// ```
/// use harness_rbac::scopes::ScopeSet;
///
/// let mut set = ScopeSet::new();
/// set.insert("User.Read");
/// set.insert("EventHarnessAdmin");
///
/// assert!(set.contains("User.Read"));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeSet {
    /// The scopes in this set.
    scopes: BTreeSet<String>,
}

impl ScopeSet {
    /// Create a new empty scope set.
    pub fn new() -> Self {
        Self {
            scopes: BTreeSet::new(),
        }
    }

    /// Add a scope to the set.
    ///
    /// # Arguments
    ///
    /// * `scope` - The scope to add
    pub fn insert(&mut self, scope: impl Into<String>) {
        self.scopes.insert(scope.into());
    }

    /// Remove a scope from the set.
    ///
    /// # Arguments
    ///
    /// * `scope` - The scope to remove
    ///
    /// # Returns
    ///
    /// `true` if the scope was present, `false` otherwise
    pub fn remove(&mut self, scope: &str) -> bool {
        self.scopes.remove(scope)
    }

    /// Check if the set contains a scope.
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Check if this set contains every scope of another set.
    ///
    /// An empty `other` is trivially contained.
    ///
    /// # Arguments
    ///
    /// * `other` - The scope set to check against
    pub fn contains_all(&self, other: &ScopeSet) -> bool {
        other.scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Check if this set contains at least one scope of another set.
    ///
    /// # Arguments
    ///
    /// * `other` - The scope set to check against
    pub fn contains_any(&self, other: &ScopeSet) -> bool {
        other.scopes.iter().any(|scope| self.scopes.contains(scope))
    }

    /// Merge another scope set into this one.
    ///
    /// # Arguments
    ///
    /// * `other` - The scope set to merge
    pub fn merge(&mut self, other: &ScopeSet) {
        for scope in &other.scopes {
            self.scopes.insert(scope.clone());
        }
    }

    /// Create from a list of scope strings.
    ///
    /// Blank entries are skipped so callers can feed optional,
    /// possibly-empty configuration values straight in.
    ///
    /// # Example
    ///
    /// ```
    /// use harness_rbac::scopes::ScopeSet;
    ///
    /// let set = ScopeSet::from_strings(&["User.Read", "", "EventHarnessAdmin"]);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn from_strings(scopes: &[&str]) -> Self {
        let mut set = Self::new();
        for scope in scopes {
            if !scope.trim().is_empty() {
                set.insert(scope.trim());
            }
        }
        set
    }

    /// Iterate over the scopes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    /// Get the count of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Clear all scopes.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = ScopeSet::new();
        for scope in iter {
            set.insert(scope);
        }
        set
    }
}
