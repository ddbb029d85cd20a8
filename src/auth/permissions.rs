//! Permission sets with the `"*"` wildcard

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Grants every permission
pub const WILDCARD: &str = "*";

/// Permissions held by a principal. An absent set is an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wildcard() -> Self {
        Self::from_iter([WILDCARD])
    }

    pub fn insert(&mut self, permission: impl Into<String>) {
        self.0.insert(permission.into());
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether this set grants `permission`
    pub fn grants(&self, permission: &str) -> bool {
        self.is_wildcard() || self.0.contains(permission)
    }

    /// Whether this set grants at least one of `permissions`
    pub fn grants_any(&self, permissions: &[&str]) -> bool {
        self.is_wildcard() || permissions.iter().any(|p| self.0.contains(*p))
    }

    /// Whether this set grants every one of `permissions`
    pub fn is_superset_of(&self, permissions: &[&str]) -> bool {
        self.is_wildcard() || permissions.iter().all(|p| self.0.contains(*p))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Option<Vec<String>>> for PermissionSet {
    fn from(value: Option<Vec<String>>) -> Self {
        value.map(PermissionSet::from_iter).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_grants_anything() {
        let set = PermissionSet::wildcard();
        assert!(set.grants("harvests.delete"));
        assert!(set.grants("permission.that.does.not.exist"));
        assert!(set.grants_any(&["x"]));
        assert!(set.is_superset_of(&["a", "b", "c"]));
    }

    #[test]
    fn test_exact_membership() {
        let set = PermissionSet::from_iter(["farms.read", "harvests.read"]);
        assert!(set.grants("farms.read"));
        assert!(!set.grants("farms.write"));
        assert!(set.grants_any(&["farms.write", "harvests.read"]));
        assert!(!set.grants_any(&["farms.write", "payments.read"]));
        assert!(set.is_superset_of(&["farms.read", "harvests.read"]));
        assert!(!set.is_superset_of(&["farms.read", "farms.write"]));
    }

    #[test]
    fn test_missing_set_is_empty() {
        let set = PermissionSet::from(None);
        assert!(set.is_empty());
        assert!(!set.grants("farms.read"));
        assert!(!set.grants_any(&[]));
        assert!(set.is_superset_of(&[]));
    }
}
