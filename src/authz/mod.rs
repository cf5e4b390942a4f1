//! Permission evaluation for the current principal.
//!
//! Call sites never inspect raw permission strings; every capability query
//! and menu decision goes through the evaluator, so the three consoles
//! cannot drift apart in how they read the same grant.

pub mod menu;

pub use menu::MenuNode;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Role as owned by the backend; read-only to the client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission_codes: Vec<String>,
}

/// Answers capability queries against the effective permission set.
///
/// The set is derived state: the union of the principal's role codes and any
/// directly granted codes. It is replaced atomically on every hydration and
/// never mutated in place, so a reader either sees the old grant or the new
/// one, nothing in between.
#[derive(Default)]
pub struct PermissionEvaluator {
    effective: RwLock<Arc<HashSet<String>>>,
}

impl PermissionEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the effective set with the union of `roles` and `codes`.
    pub fn hydrate(&self, roles: &[Role], codes: &[String]) {
        let mut effective = HashSet::new();
        for role in roles {
            effective.extend(role.permission_codes.iter().cloned());
        }
        effective.extend(codes.iter().cloned());
        debug!("hydrated {} effective permission codes", effective.len());
        *self.effective.write() = Arc::new(effective);
    }

    /// Drop every grant; the evaluator answers `false` until re-hydrated.
    pub fn clear(&self) {
        *self.effective.write() = Arc::new(HashSet::new());
    }

    /// True iff `code` is granted. Safe to call with no session hydrated.
    #[must_use]
    pub fn has(&self, code: &str) -> bool {
        self.effective.read().contains(code)
    }

    /// Sorted snapshot of the effective codes, for display.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        let snapshot = self.effective.read().clone();
        let mut codes: Vec<String> = snapshot.iter().cloned().collect();
        codes.sort();
        codes
    }

    /// Produce a new tree holding only the nodes this principal may see.
    #[must_use]
    pub fn filter_menu(&self, tree: &[MenuNode]) -> Vec<MenuNode> {
        let snapshot = self.effective.read().clone();
        menu::filter(tree, &|code: &str| snapshot.contains(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Vec<Role> {
        vec![
            Role {
                id: "r-recruiter".to_string(),
                name: "recruiter".to_string(),
                permission_codes: vec!["candidate:list".to_string(), "job:list".to_string()],
            },
            Role {
                id: "r-reporter".to_string(),
                name: "reporter".to_string(),
                permission_codes: vec!["report:view".to_string(), "job:list".to_string()],
            },
        ]
    }

    #[test]
    fn hydrate_takes_union_of_role_and_direct_codes() {
        let evaluator = PermissionEvaluator::new();
        evaluator.hydrate(&roles(), &["placement:list".to_string()]);

        assert!(evaluator.has("candidate:list"));
        assert!(evaluator.has("job:list"));
        assert!(evaluator.has("report:view"));
        assert!(evaluator.has("placement:list"));
        assert!(!evaluator.has("admin:user:list"));
        assert_eq!(evaluator.codes().len(), 4);
    }

    #[test]
    fn has_returns_false_without_hydration() {
        let evaluator = PermissionEvaluator::new();
        assert!(!evaluator.has("candidate:list"));
        assert!(evaluator.codes().is_empty());
    }

    #[test]
    fn rehydration_replaces_rather_than_accumulates() {
        let evaluator = PermissionEvaluator::new();
        evaluator.hydrate(&roles(), &[]);
        assert!(evaluator.has("candidate:list"));

        evaluator.hydrate(&[], &["report:view".to_string()]);
        assert!(!evaluator.has("candidate:list"));
        assert!(evaluator.has("report:view"));
    }

    #[test]
    fn clear_drops_every_grant() {
        let evaluator = PermissionEvaluator::new();
        evaluator.hydrate(&roles(), &[]);
        evaluator.clear();
        assert!(!evaluator.has("candidate:list"));
    }

    #[test]
    fn filter_menu_consults_the_effective_set() {
        let evaluator = PermissionEvaluator::new();
        evaluator.hydrate(&roles(), &[]);

        let tree = vec![
            MenuNode::open("dashboard", "/dashboard"),
            MenuNode::guarded("candidates", "/candidates", "candidate:list"),
            MenuNode::guarded("admin", "/admin", "admin:view"),
        ];
        let ids: Vec<String> = evaluator
            .filter_menu(&tree)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["dashboard", "candidates"]);
    }
}
