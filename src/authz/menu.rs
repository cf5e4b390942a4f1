//! Navigation tree filtering.
//!
//! Menu definitions are static data owned by each console; filtering never
//! mutates the source tree, it produces a new one.

use serde::{Deserialize, Serialize};

/// One node of a console navigation tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuNode {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    /// Leaf entry without a permission requirement.
    #[must_use]
    pub fn open(id: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            required_permission: None,
            children: Vec::new(),
        }
    }

    /// Leaf entry gated by a permission code.
    #[must_use]
    pub fn guarded(id: &str, path: &str, required_permission: &str) -> Self {
        Self {
            required_permission: Some(required_permission.to_string()),
            ..Self::open(id, path)
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<MenuNode>) -> Self {
        self.children = children;
        self
    }
}

/// Filter a tree down to the nodes `granted` allows.
///
/// A node whose own requirement fails is dropped with its entire subtree;
/// children are never promoted past a removed parent. Child order is
/// preserved and no other node property is altered. A node that passes but
/// loses every child is kept only if it was a leaf to begin with; emptied
/// containers are dropped.
pub(crate) fn filter<F>(nodes: &[MenuNode], granted: &F) -> Vec<MenuNode>
where
    F: Fn(&str) -> bool,
{
    nodes
        .iter()
        .filter_map(|node| filter_node(node, granted))
        .collect()
}

fn filter_node<F>(node: &MenuNode, granted: &F) -> Option<MenuNode>
where
    F: Fn(&str) -> bool,
{
    if let Some(code) = &node.required_permission {
        if !granted(code) {
            return None;
        }
    }

    let children = filter(&node.children, granted);
    if children.is_empty() && !node.children.is_empty() {
        return None;
    }

    Some(MenuNode {
        children,
        ..node.clone()
    })
}
