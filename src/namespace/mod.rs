//! Hierarchical class namespace and the directory indexer that fills it.
//!
//! Dotted class names map onto a tree of segments:
//!
//! ```text
//! App ─┬─ view ─── Main      (classProp: app/view/Main.js)
//!      └─ model ── User      (classProp: app/model/User.js, override: overrides/User.js)
//! ```
//!
//! Intermediate nodes carry no class unless a file registers that exact name.
//! The `*` segment is a query operator and is never stored.

mod indexer;
mod package;

pub use indexer::{Indexer, OverrideLink, PackageIndex};
pub use package::{Package, PackageDescriptor, PackageKind, PackageOptions};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The class attached to a namespace node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// File that registered the class.
    pub src: String,
    /// File that overrides the class, if any.
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub overridden_by: Option<String>,
}

/// One segment of the namespace tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceNode {
    #[serde(rename = "classProp", default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, NamespaceNode>,
}

/// Segments of a dotted name, skipping empty and wildcard segments.
fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split('.').filter(|s| !s.is_empty() && *s != "*")
}

impl NamespaceNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk to `name`, creating missing intermediate nodes.
    pub fn create(&mut self, name: &str) -> &mut NamespaceNode {
        let mut node = self;
        for segment in segments(name) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node
    }

    /// Find the node for `name` without creating anything.
    pub fn get(&self, name: &str) -> Option<&NamespaceNode> {
        let mut node = self;
        for segment in segments(name) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut NamespaceNode> {
        let mut node = self;
        for segment in segments(name) {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// Register `name` as defined by `src`. Replaces any previous class on
    /// that node, including its override.
    pub fn save_class(&mut self, name: &str, src: &str) {
        if segments(name).next().is_none() {
            return;
        }
        self.create(name).class = Some(ClassEntry {
            src: src.to_string(),
            overridden_by: None,
        });
    }

    /// Attach `src` as the override of the class `target`.
    ///
    /// Returns false when `target` has no registered class; nothing is
    /// recorded in that case.
    pub fn save_override(&mut self, target: &str, src: &str) -> bool {
        if target.is_empty() {
            return false;
        }
        match self.get_mut(target).and_then(|n| n.class.as_mut()) {
            Some(class) => {
                class.overridden_by = Some(src.to_string());
                true
            }
            None => false,
        }
    }

    /// Deep-merge `other` into this tree. Classes from `other` win.
    pub fn merge(&mut self, other: NamespaceNode) {
        if other.class.is_some() {
            self.class = other.class;
        }
        for (key, child) in other.children {
            self.children.entry(key).or_default().merge(child);
        }
    }

    /// Every class strictly below this node, depth-first in key order.
    pub fn classes_below(&self) -> Vec<&ClassEntry> {
        let mut out = Vec::new();
        self.collect_below(&mut out);
        out
    }

    fn collect_below<'a>(&'a self, out: &mut Vec<&'a ClassEntry>) {
        for child in self.children.values() {
            if let Some(class) = &child.class {
                out.push(class);
            }
            child.collect_below(out);
        }
    }

    /// Number of nodes holding a class, this node included.
    pub fn class_count(&self) -> usize {
        usize::from(self.class.is_some()) + self.classes_below().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_keeps_existing_children() {
        let mut tree = NamespaceNode::new();
        tree.save_class("A.B.C", "c.js");
        tree.create("A.B");
        tree.save_class("A.D", "d.js");

        let b = tree.get("A.B").unwrap();
        assert!(b.class.is_none());
        assert_eq!(b.children.get("C").unwrap().class.as_ref().unwrap().src, "c.js");
        assert_eq!(tree.get("A").unwrap().children.len(), 2);
    }

    #[test]
    fn test_wildcard_segment_is_never_stored() {
        let mut tree = NamespaceNode::new();
        tree.create("A.*");
        tree.save_class("*", "root.js");
        let a = tree.get("A").unwrap();
        assert!(a.children.is_empty());
        assert!(tree.class.is_none());
    }

    #[test]
    fn test_get_does_not_materialize() {
        let tree = NamespaceNode::new();
        assert!(tree.get("X.Y").is_none());
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_override_of_unregistered_target_is_noop() {
        let mut tree = NamespaceNode::new();
        assert!(!tree.save_override("X.Y", "patch.js"));
        assert!(tree.get("X").is_none(), "lookup must not create nodes");

        tree.create("X.Y");
        assert!(!tree.save_override("X.Y", "patch.js"));
        assert!(!tree.save_override("", "patch.js"));
    }

    #[test]
    fn test_override_last_write_wins() {
        let mut tree = NamespaceNode::new();
        tree.save_class("X.Y", "y.js");
        assert!(tree.save_override("X.Y", "first.js"));
        assert!(tree.save_override("X.Y", "second.js"));
        let class = tree.get("X.Y").unwrap().class.as_ref().unwrap();
        assert_eq!(class.overridden_by.as_deref(), Some("second.js"));
    }

    #[test]
    fn test_save_class_resets_override() {
        let mut tree = NamespaceNode::new();
        tree.save_class("X.Y", "y.js");
        tree.save_override("X.Y", "patch.js");
        tree.save_class("X.Y", "y2.js");
        let class = tree.get("X.Y").unwrap().class.as_ref().unwrap();
        assert_eq!(class.src, "y2.js");
        assert_eq!(class.overridden_by, None);
    }

    #[test]
    fn test_merge_prefers_incoming_classes() {
        let mut left = NamespaceNode::new();
        left.save_class("A.B", "left-b.js");
        left.save_class("A.C", "left-c.js");

        let mut right = NamespaceNode::new();
        right.save_class("A.B", "right-b.js");
        right.save_class("A.D.E", "right-e.js");

        left.merge(right);
        assert_eq!(left.get("A.B").unwrap().class.as_ref().unwrap().src, "right-b.js");
        assert_eq!(left.get("A.C").unwrap().class.as_ref().unwrap().src, "left-c.js");
        assert_eq!(left.get("A.D.E").unwrap().class.as_ref().unwrap().src, "right-e.js");
    }

    #[test]
    fn test_classes_below_excludes_self() {
        let mut tree = NamespaceNode::new();
        tree.save_class("X", "x.js");
        tree.save_class("X.A", "a.js");
        tree.save_class("X.B.C", "c.js");
        let srcs: Vec<&str> = tree
            .get("X")
            .unwrap()
            .classes_below()
            .iter()
            .map(|c| c.src.as_str())
            .collect();
        assert_eq!(srcs, vec!["a.js", "c.js"]);
        assert_eq!(tree.class_count(), 3);
    }

    #[test]
    fn test_snapshot_shape() {
        let mut tree = NamespaceNode::new();
        tree.save_class("X.Y", "y.js");
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["children"]["X"]["children"]["Y"]["classProp"]["src"], "y.js");
    }
}
