//! Thread navigation
//!
//! A "thread" is the path of nodes from the root down to a given node.
//! These queries answer ancestor/descendant questions for highlighting the
//! active play path and for walking the replay cursor toward the edit
//! cursor. Two ancestor variants are kept deliberately distinct: thread
//! membership wants ancestor-or-self, while replay advancement wants a
//! strict ancestor.

use crate::tree::{NodeId, NodeTree};

impl NodeTree {
    /// Whether `a` is a strict ancestor of `b`.
    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        let mut current = self.parent(b);
        while let Some(node) = current {
            if node == a {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `a` lies on the thread from the root to `b` (`a == b`
    /// included).
    pub fn is_ancestor_or_self(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.is_ancestor(a, b)
    }

    /// Node keys from the root down to `id`, inclusive.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// The highest node whose chain down to `id` passes no branch point:
    /// walking up stops at the root or at the first parent with more than
    /// one child. Locking or deleting "this thread" starts here.
    pub fn thread_top(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if parent == self.root() || self.children(parent).len() != 1 {
                break;
            }
            current = parent;
        }
        current
    }

    /// The end of the unbranched chain below `id`: walk down while the
    /// node has exactly one child.
    pub fn thread_bottom(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let [only] = self.children(current) {
            current = *only;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn chain(tree: &mut NodeTree, parent: NodeId, commands: &[&str]) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut at = parent;
        for command in commands {
            let id = tree.create_node(Node::new(command, "", "", "", false, true, 0));
            tree.append_child(at, id);
            ids.push(id);
            at = id;
        }
        ids
    }

    #[test]
    fn test_strict_ancestor_excludes_self() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let ids = chain(&mut tree, root, &["a", "b"]);

        assert!(tree.is_ancestor(root, ids[1]));
        assert!(tree.is_ancestor(ids[0], ids[1]));
        assert!(!tree.is_ancestor(ids[1], ids[1]));
        assert!(tree.is_ancestor_or_self(ids[1], ids[1]));
        assert!(!tree.is_ancestor(ids[1], ids[0]));
    }

    #[test]
    fn test_path_from_root() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let ids = chain(&mut tree, root, &["a", "b", "c"]);

        assert_eq!(tree.path_from_root(ids[2]), vec![root, ids[0], ids[1], ids[2]]);
        assert_eq!(tree.path_from_root(root), vec![root]);
    }

    #[test]
    fn test_thread_top_stops_at_branch_point() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        // root -> fork -> {a -> b, other}
        let fork = chain(&mut tree, root, &["fork"])[0];
        let ab = chain(&mut tree, fork, &["a", "b"]);
        chain(&mut tree, fork, &["other"]);

        // fork has two children, so the thread containing b starts at a.
        assert_eq!(tree.thread_top(ab[1]), ab[0]);
        // The root's direct child is its own thread top.
        assert_eq!(tree.thread_top(fork), fork);
    }

    #[test]
    fn test_thread_bottom_follows_single_children() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let ids = chain(&mut tree, root, &["a", "b", "c"]);
        chain(&mut tree, ids[2], &["d1"]);
        chain(&mut tree, ids[2], &["d2"]);

        // Chain a -> b -> c is unbranched; c itself has two children.
        assert_eq!(tree.thread_bottom(ids[0]), ids[2]);
        assert_eq!(tree.thread_bottom(ids[2]), ids[2]);
    }
}
