//! Node store
//!
//! Owns every [`Node`] of a skein and the parent/child relationships
//! between them. Nodes are kept in an arena keyed by opaque [`NodeId`]
//! values; parents and ordered child lists are stored as id references, so
//! structural edits never move nodes in memory and external collaborators
//! can hold plain copyable keys. A key becomes dangling (lookups return
//! `None`) once its node is destroyed.
//!
//! Every structural edit bumps a version counter. The layout engine
//! compares that counter against the version it last laid out, which
//! replaces a manually maintained "layout is valid" flag and cannot be
//! forgotten by an edit path.
//!
//! # Invariants
//!
//! - Exactly one root exists; it is never destroyed by tree edits.
//! - Every non-root node has exactly one parent and appears exactly once
//!   in that parent's child list; child order is significant.

use std::collections::HashMap;

use crate::node::Node;

/// Opaque, copyable key addressing a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug)]
struct Entry {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of skein nodes plus their tree structure.
#[derive(Debug)]
pub struct NodeTree {
    entries: HashMap<NodeId, Entry>,
    root: NodeId,
    next_key: u64,
    version: u64,
}

impl NodeTree {
    /// Create a tree holding only a root node (unlabeled, empty command,
    /// permanent).
    pub fn new() -> Self {
        Self::with_root(Node::new("", "", "", "", false, false, 0))
    }

    /// Create a tree whose root is the given node.
    ///
    /// Used by the loader, which reconstructs the root from a document;
    /// everyone else goes through [`NodeTree::new`].
    pub(crate) fn with_root(root_node: Node) -> Self {
        let root = NodeId(0);
        let mut entries = HashMap::new();
        entries.insert(
            root,
            Entry {
                node: root_node,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            entries,
            root,
            next_key: 1,
            version: 0,
        }
    }

    /// The root node's key.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree holds only the root.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Current structure version. Bumped by every structural edit and by
    /// explicit layout invalidation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Request that the next layout pass recompute positions.
    pub fn invalidate_layout(&mut self) {
        self.version += 1;
    }

    /// Look up a node; `None` once the node has been destroyed.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.entries.get(&id).map(|e| &e.node)
    }

    /// Mutable lookup. Structure is unaffected; callers that change a
    /// width-relevant text must separately call
    /// [`invalidate_layout`](Self::invalidate_layout).
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.entries.get_mut(&id).map(|e| &mut e.node)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// The parent of `id`; `None` for the root or a dangling key.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(&id).and_then(|e| e.parent)
    }

    /// The ordered children of `id` (empty for leaves and dangling keys).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Distance from the root; the root itself has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// All live node keys in pre-order (root first, children in order).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Push in reverse so the first child is visited first.
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Allocate a detached node and return its key.
    ///
    /// The node takes part in the tree only once attached with
    /// [`append_child`](Self::append_child) or
    /// [`insert_child_before`](Self::insert_child_before).
    pub fn create_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_key);
        self.next_key += 1;
        self.entries.insert(
            id,
            Entry {
                node,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Attach a detached node as the last child of `parent`.
    ///
    /// Returns `false` (no mutation) if either key is dangling or the node
    /// is already attached.
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.can_attach(parent, node) {
            return false;
        }
        self.entries.get_mut(&parent).unwrap().children.push(node);
        self.entries.get_mut(&node).unwrap().parent = Some(parent);
        self.version += 1;
        true
    }

    /// Attach a detached node as a child of `parent`, immediately before
    /// `anchor` (which must already be a child of `parent`).
    pub fn insert_child_before(&mut self, parent: NodeId, anchor: NodeId, node: NodeId) -> bool {
        if !self.can_attach(parent, node) {
            return false;
        }
        let entry = self.entries.get_mut(&parent).unwrap();
        let Some(position) = entry.children.iter().position(|&c| c == anchor) else {
            return false;
        };
        entry.children.insert(position, node);
        self.entries.get_mut(&node).unwrap().parent = Some(parent);
        self.version += 1;
        true
    }

    fn can_attach(&self, parent: NodeId, node: NodeId) -> bool {
        self.contains(parent)
            && node != self.root
            && self
                .entries
                .get(&node)
                .is_some_and(|entry| entry.parent.is_none())
    }

    /// Detach `node` from its parent without destroying it, in preparation
    /// for re-insertion elsewhere. Returns `false` on the root or a
    /// dangling/detached key.
    pub fn unlink(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let siblings = &mut self.entries.get_mut(&parent).unwrap().children;
        siblings.retain(|&c| c != node);
        self.entries.get_mut(&node).unwrap().parent = None;
        self.version += 1;
        true
    }

    /// Destroy `node` and every descendant. Fails (no mutation) on the
    /// root or a dangling key.
    pub fn destroy_subtree(&mut self, node: NodeId) -> bool {
        if node == self.root || !self.contains(node) {
            return false;
        }
        if let Some(parent) = self.parent(node) {
            let siblings = &mut self.entries.get_mut(&parent).unwrap().children;
            siblings.retain(|&c| c != node);
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entries.remove(&id) {
                stack.extend(entry.children);
            }
        }
        self.version += 1;
        true
    }

    /// Destroy `node` alone, promoting its children into its former place:
    /// they are re-parented to `node`'s parent, at `node`'s former
    /// position, in their original order. Fails on the root.
    pub fn remove_single(&mut self, node: NodeId) -> bool {
        if node == self.root || !self.contains(node) {
            return false;
        }
        let parent = self
            .parent(node)
            .expect("non-root attached node must have a parent");
        let children = self.entries.get(&node).unwrap().children.clone();

        let siblings = &mut self.entries.get_mut(&parent).unwrap().children;
        let position = siblings
            .iter()
            .position(|&c| c == node)
            .expect("parent must list its child");
        siblings.splice(position..=position, children.iter().copied());

        for &child in &children {
            self.entries.get_mut(&child).unwrap().parent = Some(parent);
        }
        self.entries.remove(&node);
        self.version += 1;
        true
    }

    /// Replace the command line of a node, clearing its cached text width.
    ///
    /// Does not bump the structure version by itself; callers that affect
    /// display must request a layout refresh.
    pub fn set_command_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.node.set_command(text);
                true
            }
            None => false,
        }
    }

    /// Replace the label of a node, clearing its cached label width.
    pub fn set_label_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.node.set_label(text);
                true
            }
            None => false,
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
