//! Skein facade
//!
//! [`Skein`] ties the node store, thread queries, layout engine, and XML
//! persistence together behind the operations a front end actually calls:
//! editing the tree, approving output, locking threads, driving a replay,
//! and saving or loading the document. It owns the two cursors (the edit
//! cursor `current` and the replay cursor `played`), the dirty flag, and
//! the list of registered listeners.
//!
//! Notifications go out through the typed [`SkeinListener`] trait rather
//! than string-keyed signals; a front end implements only the methods it
//! cares about. Listeners are called synchronously from the mutating
//! operation, after the skein's own state is consistent.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::layout::{self, LayoutConfig, TextMetrics};
use crate::node::{MatchType, Node};
use crate::tree::{NodeId, NodeTree};
use crate::xml::{self, SkeinError};

/// Why a listener is being asked to scroll a node into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowNodeReason {
    /// The replay cursor just advanced onto the node.
    Command,
    /// The node's transcript was just updated by the running story.
    Transcript,
    /// The user explicitly selected the node.
    UserAction,
}

/// Receiver for skein change notifications.
///
/// All methods have empty default bodies; implement the ones you need.
/// Listeners are invoked synchronously on the mutating thread and must be
/// `Send` so a skein can move across threads with them attached.
pub trait SkeinListener: Send {
    /// Nodes were added, removed, or re-parented.
    fn tree_changed(&mut self) {}
    /// One of the two cursors moved, changing the highlighted thread.
    fn thread_changed(&mut self) {}
    /// A node's command or label text changed.
    fn node_text_changed(&mut self, _node: NodeId) {}
    /// A node's transcript/expected relationship changed.
    fn node_color_changed(&mut self, _node: NodeId) {}
    /// A node's temporary flag flipped.
    fn lock_changed(&mut self, _node: NodeId) {}
    /// The given node should be scrolled into view.
    fn show_node(&mut self, _reason: ShowNodeReason, _node: NodeId) {}
}

/// The transcript tree of one project, with cursors and listeners.
pub struct Skein {
    tree: NodeTree,
    current: NodeId,
    played: NodeId,
    modified: bool,
    config: LayoutConfig,
    // Tree version the cached node positions correspond to.
    laid_out_version: Option<u64>,
    listeners: Vec<Box<dyn SkeinListener>>,
}

impl Skein {
    /// Create a skein holding only the root node.
    ///
    /// A brand-new skein counts as modified: it exists only in memory and
    /// has never been saved anywhere.
    pub fn new() -> Self {
        let tree = NodeTree::new();
        let root = tree.root();
        Self {
            tree,
            current: root,
            played: root,
            modified: true,
            config: LayoutConfig::default(),
            laid_out_version: None,
            listeners: Vec::new(),
        }
    }

    /// Register a listener. There is no unsubscription; listeners live as
    /// long as the skein.
    pub fn add_listener(&mut self, listener: Box<dyn SkeinListener>) {
        self.listeners.push(listener);
    }

    // -- accessors ----------------------------------------------------------

    /// The root node's key.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// The edit cursor: the node whose thread is highlighted.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// The replay cursor: the last node executed by the running story.
    pub fn played(&self) -> NodeId {
        self.played
    }

    /// Whether there are unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Look up a node by key.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    /// The underlying node store, for read-only traversal.
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Whether `id` lies on the thread from the root to the edit cursor.
    pub fn in_current_thread(&self, id: NodeId) -> bool {
        self.tree.is_ancestor_or_self(id, self.current)
    }

    /// Move the edit cursor. Returns `false` for a dangling key.
    pub fn set_current(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        self.current = id;
        self.emit(|l| l.thread_changed());
        self.emit(|l| l.show_node(ShowNodeReason::UserAction, id));
        true
    }

    // -- tree editing -------------------------------------------------------

    /// Append a fresh empty temporary node under `parent`.
    pub fn add_child(&mut self, parent: NodeId) -> Option<NodeId> {
        if !self.tree.contains(parent) {
            return None;
        }
        let id = self.tree.create_node(Node::empty());
        self.tree.append_child(parent, id);
        self.touch();
        self.emit(|l| l.tree_changed());
        Some(id)
    }

    /// Interpose a fresh empty temporary node between `id` and its parent.
    /// The root cannot gain a parent.
    pub fn add_parent(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.tree.parent(id)?;
        let fresh = self.tree.create_node(Node::empty());
        self.tree.insert_child_before(parent, id, fresh);
        self.tree.unlink(id);
        self.tree.append_child(fresh, id);
        self.touch();
        self.emit(|l| l.tree_changed());
        Some(fresh)
    }

    /// Delete `id` and all its descendants. The root is indestructible.
    pub fn remove_subtree(&mut self, id: NodeId) -> bool {
        if !self.repoint_cursors_before_removing(id, true) {
            return false;
        }
        if !self.tree.destroy_subtree(id) {
            return false;
        }
        self.touch();
        self.emit(|l| l.tree_changed());
        true
    }

    /// Delete `id` alone, promoting its children into its place.
    pub fn remove_single(&mut self, id: NodeId) -> bool {
        if !self.repoint_cursors_before_removing(id, false) {
            return false;
        }
        if !self.tree.remove_single(id) {
            return false;
        }
        self.touch();
        self.emit(|l| l.tree_changed());
        true
    }

    /// Pull any cursor that is about to dangle back to the root. With
    /// `whole_subtree` the node's descendants are going away too, so an
    /// ancestor-or-self test applies; otherwise only the node itself.
    fn repoint_cursors_before_removing(&mut self, id: NodeId, whole_subtree: bool) -> bool {
        if id == self.tree.root() || !self.tree.contains(id) {
            return false;
        }
        let hits = |cursor: NodeId| {
            if whole_subtree {
                self.tree.is_ancestor_or_self(id, cursor)
            } else {
                cursor == id
            }
        };
        let reset_current = hits(self.current);
        let reset_played = hits(self.played);
        if reset_current {
            self.current = self.tree.root();
        }
        if reset_played {
            self.played = self.tree.root();
        }
        if reset_current || reset_played {
            self.emit(|l| l.thread_changed());
        }
        true
    }

    // -- node text ----------------------------------------------------------

    /// Replace a node's command line. The root's empty command is fixed.
    pub fn set_command(&mut self, id: NodeId, text: &str) -> bool {
        if id == self.tree.root() || !self.tree.set_command_text(id, text) {
            return false;
        }
        self.tree.invalidate_layout();
        self.touch();
        self.emit(|l| l.node_text_changed(id));
        true
    }

    /// Replace a node's label. The root cannot be labeled.
    pub fn set_label(&mut self, id: NodeId, text: &str) -> bool {
        if id == self.tree.root() || !self.tree.set_label_text(id, text) {
            return false;
        }
        self.tree.invalidate_layout();
        self.touch();
        self.emit(|l| l.node_text_changed(id));
        true
    }

    /// Record the actual output for a node.
    pub fn set_transcript_text(&mut self, id: NodeId, text: &str) -> bool {
        if id == self.tree.root() {
            return false;
        }
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        node.set_transcript_text(text);
        self.touch();
        self.emit(|l| l.node_color_changed(id));
        true
    }

    /// Set a node's expected output directly, without blessing.
    pub fn set_expected_text(&mut self, id: NodeId, text: &str) -> bool {
        if id == self.tree.root() {
            return false;
        }
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        node.set_expected_text(text);
        self.touch();
        self.emit(|l| l.node_color_changed(id));
        true
    }

    // -- blessing -----------------------------------------------------------

    /// Approve a node's transcript as its expected output. With
    /// `cascade_to_root`, every ancestor up to (not including) the root is
    /// blessed too.
    pub fn bless(&mut self, id: NodeId, cascade_to_root: bool) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        let scope = self.bless_scope(id, cascade_to_root);
        if scope.is_empty() {
            return true;
        }
        for node_id in scope {
            if let Some(node) = self.tree.get_mut(node_id) {
                node.bless();
            }
            self.emit(|l| l.node_color_changed(node_id));
        }
        self.touch();
        true
    }

    /// Whether some node in scope is marked changed, i.e. blessing with
    /// the same arguments would resolve a known mismatch. Drives the
    /// enabled state of a front end's bless action.
    pub fn can_bless(&self, id: NodeId, cascade_to_root: bool) -> bool {
        self.bless_scope(id, cascade_to_root)
            .into_iter()
            .any(|node_id| self.tree.get(node_id).is_some_and(Node::changed))
    }

    fn bless_scope(&self, id: NodeId, cascade_to_root: bool) -> Vec<NodeId> {
        if cascade_to_root {
            let mut scope = self.tree.path_from_root(id);
            scope.retain(|&n| n != self.tree.root());
            scope
        } else if id == self.tree.root() {
            Vec::new()
        } else {
            vec![id]
        }
    }

    /// Classify a node's transcript against its expectation.
    pub fn match_type(&self, id: NodeId) -> Option<MatchType> {
        self.tree.get(id).map(Node::match_type)
    }

    // -- locking ------------------------------------------------------------

    /// Make `id` and every ancestor permanent. Locking is monotonic along
    /// the thread: a permanent node never has a temporary ancestor.
    pub fn lock(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        let mut changed = false;
        for node_id in self.tree.path_from_root(id) {
            let node = self.tree.get_mut(node_id).expect("path nodes are live");
            if node.temporary() {
                node.set_temporary(false);
                changed = true;
                self.emit(|l| l.lock_changed(node_id));
            }
        }
        if changed {
            self.touch();
        }
        true
    }

    /// Make `id` temporary again, and with `cascade` every descendant too.
    /// The root is always permanent.
    pub fn unlock(&mut self, id: NodeId, cascade: bool) -> bool {
        if id == self.tree.root() || !self.tree.contains(id) {
            return false;
        }
        let scope: Vec<NodeId> = if cascade {
            self.subtree_preorder(id)
        } else {
            vec![id]
        };
        let mut changed = false;
        for node_id in scope {
            let node = self.tree.get_mut(node_id).expect("scope nodes are live");
            if !node.temporary() {
                node.set_temporary(true);
                changed = true;
                self.emit(|l| l.lock_changed(node_id));
            }
        }
        if changed {
            self.touch();
        }
        true
    }

    /// Delete every temporary node below `id` (each with its own subtree).
    /// Permanent descendants survive, and the walk continues below them.
    ///
    /// `min_score` is accepted for compatibility with older callers but
    /// does not currently influence which nodes are removed.
    pub fn trim(&mut self, id: NodeId, min_score: i32) -> bool {
        let _ = min_score;
        if !self.tree.contains(id) {
            return false;
        }
        let mut removed = false;
        let mut stack: Vec<NodeId> = self.tree.children(id).to_vec();
        while let Some(node_id) = stack.pop() {
            let temporary = self
                .tree
                .get(node_id)
                .is_some_and(Node::temporary);
            if temporary {
                self.repoint_cursors_before_removing(node_id, true);
                self.tree.destroy_subtree(node_id);
                removed = true;
            } else {
                stack.extend_from_slice(self.tree.children(node_id));
            }
        }
        if removed {
            self.touch();
            self.emit(|l| l.tree_changed());
        }
        true
    }

    fn subtree_preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            order.push(node_id);
            for &child in self.tree.children(node_id).iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    // -- labels and threads -------------------------------------------------

    /// All labeled nodes as `(label, id)` pairs, sorted by label.
    pub fn labels(&self) -> Vec<(String, NodeId)> {
        let mut labels: Vec<(String, NodeId)> = self
            .tree
            .preorder()
            .into_iter()
            .filter_map(|id| {
                let node = self.tree.get(id)?;
                node.has_label().then(|| (node.label().to_owned(), id))
            })
            .collect();
        labels.sort();
        labels
    }

    /// Whether any node carries a label.
    pub fn has_labels(&self) -> bool {
        self.tree
            .preorder()
            .into_iter()
            .any(|id| self.tree.get(id).is_some_and(Node::has_label))
    }

    /// Top of the unbranched chain containing `id`.
    pub fn thread_top(&self, id: NodeId) -> NodeId {
        self.tree.thread_top(id)
    }

    /// Bottom of the unbranched chain below `id`.
    pub fn thread_bottom(&self, id: NodeId) -> NodeId {
        self.tree.thread_bottom(id)
    }

    // -- replay -------------------------------------------------------------

    /// The next command to feed the running story: the child of the replay
    /// cursor that leads toward the edit cursor. Advances the replay
    /// cursor onto that child and marks it played. Returns `None` when the
    /// replay cursor has caught up with (or fallen off) the edit cursor's
    /// thread.
    pub fn next_command(&mut self) -> Option<String> {
        if !self.tree.is_ancestor(self.played, self.current) {
            return None;
        }
        let next = self
            .tree
            .children(self.played)
            .iter()
            .copied()
            .find(|&child| self.tree.is_ancestor_or_self(child, self.current))?;
        self.played = next;
        self.tree
            .get_mut(next)
            .expect("replay cursor is live")
            .set_played(true);
        self.touch();
        self.emit(|l| l.thread_changed());
        self.emit(|l| l.show_node(ShowNodeReason::Command, next));
        Some(self.tree.get(next).expect("replay cursor is live").command().to_owned())
    }

    /// The commands that [`next_command`](Self::next_command) would hand
    /// out, in order, without moving anything. Empty when the replay
    /// cursor is not strictly above the edit cursor.
    pub fn pending_commands(&self) -> Vec<String> {
        if !self.tree.is_ancestor(self.played, self.current) {
            return Vec::new();
        }
        self.tree
            .path_from_root(self.current)
            .into_iter()
            .skip_while(|&id| id != self.played)
            .skip(1)
            .filter_map(|id| self.tree.get(id).map(|n| n.command().to_owned()))
            .collect()
    }

    /// Record that the player typed `command` in the running story. If the
    /// replay cursor already has a child with exactly that command, the
    /// cursor advances onto it; otherwise a fresh temporary node is
    /// created, and the edit cursor follows it.
    pub fn new_command(&mut self, command: &str) -> NodeId {
        let existing = self
            .tree
            .children(self.played)
            .iter()
            .copied()
            .find(|&child| {
                self.tree
                    .get(child)
                    .is_some_and(|n| n.command() == command)
            });
        let node = match existing {
            Some(node) => node,
            None => {
                let node = self
                    .tree
                    .create_node(Node::new(command, "", "", "", false, true, 0));
                self.tree.append_child(self.played, node);
                self.current = node;
                self.emit(|l| l.tree_changed());
                node
            }
        };
        self.played = node;
        self.tree
            .get_mut(node)
            .expect("replay cursor is live")
            .set_played(true);
        self.touch();
        self.emit(|l| l.thread_changed());
        self.emit(|l| l.show_node(ShowNodeReason::Command, node));
        node
    }

    /// Attach the output the story just produced to the replay cursor.
    pub fn update_after_playing(&mut self, transcript: &str) {
        let played = self.played;
        if played == self.tree.root() {
            return;
        }
        if let Some(node) = self.tree.get_mut(played) {
            node.set_transcript_text(transcript);
        }
        self.touch();
        self.emit(|l| l.node_color_changed(played));
        self.emit(|l| l.show_node(ShowNodeReason::Transcript, played));
    }

    /// The story stopped (or restarted): pull the replay cursor back to
    /// the root and clear every played flag. With `reset_current` the edit
    /// cursor comes home too.
    pub fn reset(&mut self, reset_current: bool) {
        for id in self.tree.preorder() {
            if let Some(node) = self.tree.get_mut(id) {
                node.set_played(false);
            }
        }
        self.played = self.tree.root();
        if reset_current {
            self.current = self.tree.root();
        }
        self.touch();
        self.emit(|l| l.thread_changed());
    }

    // -- layout -------------------------------------------------------------

    /// The spacing configuration used by [`ensure_layout`](Self::ensure_layout).
    pub fn layout_config(&self) -> LayoutConfig {
        self.config
    }

    /// Replace the spacing configuration, invalidating cached positions.
    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.tree.invalidate_layout();
    }

    /// Recompute node positions if anything structural changed since the
    /// last pass; otherwise a no-op. Returns the tree's full width. The
    /// root sits at `x = 0`, so positions on the left half are negative.
    pub fn ensure_layout(&mut self, metrics: &dyn TextMetrics) -> f64 {
        let root = self.tree.root();
        if self.laid_out_version == Some(self.tree.version()) {
            if let Some(width) = self.tree.get(root).and_then(|n| n.subtree_width()) {
                return width;
            }
        }
        layout::clear_subtree_widths(&mut self.tree);
        let width = layout::subtree_width(&mut self.tree, root, &self.config, metrics);
        layout::layout(&mut self.tree, root, 0.0, &self.config, metrics);
        self.laid_out_version = Some(self.tree.version());
        width
    }

    /// Horizontal center of a node, from the most recent layout pass.
    pub fn node_x(&self, id: NodeId) -> Option<f64> {
        self.tree.get(id).and_then(Node::center_x)
    }

    /// Vertical center of a node: depth times the vertical spacing.
    pub fn node_y(&self, id: NodeId) -> Option<f64> {
        if !self.tree.contains(id) {
            return None;
        }
        Some(self.tree.depth(id) as f64 * self.config.vertical_spacing)
    }

    // -- persistence --------------------------------------------------------

    /// Serialize the skein to `out` and clear the modified flag.
    pub fn save<W: Write>(&mut self, out: &mut W) -> Result<(), SkeinError> {
        xml::write_document(&self.tree, self.current, out)?;
        self.modified = false;
        Ok(())
    }

    /// Serialize the skein to a file.
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SkeinError> {
        let mut file = fs::File::create(path)?;
        self.save(&mut file)
    }

    /// Replace this skein's contents with a parsed document.
    ///
    /// All-or-nothing: on any parse error the skein is untouched. On
    /// success the edit cursor lands on the document's active node, the
    /// replay cursor returns to the root, and the skein counts as clean.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), SkeinError> {
        let document = xml::parse_document(text)?;
        self.tree = document.tree;
        self.current = document.current;
        self.played = self.tree.root();
        self.modified = false;
        self.laid_out_version = None;
        self.emit(|l| l.tree_changed());
        self.emit(|l| l.thread_changed());
        Ok(())
    }

    /// Load a skein document from a file.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SkeinError> {
        let text = fs::read_to_string(path)?;
        self.load_from_str(&text)
    }

    // -- internals ----------------------------------------------------------

    fn touch(&mut self) {
        self.modified = true;
    }

    fn emit<F: FnMut(&mut dyn SkeinListener)>(&mut self, mut f: F) {
        for listener in &mut self.listeners {
            f(listener.as_mut());
        }
    }
}

impl Default for Skein {
    fn default() -> Self {
        Self::new()
    }
}
