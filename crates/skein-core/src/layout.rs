//! Layout engine
//!
//! Assigns each node a horizontal center so that a parent sits centered
//! over the span of its children and siblings never overlap, given the
//! rendered width of their command and label texts plus a configurable
//! spacing. The algorithm is two passes over the tree: a post-order pass
//! computing subtree widths, then a pre-order pass assigning centers.
//! Single-child chains inherit their parent's center instead of being
//! spread, which keeps straight threads vertically aligned.
//!
//! Text widths come from an injected [`TextMetrics`] oracle, normally the
//! rendering layer's font machinery. The oracle must be deterministic:
//! identical strings must measure identically on every call, or the width
//! caches are meaningless. [`MonospaceMetrics`] is a built-in deterministic
//! oracle for headless use and tests.
//!
//! Results are cached on the nodes (`center_x`, text widths, subtree
//! widths) and recomputed only when the tree's structure version has moved
//! past the version last laid out.

use unicode_width::UnicodeWidthStr;

use crate::tree::{NodeId, NodeTree};

/// Narrowest width a childless node may occupy, in oracle units.
/// Keeps empty placeholder nodes clickable instead of zero-width.
pub const MIN_NODE_WIDTH: f64 = 90.0;

/// Measurement oracle supplied by the rendering layer.
///
/// The contract: for identical strings (under identical font parameters,
/// which are the implementation's own business) the returned width must be
/// identical on every call.
pub trait TextMetrics {
    /// Width of `text` when rendered, in the oracle's units (typically
    /// pixels). The empty string measures 0.
    fn measure(&self, text: &str) -> f64;
}

/// Deterministic fixed-pitch oracle: display cells × a cell width.
///
/// Wide (CJK, emoji) characters count as two cells, so headless layouts
/// roughly agree with what a terminal or fixed-pitch canvas would show.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    /// Width of one display cell.
    pub cell_width: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { cell_width: 10.0 }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn measure(&self, text: &str) -> f64 {
        text.width() as f64 * self.cell_width
    }
}

/// Spacing configuration for the layout pass.
#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    /// Horizontal gap between adjacent sibling subtrees.
    pub horizontal_spacing: f64,
    /// Vertical distance between a node and its children (visualization
    /// hint only; the layout pass itself assigns horizontal centers).
    pub vertical_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 40.0,
            vertical_spacing: 75.0,
        }
    }
}

/// Ensure a node's text widths are cached, measuring any that are unknown.
fn node_text_width(tree: &mut NodeTree, id: NodeId, metrics: &dyn TextMetrics) -> f64 {
    let node = tree.get(id).expect("layout visits live nodes only");
    let line = match node.line_width() {
        Some(width) => width,
        None => {
            let width = metrics.measure(node.command());
            tree.get_mut(id).unwrap().set_line_width(width);
            width
        }
    };
    let node = tree.get(id).unwrap();
    let label = match node.label_width() {
        Some(width) => width,
        None => {
            let width = metrics.measure(node.label());
            tree.get_mut(id).unwrap().set_label_width(width);
            width
        }
    };
    line.max(label)
}

/// Post-order subtree width: the sum of child subtree widths plus spacing,
/// lower-bounded by the node's own text width; leaves are floored at
/// [`MIN_NODE_WIDTH`].
pub(crate) fn subtree_width(
    tree: &mut NodeTree,
    id: NodeId,
    config: &LayoutConfig,
    metrics: &dyn TextMetrics,
) -> f64 {
    if let Some(width) = tree.get(id).and_then(|n| n.subtree_width()) {
        return width;
    }
    let children: Vec<NodeId> = tree.children(id).to_vec();
    let own = node_text_width(tree, id, metrics);
    let width = if children.is_empty() {
        own.max(MIN_NODE_WIDTH)
    } else {
        let mut total = 0.0;
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                total += config.horizontal_spacing;
            }
            total += subtree_width(tree, child, config, metrics);
        }
        total.max(own)
    };
    tree.get_mut(id).unwrap().set_subtree_width(width);
    width
}

/// Pre-order position pass: assign `center_x` to `id` and recursively to
/// its descendants. An only child inherits its parent's center; otherwise
/// each child is centered within its own subtree-width slice and the whole
/// row is centered under the parent.
pub(crate) fn layout(
    tree: &mut NodeTree,
    id: NodeId,
    center_x: f64,
    config: &LayoutConfig,
    metrics: &dyn TextMetrics,
) {
    tree.get_mut(id)
        .expect("layout visits live nodes only")
        .set_center_x(center_x);

    let children: Vec<NodeId> = tree.children(id).to_vec();
    match children.as_slice() {
        [] => {}
        [only] => layout(tree, *only, center_x, config, metrics),
        _ => {
            let total = subtree_width(tree, id, config, metrics);
            let mut offset = 0.0;
            for &child in &children {
                let width = subtree_width(tree, child, config, metrics);
                layout(
                    tree,
                    child,
                    center_x - total * 0.5 + offset + width * 0.5,
                    config,
                    metrics,
                );
                offset += width + config.horizontal_spacing;
            }
        }
    }
}

/// Forget all cached subtree widths before a fresh layout pass. Text-width
/// caches survive; they are only cleared by their own text edits.
pub(crate) fn clear_subtree_widths(tree: &mut NodeTree) {
    for id in tree.preorder() {
        if let Some(node) = tree.get_mut(id) {
            node.clear_subtree_width();
        }
    }
}
