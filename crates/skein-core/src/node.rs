//! Skein nodes
//!
//! A [`Node`] records one player command together with everything the tool
//! knows about it: the output the command produced the last time it was
//! played, the output the author has approved ("blessed"), an optional
//! label, and the temporary/locked and played flags. Nodes also carry the
//! cached width fields used by the layout engine; those are never
//! persisted and start out unknown.
//!
//! Nodes do not know their place in the tree. Parent/child structure lives
//! in [`NodeTree`](crate::tree::NodeTree), which owns every node and hands
//! out opaque [`NodeId`](crate::tree::NodeId) keys.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// How a node's actual transcript text relates to its expected text.
///
/// Recomputed on demand from the two text fields; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// No expected text has been set, so there is nothing to compare against.
    CannotCompare,
    /// Both texts are present and differ.
    NoMatch,
    /// Reserved for a future fuzzy comparison; never produced today.
    NearMatch,
    /// Both texts are present and identical.
    ExactMatch,
}

/// One knot of the skein: a player command and its recorded outcome.
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    command: String,
    label: String,
    transcript_text: String,
    expected_text: String,
    played: bool,
    changed: bool,
    temporary: bool,
    score: i32,

    // Layout caches, unknown until the layout engine fills them in.
    line_width: Option<f64>,
    label_width: Option<f64>,
    subtree_width: Option<f64>,
    center_x: Option<f64>,
}

/// Convert `\r\n` and bare `\r` separators to `\n`.
///
/// Interpreter output arrives with platform line endings; comparisons and
/// the on-disk format both use `\n` only.
fn normalize_line_endings(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_owned()
    }
}

impl Node {
    /// Create a node with a freshly generated process-unique id.
    ///
    /// The id is only ever used as a serialization reference; it is never
    /// reused or recomputed for the lifetime of the process. `changed` is
    /// derived state and is computed from the two texts, never passed in.
    pub fn new(
        command: &str,
        label: &str,
        transcript: &str,
        expected: &str,
        played: bool,
        temporary: bool,
        score: i32,
    ) -> Self {
        let mut node = Self {
            id: format!("node-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            command: command.to_owned(),
            label: label.to_owned(),
            transcript_text: normalize_line_endings(transcript),
            expected_text: normalize_line_endings(expected),
            played,
            changed: false,
            temporary,
            score,
            line_width: None,
            label_width: None,
            subtree_width: None,
            center_x: None,
        };
        node.recompute_changed();
        node
    }

    /// Create an empty placeholder node (temporary, unplayed, no texts).
    pub fn empty() -> Self {
        Self::new("", "", "", "", false, true, 0)
    }

    /// The stable string identifier used in serialized documents.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The command line this node represents.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn set_command(&mut self, command: &str) {
        self.command = command.to_owned();
        self.line_width = None;
    }

    /// The user's annotation for this node (empty when unlabeled).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this node carries a non-empty label.
    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = label.to_owned();
        self.label_width = None;
    }

    /// The output produced the last time this command was played.
    pub fn transcript_text(&self) -> &str {
        &self.transcript_text
    }

    /// Record the actual output for this command, recomputing `changed`.
    pub fn set_transcript_text(&mut self, transcript: &str) {
        self.transcript_text = normalize_line_endings(transcript);
        self.recompute_changed();
    }

    /// The approved ("blessed") output this node is compared against.
    pub fn expected_text(&self) -> &str {
        &self.expected_text
    }

    /// Set the expected output directly, recomputing `changed`.
    pub fn set_expected_text(&mut self, expected: &str) {
        self.expected_text = normalize_line_endings(expected);
        self.recompute_changed();
    }

    /// Approve the current transcript text as the expected output.
    ///
    /// Idempotent: blessing a node twice leaves the same expectation as
    /// blessing it once. Blessing a node with no recorded transcript clears
    /// the expectation.
    pub fn bless(&mut self) {
        self.expected_text = self.transcript_text.clone();
        self.recompute_changed();
    }

    /// Whether this node has an expected output at all.
    pub fn blessed(&self) -> bool {
        !self.expected_text.is_empty()
    }

    /// Whether this node has ever been executed during a replay.
    pub fn played(&self) -> bool {
        self.played
    }

    pub(crate) fn set_played(&mut self, played: bool) {
        self.played = played;
    }

    /// Whether the transcript and expected texts differ (both non-empty).
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Whether this node is provisional, i.e. not yet confirmed ("locked").
    pub fn temporary(&self) -> bool {
        self.temporary
    }

    pub(crate) fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// The ranking hint carried through persistence.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Set the ranking hint.
    pub fn set_score(&mut self, score: i32) {
        self.score = score;
    }

    /// Classify the transcript/expected relationship for display.
    pub fn match_type(&self) -> MatchType {
        if self.expected_text.is_empty() {
            MatchType::CannotCompare
        } else if self.transcript_text == self.expected_text {
            MatchType::ExactMatch
        } else {
            MatchType::NoMatch
        }
    }

    fn recompute_changed(&mut self) {
        self.changed = !self.transcript_text.is_empty()
            && !self.expected_text.is_empty()
            && self.transcript_text != self.expected_text;
    }

    // Layout cache accessors. Widths are filled in lazily by the layout
    // engine and cleared whenever the corresponding text changes.

    /// Cached horizontal center assigned by the last layout pass, if any.
    pub fn center_x(&self) -> Option<f64> {
        self.center_x
    }

    pub(crate) fn set_center_x(&mut self, x: f64) {
        self.center_x = Some(x);
    }

    pub(crate) fn line_width(&self) -> Option<f64> {
        self.line_width
    }

    pub(crate) fn set_line_width(&mut self, width: f64) {
        self.line_width = Some(width);
    }

    pub(crate) fn label_width(&self) -> Option<f64> {
        self.label_width
    }

    pub(crate) fn set_label_width(&mut self, width: f64) {
        self.label_width = Some(width);
    }

    pub(crate) fn subtree_width(&self) -> Option<f64> {
        self.subtree_width
    }

    pub(crate) fn set_subtree_width(&mut self, width: f64) {
        self.subtree_width = Some(width);
    }

    pub(crate) fn clear_subtree_width(&mut self) {
        self.subtree_width = None;
    }
}
