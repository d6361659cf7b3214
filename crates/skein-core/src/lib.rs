#![warn(missing_docs)]
//! Skein Core - Headless Command-Tree Kernel for Interactive Fiction Testing
//!
//! # Overview
//!
//! `skein-core` models the "skein" of an interactive-fiction project: a
//! tree of every command sequence ever tried against the story, each node
//! carrying the output it produced and, once approved, the output it is
//! expected to produce. It is a headless kernel: it owns the data model,
//! the layout geometry, and the on-disk format, and assumes the upper
//! layer provides the actual canvas or widget that draws it.
//!
//! # Core Features
//!
//! - **Command Tree**: arena-backed node store with O(1) lookup by opaque id
//! - **Replay Driver**: cursor machinery for feeding a running story the
//!   commands that lead to a chosen node
//! - **Blessing**: approve actual output as expected output, per node or
//!   along a whole thread
//! - **Locking & Trimming**: mark threads permanent and sweep away the rest
//! - **Headless Layout**: deterministic tree geometry against an injected
//!   text-measurement oracle, cached by structure version
//! - **XML Persistence**: reads and writes the established Skein file
//!   dialect, all-or-nothing on load
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Skein Facade & Listener Notifications      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  XML Persistence (Skein dialect)            │  ← Documents
//! ├─────────────────────────────────────────────┤
//! │  Layout Engine (subtree widths, centers)    │  ← Geometry
//! ├─────────────────────────────────────────────┤
//! │  Thread Queries (ancestry, chain ends)      │  ← Navigation
//! ├─────────────────────────────────────────────┤
//! │  Node Tree (arena + structure version)      │  ← Structure
//! ├─────────────────────────────────────────────┤
//! │  Nodes (texts, flags, width caches)         │  ← Data
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use skein_core::{MonospaceMetrics, Skein};
//!
//! let mut skein = Skein::new();
//! let root = skein.root();
//!
//! // Grow a thread and point the edit cursor at its end.
//! let north = skein.add_child(root).unwrap();
//! skein.set_command(north, "go north");
//! let take = skein.add_child(north).unwrap();
//! skein.set_command(take, "take lamp");
//! skein.set_current(take);
//!
//! // Drive a replay toward the edit cursor.
//! assert_eq!(skein.next_command().as_deref(), Some("go north"));
//! assert_eq!(skein.next_command().as_deref(), Some("take lamp"));
//! assert_eq!(skein.next_command(), None);
//!
//! // Record and approve the story's output.
//! skein.update_after_playing("Taken.");
//! skein.bless(take, false);
//!
//! // Lay the tree out for drawing.
//! let width = skein.ensure_layout(&MonospaceMetrics::default());
//! assert!(width > 0.0);
//! ```
//!
//! # Module Description
//!
//! - [`node`] - node data: texts, flags, match classification
//! - [`tree`] - arena node store and structural editing
//! - [`layout`] - width/position computation and the metrics oracle
//! - [`xml`] - the on-disk document format
//! - [`skein`] - the facade tying everything together

pub mod layout;
pub mod node;
pub mod skein;
mod thread;
pub mod tree;
pub mod xml;

pub use layout::{LayoutConfig, MonospaceMetrics, TextMetrics, MIN_NODE_WIDTH};
pub use node::{MatchType, Node};
pub use skein::{ShowNodeReason, Skein, SkeinListener};
pub use tree::{NodeId, NodeTree};
pub use xml::SkeinError;
