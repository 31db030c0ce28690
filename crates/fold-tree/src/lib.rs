#![warn(missing_docs)]
//! fold-tree - incremental code-folding region tree
//!
//! # Overview
//!
//! `fold-tree` tracks the nested foldable regions of a source file (braces, `BEGIN`/`END` marker
//! comments, ...) while the file is edited line by line. It never parses the whole file again:
//! a lexer reports the signed region tokens of each rescanned line and the tree patches itself.
//!
//! # Core Features
//!
//! - **Relative line offsets**: a node stores its start relative to its parent, so inserting
//!   or removing a line without region tokens only touches the path to the edit point
//! - **Edit-order independence**: the tree always equals the one a scan of the whole file
//!   would build from the current tokens
//! - **Pathological input**: unmatched opens and closes are kept as first-class nodes
//!   (see [`LineInfo::invalid_block_end`])
//! - **Folding**: hidden line blocks plus memoized real/virtual line translation
//! - **Change notifications**: [`FoldingEvent`]s delivered to subscribers
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  FoldedDocument (rope + lexer feed loop)    │  ← Convenience API
//! ├─────────────────────────────────────────────┤
//! │  Visibility & Translation                   │  ← Folding UI / renderer
//! ├─────────────────────────────────────────────┤
//! │  Incremental update (mark/cleanup/insert)   │  ← Lexer input
//! ├─────────────────────────────────────────────┤
//! │  Node arena (generational ids)              │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use fold_tree::FoldingTree;
//!
//! let mut tree = FoldingTree::with_line_count(10);
//!
//! // Line 2 opens a region of type 1, line 8 closes it.
//! tree.update_line(2, &[1], true);
//! tree.update_line(8, &[-1], true);
//!
//! tree.toggle_region_visibility(2);
//! assert_eq!(tree.hidden_lines_count(10), 5);
//! assert!(tree.line_info(2).starts_invisible_block);
//!
//! // Keep the tree in sync with buffer edits.
//! tree.line_has_been_removed(5);
//! assert!(tree.line_info(7).ends_block);
//! ```
//!
//! # Module Description
//!
//! - [`node`] - Region nodes and their arena
//! - [`tree`] - The tree, lookups and line-shift maintenance
//! - [`update`] - Incremental patching from region tokens
//! - [`visibility`] - Folding, hidden line blocks and line translation
//! - [`line_info`] - Per-line gutter queries
//! - [`processing`] - The [`RegionLexer`] seam
//! - [`document`] - [`FoldedDocument`], a rope kept in sync with its tree

pub mod document;
mod error;
pub mod events;
pub mod line_info;
pub mod node;
pub mod processing;
pub mod tree;
pub mod update;
pub mod visibility;

pub use document::{FoldedDocument, FoldingState};
pub use error::DocumentError;
pub use events::{FoldingEvent, FoldingEventCallback};
pub use line_info::LineInfo;
pub use node::{FoldingNode, NodeId, RegionType, UNBOUNDED_END};
pub use processing::{BraceLexer, RegionLexer};
pub use tree::FoldingTree;
pub use visibility::HiddenLineBlock;
