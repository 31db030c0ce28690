//! A text buffer bundled with its folding tree.
//!
//! [`FoldedDocument`] is the glue an editor would otherwise write by hand: it applies edits to a
//! [`Rope`], reports inserted and removed lines to the [`FoldingTree`], and re-runs the
//! [`RegionLexer`] over every line whose region tokens may have changed.

use crate::error::DocumentError;
use crate::processing::RegionLexer;
use crate::tree::FoldingTree;
use ropey::Rope;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::{debug, trace};

/// Summary of a document's folding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldingState {
    /// Region nodes in the tree, stray-close markers included.
    pub region_count: usize,
    /// Lines hidden by folded regions.
    pub hidden_line_count: usize,
    /// Lines left on screen.
    pub visible_line_count: usize,
}

/// Text plus an always up-to-date folding tree.
///
/// # Example
///
/// ```rust
/// use fold_tree::{BraceLexer, FoldedDocument};
///
/// let mut doc = FoldedDocument::new("fn main() {\n    body();\n}\n", BraceLexer);
/// assert_eq!(doc.tree().region_count(), 1);
///
/// doc.tree_mut().toggle_region_visibility(0);
/// assert_eq!(doc.folding_state().hidden_line_count, 1);
///
/// // Unbalance the braces: the region now runs to the end of the file.
/// doc.delete(24..25).unwrap();
/// assert_eq!(doc.folding_state().region_count, 1);
/// ```
pub struct FoldedDocument<L> {
    rope: Rope,
    tree: FoldingTree,
    lexer: L,
}

impl<L: RegionLexer> FoldedDocument<L> {
    /// Load `text` and scan every line.
    pub fn new(text: &str, lexer: L) -> Self {
        let rope = Rope::from_str(text);
        let tree = FoldingTree::with_line_count(rope.len_lines());
        let mut doc = Self { rope, tree, lexer };

        for line in 0..doc.rope.len_lines() {
            doc.rescan_line(line, true);
        }
        debug!(lines = doc.line_count(), regions = doc.tree.region_count(), "document scanned");
        doc
    }

    /// Insert `text` at character offset `char_offset`.
    ///
    /// Returns `true` if the region structure changed.
    pub fn insert(&mut self, char_offset: usize, text: &str) -> Result<bool, DocumentError> {
        let len = self.rope.len_chars();
        if char_offset > len {
            return Err(DocumentError::InvalidOffset {
                offset: char_offset,
                len,
            });
        }
        if text.is_empty() {
            return Ok(false);
        }

        let revision = self.tree.revision;
        let start_line = self.rope.char_to_line(char_offset);
        // At a line start the whole old line moves down, not just its tail.
        let first_new = if self.rope.line_to_char(start_line) == char_offset {
            start_line
        } else {
            start_line + 1
        };
        let lines_before = self.rope.len_lines();
        self.rope.insert(char_offset, text);
        let added = self.rope.len_lines() - lines_before;

        for k in 0..added {
            self.tree.line_has_been_inserted(first_new + k);
        }
        debug!(char_offset, added, "text inserted");

        self.rescan(start_line..start_line + added + 1);
        Ok(self.tree.revision != revision)
    }

    /// Delete the characters in `range`.
    ///
    /// Returns `true` if the region structure changed.
    pub fn delete(&mut self, range: Range<usize>) -> Result<bool, DocumentError> {
        let len = self.rope.len_chars();
        if range.start > range.end || range.end > len {
            return Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
                len,
            });
        }
        if range.is_empty() {
            return Ok(false);
        }

        let revision = self.tree.revision;
        let start_line = self.rope.char_to_line(range.start);
        // Whole lines deleted: the lines themselves go, the one after them stays intact.
        let whole_lines = self.rope.line_to_char(start_line) == range.start
            && self.rope.line_to_char(self.rope.char_to_line(range.end)) == range.end;
        let first_gone = if whole_lines { start_line } else { start_line + 1 };
        let lines_before = self.rope.len_lines();
        self.rope.remove(range.clone());
        let removed = lines_before - self.rope.len_lines();

        // Bottom-up, so every reported line number is still valid when it is reported.
        for k in (0..removed).rev() {
            self.tree.line_has_been_removed(first_gone + k);
        }
        debug!(start = range.start, end = range.end, removed, "text deleted");

        self.rescan(start_line..start_line + 1);
        Ok(self.tree.revision != revision)
    }

    /// Rescan `touched` as changed lines, plus every line queued for a forced rescan, in
    /// ascending order.
    fn rescan(&mut self, touched: Range<usize>) {
        let line_count = self.rope.len_lines();
        self.tree.forced_rescan.retain(|line| *line < line_count);

        let mut lines: BTreeSet<usize> = self.tree.forced_rescan.iter().copied().collect();
        lines.extend(touched.clone().filter(|line| *line < line_count));

        for line in lines {
            self.rescan_line(line, touched.contains(&line));
        }
    }

    fn rescan_line(&mut self, line: usize, text_changed: bool) {
        let text = self.line_text(line).unwrap_or_default();
        let tokens = self.lexer.region_tokens(line, &text);
        trace!(line, ?tokens, text_changed, "line rescanned");
        self.tree.update_line(line, &tokens, text_changed);
    }

    /// The folding tree.
    pub fn tree(&self) -> &FoldingTree {
        &self.tree
    }

    /// Mutable access to the folding tree, for toggling folds.
    pub fn tree_mut(&mut self) -> &mut FoldingTree {
        &mut self.tree
    }

    /// The document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Number of lines (a trailing newline starts an empty last line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of `line` without its line terminator.
    pub fn line_text(&self, line: usize) -> Option<String> {
        let slice = self.rope.get_line(line)?;
        let mut text = slice.to_string();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        Some(text)
    }

    /// Region, hidden and visible line counts.
    pub fn folding_state(&mut self) -> FoldingState {
        let line_count = self.line_count();
        let hidden_line_count = self.tree.hidden_lines_count(line_count);
        FoldingState {
            region_count: self.tree.region_count(),
            hidden_line_count,
            visible_line_count: line_count.saturating_sub(hidden_line_count),
        }
    }
}

impl<L> std::fmt::Debug for FoldedDocument<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldedDocument")
            .field("lines", &self.rope.len_lines())
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}
