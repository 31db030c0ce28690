//! Folding and unfolding regions, and real/virtual line translation.

use crate::events::FoldingEvent;
use crate::node::NodeId;
use crate::tree::FoldingTree;
use tracing::{debug, trace, warn};

/// A run of consecutive real lines hidden by a folded region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HiddenLineBlock {
    /// First hidden real line.
    pub start: usize,
    /// Number of hidden lines.
    pub length: usize,
}

impl HiddenLineBlock {
    /// One past the last hidden line.
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Returns `true` if `line` is hidden by this block.
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line < self.end()
    }
}

/// Whether one of the sorted, disjoint `blocks` hides `line`.
fn covers(blocks: &[HiddenLineBlock], line: usize) -> bool {
    let pos = blocks.partition_point(|b| b.end() <= line);
    blocks.get(pos).is_some_and(|b| b.contains(line))
}

impl FoldingTree {
    /// Currently hidden line ranges, sorted and disjoint.
    pub fn hidden_line_blocks(&self) -> &[HiddenLineBlock] {
        &self.hidden_lines
    }

    /// Returns `true` if real line `line` is inside a folded region.
    pub fn is_line_hidden(&self, line: usize) -> bool {
        covers(&self.hidden_lines, line)
    }

    /// Fold or unfold the region opening on real line `line`.
    ///
    /// Only regions with a valid opening on `line` are candidates; the innermost one is toggled.
    pub fn toggle_region_visibility(&mut self, line: usize) {
        self.invalidate_caches();

        let candidate = self
            .find_all_nodes_opened_or_closed_at(line)
            .into_iter()
            .find(|id| self.node(*id).start_line_valid && self.start_line(*id) == line);
        let Some(node) = candidate else {
            trace!(line, "no region opens here");
            return;
        };

        let n = self.node(node);
        if n.visible && !n.end_line_valid && !self.root_fixed {
            warn!(line, "refusing to fold an unclosed region before the document length is known");
            return;
        }
        self.toggle_node_visibility(node, line);
    }

    /// Flip `node`'s visibility; `line` is its opening line.
    pub(crate) fn toggle_node_visibility(&mut self, node: NodeId, line: usize) {
        self.invalidate_caches();
        let n = self.node_mut(node);
        n.visible = !n.visible;
        let now_visible = n.visible;

        if now_visible {
            // Folded descendants keep their blocks.
            let previous = self.hidden_lines.clone();
            let dropped = self.rebuild_hidden_blocks(Some(&previous));
            debug!(line, "region unfolded");
            for start in dropped {
                self.emit(FoldingEvent::RegionVisibilityChanged { line: start });
            }
        } else {
            self.any_folded = true;
            self.add_hidden_line_block(node, line, true);
            debug!(line, "region folded");
        }

        self.emit(FoldingEvent::RegionVisibilityChanged { line });
    }

    /// Hide the lines strictly inside `node`, which opens on `line`.
    ///
    /// Blocks nested inside the new one are absorbed. Nothing is recorded if the region has no
    /// inner lines or is already inside a hidden block.
    fn add_hidden_line_block(&mut self, node: NodeId, line: usize, notify: bool) {
        let length = self.effective_end_rel(node).saturating_sub(1);
        if length == 0 {
            return;
        }
        let block = HiddenLineBlock {
            start: line + 1,
            length,
        };

        if self
            .hidden_lines
            .iter()
            .any(|b| b.start <= block.start && block.end() <= b.end())
        {
            return;
        }

        let mut already_hidden = Vec::new();
        self.hidden_lines.retain(|b| {
            let nested = b.start >= block.start && b.end() <= block.end();
            if nested {
                already_hidden.push(*b);
            }
            !nested
        });

        let pos = self
            .hidden_lines
            .iter()
            .position(|b| b.start > block.start)
            .unwrap_or(self.hidden_lines.len());
        self.hidden_lines.insert(pos, block);
        self.invalidate_caches();
        trace!(start = block.start, length = block.length, "hidden line block added");

        if notify {
            for hidden in block.start..block.end() {
                if !already_hidden.iter().any(|b| b.contains(hidden)) {
                    self.emit(FoldingEvent::LineVisibilityChanged {
                        line: hidden,
                        visible: false,
                    });
                }
            }
        }
    }

    /// Re-hide the descendants of `node` that are still folded themselves.
    ///
    /// A folded region that lost its end while the document length is unknown cannot hide a
    /// bounded range; it is unfolded and its opening line returned.
    fn update_hidden_sub_nodes(&mut self, node: NodeId) -> Vec<usize> {
        let mut dropped = Vec::new();
        let mut pending: Vec<NodeId> = self.node(node).children.iter().rev().copied().collect();
        while let Some(child) = pending.pop() {
            let c = self.node(child);
            if c.visible {
                pending.extend(c.children.iter().rev().copied());
            } else if !c.end_line_valid && !self.root_fixed {
                pending.extend(c.children.iter().rev().copied());
                self.node_mut(child).visible = true;
                dropped.push(self.start_line(child));
            } else {
                self.any_folded = true;
                let start = self.start_line(child);
                self.add_hidden_line_block(child, start, false);
            }
        }
        dropped
    }

    /// Recompute every hidden block from the folded regions.
    ///
    /// With `previous`, a `LineVisibilityChanged` event goes out for every line whose state
    /// differs from those blocks. Returns the opening lines of folds that had to be dropped.
    pub(crate) fn rebuild_hidden_blocks(
        &mut self,
        previous: Option<&[HiddenLineBlock]>,
    ) -> Vec<usize> {
        self.hidden_lines.clear();
        self.invalidate_caches();
        let dropped = if self.any_folded {
            self.any_folded = false;
            self.update_hidden_sub_nodes(self.root)
        } else {
            Vec::new()
        };

        if let Some(previous) = previous {
            let current = self.hidden_lines.clone();
            for block in previous {
                for line in block.start..block.end() {
                    if !covers(&current, line) {
                        self.emit(FoldingEvent::LineVisibilityChanged {
                            line,
                            visible: true,
                        });
                    }
                }
            }
            for block in &current {
                for line in block.start..block.end() {
                    if !covers(previous, line) {
                        self.emit(FoldingEvent::LineVisibilityChanged {
                            line,
                            visible: false,
                        });
                    }
                }
            }
        }
        dropped
    }

    /// Unfold every folded region hiding real line `line`.
    pub fn ensure_visible(&mut self, line: usize) {
        if !self.is_line_hidden(line) {
            return;
        }

        let mut folded = Vec::new();
        let mut node = self.find_node_for_line(line);
        while let Some(parent) = self.node(node).parent {
            if !self.node(node).visible && self.start_line(node) != line {
                folded.push(node);
            }
            node = parent;
        }

        debug!(line, count = folded.len(), "unfolding to reveal line");
        for node in folded {
            let start = self.start_line(node);
            self.toggle_node_visibility(node, start);
        }
    }

    /// Fold every closed top-level region.
    pub fn collapse_toplevel_nodes(&mut self) {
        let root = self.root;
        let toplevel: Vec<NodeId> = self
            .node(root)
            .children
            .iter()
            .copied()
            .filter(|id| {
                let n = self.node(*id);
                n.visible && n.start_line_valid && n.end_line_valid
            })
            .collect();

        for node in toplevel {
            let start = self.node(node).start_line_rel;
            self.toggle_node_visibility(node, start);
        }
    }

    /// Unfold every folded region opening within the first `num_lines` lines.
    pub fn expand_toplevel_nodes(&mut self, num_lines: usize) {
        for line in 0..num_lines {
            if self.line_info(line).starts_invisible_block {
                self.toggle_region_visibility(line);
            }
        }
    }

    /// Fold the innermost open region enclosing `real_line`.
    ///
    /// Returns the opening line of the folded region, or `None` if there was nothing to fold.
    pub fn collapse_one(&mut self, real_line: usize) -> Option<usize> {
        // Regions closing between a candidate opening and `real_line` are unrelated to it.
        let mut unrelated_blocks: i64 = 0;

        for line in (0..=real_line).rev() {
            let info = self.line_info(line);
            if info.top_level && !info.ends_block {
                break;
            }

            if info.starts_visible_block {
                unrelated_blocks -= 1;
                if unrelated_blocks == -1 {
                    self.toggle_region_visibility(line);
                    return Some(line);
                }
            }

            if info.ends_block && line != real_line {
                unrelated_blocks += 1;
            }
        }
        None
    }

    /// Unfold the folded regions directly around `real_line`.
    pub fn expand_one(&mut self, real_line: usize, num_lines: usize) {
        let mut block_track: i64 = 0;
        for line in (0..=real_line).rev() {
            let info = self.line_info(line);
            if info.top_level {
                break;
            }
            if info.starts_invisible_block && line != real_line {
                if block_track == 0 {
                    self.toggle_region_visibility(line);
                }
                block_track -= 1;
            }
            if info.ends_block {
                block_track += 1;
            }
            if block_track < 0 {
                break;
            }
        }

        block_track = 0;
        for line in real_line..num_lines {
            let info = self.line_info(line);
            if info.top_level {
                break;
            }
            if info.starts_invisible_block {
                if block_track == 0 {
                    self.toggle_region_visibility(line);
                }
                block_track += 1;
            }
            if info.ends_block {
                block_track -= 1;
            }
            if block_track < 0 {
                break;
            }
        }
    }

    /// Map a virtual (displayed) line to its real line.
    pub fn real_line(&mut self, virtual_line: usize) -> usize {
        if self.hidden_lines.is_empty() {
            return virtual_line;
        }
        if let Some(real) = self.line_mapping.get(&virtual_line) {
            return *real;
        }

        let mut real = virtual_line;
        for block in &self.hidden_lines {
            if block.start > real {
                break;
            }
            real += block.length;
        }

        self.line_mapping.insert(virtual_line, real);
        real
    }

    /// Map a real line to its virtual (displayed) line.
    ///
    /// A hidden line maps to the virtual line of the fold that hides it.
    pub fn virtual_line(&self, real_line: usize) -> usize {
        let mut virtual_line = real_line;
        for block in self.hidden_lines.iter().rev() {
            if block.start <= real_line {
                let covered = block.length.min(real_line - block.start + 1);
                virtual_line = virtual_line.saturating_sub(covered);
            }
        }
        virtual_line
    }

    /// Number of hidden lines in a document of `document_length` lines.
    pub fn hidden_lines_count(&mut self, document_length: usize) -> usize {
        if self.hidden_lines.is_empty() {
            return 0;
        }
        if self.hidden_lines_count_cache_valid
            && self.hidden_lines_count_cache.0 == document_length
        {
            return self.hidden_lines_count_cache.1;
        }

        let count = self
            .hidden_lines
            .iter()
            .take_while(|block| block.start < document_length)
            .map(|block| block.length.min(document_length - block.start))
            .sum();

        self.hidden_lines_count_cache = (document_length, count);
        self.hidden_lines_count_cache_valid = true;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn tree_with_region(open: usize, close: usize, lines: usize) -> FoldingTree {
        let mut tree = FoldingTree::with_line_count(lines);
        tree.update_line(open, &[1], true);
        tree.update_line(close, &[-1], true);
        tree
    }

    #[test]
    fn test_fold_hides_inner_lines_only() {
        let mut tree = tree_with_region(2, 8, 10);
        tree.toggle_region_visibility(2);

        assert_eq!(
            tree.hidden_line_blocks(),
            &[HiddenLineBlock {
                start: 3,
                length: 5
            }]
        );
        assert!(!tree.is_line_hidden(2));
        assert!(tree.is_line_hidden(7));
        assert!(!tree.is_line_hidden(8));

        tree.toggle_region_visibility(2);
        assert!(tree.hidden_line_blocks().is_empty());
    }

    #[test]
    fn test_toggle_on_line_without_opening_is_ignored() {
        let mut tree = tree_with_region(2, 8, 10);
        tree.toggle_region_visibility(8);
        tree.toggle_region_visibility(5);
        assert!(tree.hidden_line_blocks().is_empty());
    }

    #[test]
    fn test_unfold_outer_keeps_inner_folded() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(0, &[1], true);
        tree.update_line(3, &[1], true);
        tree.update_line(6, &[-1], true);
        tree.update_line(10, &[-1], true);

        tree.toggle_region_visibility(3);
        tree.toggle_region_visibility(0);
        assert_eq!(
            tree.hidden_line_blocks(),
            &[HiddenLineBlock {
                start: 1,
                length: 9
            }]
        );

        tree.toggle_region_visibility(0);
        assert_eq!(
            tree.hidden_line_blocks(),
            &[HiddenLineBlock {
                start: 4,
                length: 2
            }]
        );
    }

    #[test]
    fn test_unclosed_region_needs_fixed_root_to_fold() {
        let mut tree = FoldingTree::new();
        tree.update_line(1, &[1], true);
        tree.toggle_region_visibility(1);
        assert!(tree.hidden_line_blocks().is_empty());

        tree.fix_root(6);
        tree.toggle_region_visibility(1);
        assert_eq!(
            tree.hidden_line_blocks(),
            &[HiddenLineBlock {
                start: 2,
                length: 4
            }]
        );
    }

    #[test]
    fn test_events_report_each_line_once() {
        let mut tree = tree_with_region(2, 6, 10);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        tree.subscribe(move |event| sink.lock().unwrap().push(*event));

        tree.toggle_region_visibility(2);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                FoldingEvent::LineVisibilityChanged {
                    line: 3,
                    visible: false
                },
                FoldingEvent::LineVisibilityChanged {
                    line: 4,
                    visible: false
                },
                FoldingEvent::LineVisibilityChanged {
                    line: 5,
                    visible: false
                },
                FoldingEvent::RegionVisibilityChanged { line: 2 },
            ]
        );
    }

    #[test]
    fn test_translation_with_two_folds() {
        let mut tree = FoldingTree::with_line_count(30);
        tree.update_line(2, &[1], true);
        tree.update_line(6, &[-1], true);
        tree.update_line(10, &[1], true);
        tree.update_line(20, &[-1], true);
        tree.toggle_region_visibility(2);
        tree.toggle_region_visibility(10);

        // Hidden: 3..=5 and 11..=19.
        assert_eq!(tree.hidden_lines_count(30), 12);
        assert_eq!(tree.virtual_line(2), 2);
        assert_eq!(tree.virtual_line(6), 3);
        assert_eq!(tree.virtual_line(10), 7);
        assert_eq!(tree.virtual_line(20), 8);
        assert_eq!(tree.virtual_line(4), 2);

        assert_eq!(tree.real_line(3), 6);
        assert_eq!(tree.real_line(7), 10);
        assert_eq!(tree.real_line(8), 20);
        // Cached lookups agree.
        assert_eq!(tree.real_line(8), 20);
    }

    #[test]
    fn test_hidden_count_clips_to_document_length() {
        let mut tree = FoldingTree::with_line_count(10);
        tree.update_line(2, &[1], true);
        tree.toggle_region_visibility(2);

        // Unclosed region inherits the document end: lines 3..=9 hidden.
        assert_eq!(tree.hidden_lines_count(10), 7);
        assert_eq!(tree.hidden_lines_count(6), 3);
    }

    #[test]
    fn test_ensure_visible_unfolds_ancestors() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(0, &[1], true);
        tree.update_line(3, &[1], true);
        tree.update_line(6, &[-1], true);
        tree.update_line(10, &[-1], true);
        tree.toggle_region_visibility(3);
        tree.toggle_region_visibility(0);

        tree.ensure_visible(5);
        assert!(!tree.is_line_hidden(5));
        assert!(tree.hidden_line_blocks().is_empty());

        // Already visible: no-op.
        tree.toggle_region_visibility(0);
        tree.ensure_visible(12);
        assert_eq!(tree.hidden_line_blocks().len(), 1);
    }

    #[test]
    fn test_collapse_and_expand_toplevel() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(0, &[1], true);
        tree.update_line(4, &[-1], true);
        tree.update_line(6, &[1], true);
        tree.update_line(7, &[1], true);
        tree.update_line(9, &[-1], true);
        tree.update_line(12, &[-1], true);

        tree.collapse_toplevel_nodes();
        assert_eq!(
            tree.hidden_line_blocks(),
            &[
                HiddenLineBlock {
                    start: 1,
                    length: 3
                },
                HiddenLineBlock {
                    start: 7,
                    length: 5
                },
            ]
        );

        tree.expand_toplevel_nodes(20);
        assert!(tree.hidden_line_blocks().is_empty());
    }

    #[test]
    fn test_collapse_one_skips_unrelated_sibling_block() {
        let mut tree = FoldingTree::with_line_count(30);
        tree.update_line(0, &[1], true);
        tree.update_line(2, &[1], true);
        tree.update_line(8, &[-1], true);
        tree.update_line(20, &[-1], true);

        assert_eq!(tree.collapse_one(10), Some(0));
        assert_eq!(
            tree.hidden_line_blocks(),
            &[HiddenLineBlock {
                start: 1,
                length: 19
            }]
        );
    }

    #[test]
    fn test_collapse_one_folds_innermost_then_expand_one_restores() {
        let mut tree = FoldingTree::with_line_count(30);
        tree.update_line(0, &[1], true);
        tree.update_line(2, &[1], true);
        tree.update_line(8, &[-1], true);
        tree.update_line(20, &[-1], true);

        assert_eq!(tree.collapse_one(5), Some(2));
        assert!(tree.is_line_hidden(5));

        tree.expand_one(2, 30);
        assert!(tree.hidden_line_blocks().is_empty());
        assert_eq!(tree.collapse_one(25), None);
    }
}
