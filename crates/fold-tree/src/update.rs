//! Incremental patching of the region tree from per-line region tokens.
//!
//! The tree remembers the tokens of every line. When [`FoldingTree::update_line`] sees new
//! tokens for a line it runs three phases:
//!
//! 1. **mark**: the regions still open where the line starts are collected. Every node opening
//!    at or after the line is flagged `delete_opening`, every open region whose end lies at or
//!    after it is flagged `delete_ending`;
//! 2. **cleanup**: flagged openings are freed with their subtrees, flagged endings become
//!    invalid;
//! 3. **insert**: the tokens of the line and of every later line are matched again, left to
//!    right, against the open regions.
//!
//! The result only depends on the remembered tokens, never on the order of the edits that
//! produced them: it is the tree a scan of the whole document builds. A fold survives when its
//! opening token does (same line, type and rank among the same-type openings of the line).

use crate::events::FoldingEvent;
use crate::node::{FoldingNode, NodeId, RegionType};
use crate::tree::FoldingTree;
use crate::visibility::HiddenLineBlock;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Regions open at the current position, innermost last, with their absolute start line.
/// The root is always at the bottom.
pub(crate) type OpenStack = Vec<(NodeId, usize)>;

/// `(start line, type, rank)` of a folded region waiting to be recreated.
pub(crate) type FoldKey = (usize, RegionType, u32);

/// What the cleanup phase took out of the tree.
pub(crate) struct Truncation {
    pub(crate) open: OpenStack,
    pub(crate) folds: HashSet<FoldKey>,
    /// Opening lines of folds that cannot come back (their line was removed).
    pub(crate) lost: Vec<usize>,
}

impl FoldingTree {
    /// Feed the region tokens found on real line `line`.
    ///
    /// `tokens` are ordered left to right as the lexer emitted them: positive values open a
    /// region of that type, negative values close one. Zero tokens are ignored. If
    /// `text_changed` is `false` and the line is not queued for a forced rescan this is a no-op.
    ///
    /// Returns `true` if the region structure changed.
    pub fn update_line(&mut self, line: usize, tokens: &[RegionType], text_changed: bool) -> bool {
        let forced = self.forced_rescan.remove(&line);
        if !text_changed && !forced {
            return false;
        }
        debug_assert!(
            !self.root_fixed || line <= self.root_end_line(),
            "update_line({line}) outside a document of {} lines",
            self.root_end_line()
        );

        let tokens: Vec<RegionType> = tokens.iter().copied().filter(|t| *t != 0).collect();
        if self.line_tokens(line) == tokens.as_slice() {
            trace!(line, ?tokens, "region structure unchanged");
            return false;
        }
        debug!(line, ?tokens, "region structure changed");
        self.set_line_tokens(line, tokens);

        let previous = self.hidden_lines.clone();
        let truncation = self.truncate_from(line, None);
        self.rematch_from(line, truncation, &previous);
        true
    }

    /// Region tokens remembered for `line`.
    pub(crate) fn line_tokens(&self, line: usize) -> &[RegionType] {
        self.line_tokens.get(line).map_or(&[], Vec::as_slice)
    }

    fn set_line_tokens(&mut self, line: usize, tokens: Vec<RegionType>) {
        if line >= self.line_tokens.len() {
            if tokens.is_empty() {
                return;
            }
            self.line_tokens.resize_with(line + 1, Vec::new);
        }
        self.line_tokens[line] = tokens;
    }

    /// Mark and clean up every boundary at or after `line`.
    ///
    /// With `removed`, that line is about to disappear: fold keys below it move up by one and
    /// folds opening on it are reported as lost.
    pub(crate) fn truncate_from(&mut self, line: usize, removed: Option<usize>) -> Truncation {
        self.invalidate_caches();
        let open = self.find_and_mark_all_nodes_for_removal_from(line);
        let mut truncation = Truncation {
            open,
            folds: HashSet::new(),
            lost: Vec::new(),
        };
        self.cleanup_unneeded_nodes(removed, &mut truncation);
        truncation
    }

    /// Replay the tokens from `line` on, then rebuild the hidden blocks.
    ///
    /// `previous` are the hidden blocks before the change, in current line numbers; lines whose
    /// visibility differs get a `LineVisibilityChanged` event. Folds that did not come back get
    /// a `RegionVisibilityChanged` event.
    pub(crate) fn rematch_from(
        &mut self,
        line: usize,
        truncation: Truncation,
        previous: &[HiddenLineBlock],
    ) {
        let Truncation {
            mut open,
            mut folds,
            mut lost,
        } = truncation;
        self.revision += 1;

        let lines = std::mem::take(&mut self.line_tokens);
        for (current, tokens) in lines.iter().enumerate().skip(line) {
            let mut ranks: Vec<(RegionType, u32)> = Vec::new();
            for &token in tokens {
                if token > 0 {
                    let rank = next_rank(&mut ranks, token);
                    self.add_opening(&mut open, token, current, rank, &mut folds);
                } else {
                    self.correct_endings(&mut open, token, current);
                }
            }
        }
        self.line_tokens = lines;

        lost.extend(folds.into_iter().map(|(start, _, _)| start));
        lost.extend(self.rebuild_hidden_blocks(Some(previous)));
        lost.sort_unstable();
        lost.dedup();
        for start in lost {
            debug!(line = start, "fold dropped with its region");
            self.emit(FoldingEvent::RegionVisibilityChanged { line: start });
        }
    }

    /// Flag every boundary at or after `line` and return the regions open where it starts.
    ///
    /// Children opening at or after `line` are detached from their parent here; the cleanup
    /// phase frees them.
    pub(crate) fn find_and_mark_all_nodes_for_removal_from(&mut self, line: usize) -> OpenStack {
        self.marked_for_deleting.clear();
        let mut open = vec![(self.root, 0)];
        let mut node = self.root;
        let mut start = 0usize;

        loop {
            let children = &self.arena[node].children;
            let first = children.partition_point(|c| start + self.arena[*c].start_line_rel < line);
            let spine = first.checked_sub(1).map(|i| children[i]).filter(|c| {
                let n = &self.arena[*c];
                !n.end_line_valid || start + n.start_line_rel + n.end_line_rel >= line
            });

            let dropped = self.arena[node].children.split_off(first);
            for id in dropped {
                self.arena[id].delete_opening = true;
                self.marked_for_deleting.push(id);
            }

            let Some(spine) = spine else {
                break;
            };
            let spine_start = start + self.arena[spine].start_line_rel;
            if self.arena[spine].end_line_valid {
                self.arena[spine].delete_ending = true;
                self.marked_for_deleting.push(spine);
            }
            open.push((spine, spine_start));
            node = spine;
            start = spine_start;
        }

        open
    }

    pub(crate) fn cleanup_unneeded_nodes(&mut self, removed: Option<usize>, out: &mut Truncation) {
        let mut marked = std::mem::take(&mut self.marked_for_deleting);

        for &id in &marked {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let (delete_opening, delete_ending) = (node.delete_opening, node.delete_ending);
            if delete_opening {
                self.remove_opening(id, removed, out);
            } else if delete_ending {
                self.remove_ending(id);
            }
        }

        marked.clear();
        self.marked_for_deleting = marked;
    }

    /// Free the detached subtree `id`, remembering the folds inside it.
    fn remove_opening(&mut self, id: NodeId, removed: Option<usize>, out: &mut Truncation) {
        let line = self.start_line(id);
        let mut pending = vec![(id, line)];
        while let Some((current, start)) = pending.pop() {
            let n = self.node(current);
            if !n.visible && n.start_line_valid {
                match removed {
                    Some(gone) if start == gone => out.lost.push(start),
                    Some(gone) if start > gone => {
                        out.folds.insert((start - 1, n.region_type, n.rank));
                    }
                    _ => {
                        out.folds.insert((start, n.region_type, n.rank));
                    }
                }
            }
            for &child in &n.children {
                pending.push((child, start + self.node(child).start_line_rel));
            }
        }
        trace!(line, "region opening removed");
        self.arena.free_subtree(id);
    }

    /// Forget the end of `id`; it now extends to the end of its parent.
    fn remove_ending(&mut self, id: NodeId) {
        let n = self.node_mut(id);
        n.end_line_valid = false;
        n.delete_ending = false;
    }

    /// Open a region of type `ntype` on `line` inside the innermost open region.
    fn add_opening(
        &mut self,
        open: &mut OpenStack,
        ntype: RegionType,
        line: usize,
        rank: u32,
        folds: &mut HashSet<FoldKey>,
    ) {
        let Some(&(parent, parent_start)) = open.last() else {
            return;
        };
        let mut node = FoldingNode::new(parent, ntype, line.saturating_sub(parent_start));
        node.rank = rank;
        if folds.remove(&(line, ntype, rank)) {
            node.visible = false;
            self.any_folded = true;
        }

        let id = self.arena.alloc(node);
        self.node_mut(parent).children.push(id);
        open.push((id, line));
        trace!(line, ntype, "region opened");
    }

    /// Close the innermost open region with `data`, or record a stray close inside it.
    fn correct_endings(&mut self, open: &mut OpenStack, data: RegionType, line: usize) {
        let Some(&(node, start)) = open.last() else {
            return;
        };

        if open.len() > 1 && self.node(node).region_type == -data {
            let n = self.node_mut(node);
            n.end_line_valid = true;
            n.end_line_rel = line - start;
            open.pop();
            self.move_sub_nodes_up(node);
            trace!(line, start, "region closed");
        } else {
            self.add_stray_close(node, start, data, line);
        }
    }

    /// Record a close without an opening as a zero-width marker inside `host`.
    fn add_stray_close(&mut self, host: NodeId, host_start: usize, data: RegionType, line: usize) {
        let mut marker = FoldingNode::new(host, data, line.saturating_sub(host_start));
        marker.start_line_valid = false;
        marker.end_line_valid = true;
        marker.end_line_rel = 0;
        let id = self.arena.alloc(marker);
        self.node_mut(host).children.push(id);
        trace!(line, data, "stray close recorded");
    }

    /// Hand children that start on `node`'s closing line over to its parent.
    ///
    /// `node` has just been closed, so it is its parent's last child and the moved nodes keep
    /// the parent's children sorted.
    fn move_sub_nodes_up(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).parent else {
            return;
        };
        debug_assert_eq!(self.node(parent).children.last(), Some(&node));

        let end_rel = self.node(node).end_line_rel;
        let children = &self.arena[node].children;
        let cut = children.partition_point(|c| self.arena[*c].start_line_rel < end_rel);
        if cut == children.len() {
            return;
        }

        let moved = self.node_mut(node).children.split_off(cut);
        let start_rel = self.node(node).start_line_rel;
        for &child in &moved {
            let c = self.node_mut(child);
            c.parent = Some(parent);
            c.start_line_rel += start_rel;
        }
        self.node_mut(parent).children.extend(moved);
    }
}

fn next_rank(ranks: &mut Vec<(RegionType, u32)>, ntype: RegionType) -> u32 {
    match ranks.iter_mut().find(|(t, _)| *t == ntype) {
        Some((_, count)) => {
            *count += 1;
            *count
        }
        None => {
            ranks.push((ntype, 0));
            0
        }
    }
}
