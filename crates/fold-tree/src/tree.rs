//! The folding region tree: construction, lookups and line-shift maintenance.
//!
//! Line positions are stored relative to the parent node, so inserting or removing a line
//! without region tokens only touches the nodes on the path to the edit point and their later
//! siblings.

use crate::events::{FoldingEvent, FoldingEventCallback};
use crate::node::{FoldingNode, NodeArena, NodeId, RegionType, UNBOUNDED_END};
use crate::visibility::HiddenLineBlock;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

/// Incrementally maintained tree of nested folding regions.
///
/// The tree is fed line by line via [`update_line`](Self::update_line) and kept in sync with
/// buffer edits via [`line_has_been_inserted`](Self::line_has_been_inserted) /
/// [`line_has_been_removed`](Self::line_has_been_removed).
///
/// # Example
///
/// ```rust
/// use fold_tree::FoldingTree;
///
/// let mut tree = FoldingTree::with_line_count(10);
/// tree.update_line(2, &[1], true);
/// tree.update_line(8, &[-1], true);
///
/// tree.toggle_region_visibility(2);
/// assert_eq!(tree.hidden_lines_count(10), 5);
/// assert_eq!(tree.virtual_line(9), 4);
/// assert_eq!(tree.real_line(4), 9);
/// ```
pub struct FoldingTree {
    pub(crate) arena: NodeArena,
    pub(crate) root: NodeId,
    pub(crate) root_fixed: bool,
    /// Sorted, disjoint ranges of hidden real lines.
    pub(crate) hidden_lines: Vec<HiddenLineBlock>,
    /// virtual line -> real line
    pub(crate) line_mapping: HashMap<usize, usize>,
    /// `(document_length, hidden line count)` of the last count.
    pub(crate) hidden_lines_count_cache: (usize, usize),
    pub(crate) hidden_lines_count_cache_valid: bool,
    /// Lines that must not take the unchanged-line shortcut in `update_line`.
    pub(crate) forced_rescan: BTreeSet<usize>,
    /// Region tokens of every line, as last fed to `update_line`; trailing lines may be absent.
    pub(crate) line_tokens: Vec<Vec<RegionType>>,
    /// Bumped whenever region boundaries are matched again.
    pub(crate) revision: u64,
    /// `false` only if no region is folded.
    pub(crate) any_folded: bool,
    // Call-scoped scratch buffer, cleared by the operation that fills it.
    pub(crate) marked_for_deleting: Vec<NodeId>,
    callbacks: Vec<FoldingEventCallback>,
}

impl FoldingTree {
    /// Create a tree with an unbounded root (no document length known yet).
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.alloc(FoldingNode::root());
        Self {
            arena,
            root,
            root_fixed: false,
            hidden_lines: Vec::new(),
            line_mapping: HashMap::new(),
            hidden_lines_count_cache: (0, 0),
            hidden_lines_count_cache_valid: false,
            forced_rescan: BTreeSet::new(),
            line_tokens: Vec::new(),
            revision: 0,
            any_folded: false,
            marked_for_deleting: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Create a tree whose root spans a document of `line_count` lines.
    pub fn with_line_count(line_count: usize) -> Self {
        let mut tree = Self::new();
        tree.fix_root(line_count);
        tree
    }

    /// Bound the root (file scope) to a document of `line_count` lines.
    pub fn fix_root(&mut self, line_count: usize) {
        let root = self.root;
        self.arena[root].end_line_rel = line_count;
        self.root_fixed = true;
        self.forced_rescan.retain(|line| *line < line_count.max(1));
        self.invalidate_caches();
    }

    /// Drop every region, hidden block and pending rescan. Subscribers are kept.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = self.arena.alloc(FoldingNode::root());
        self.root_fixed = false;
        self.hidden_lines.clear();
        self.line_mapping.clear();
        self.hidden_lines_count_cache = (0, 0);
        self.hidden_lines_count_cache_valid = false;
        self.forced_rescan.clear();
        self.line_tokens.clear();
        self.revision += 1;
        self.any_folded = false;
        self.marked_for_deleting.clear();
    }

    /// Subscribe to visibility change notifications
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&FoldingEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub(crate) fn emit(&mut self, event: FoldingEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }

    /// The root node id (file scope).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node; `None` if the id is stale.
    pub fn get(&self, id: NodeId) -> Option<&FoldingNode> {
        self.arena.get(id)
    }

    /// Number of region nodes, stray-close markers included, the root excluded.
    pub fn region_count(&self) -> usize {
        self.arena.len() - 1
    }

    /// Whether [`fix_root`](Self::fix_root) has bounded the root.
    pub fn is_root_fixed(&self) -> bool {
        self.root_fixed
    }

    /// The root's closing offset (the document line count once fixed).
    pub fn root_end_line(&self) -> usize {
        self.arena[self.root].end_line_rel
    }

    /// Lines queued for a forced rescan after a line shift.
    pub fn pending_rescan_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.forced_rescan.iter().copied()
    }

    pub(crate) fn node(&self, id: NodeId) -> &FoldingNode {
        &self.arena[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut FoldingNode {
        &mut self.arena[id]
    }

    pub(crate) fn child_position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.arena[parent].children.iter().position(|c| *c == child)
    }

    pub(crate) fn invalidate_caches(&mut self) {
        self.line_mapping.clear();
        self.hidden_lines_count_cache_valid = false;
    }

    /// Absolute start line of `id` (sum of relative starts up to, not including, the root).
    pub fn start_line(&self, id: NodeId) -> usize {
        let mut line = 0usize;
        let mut current = id;
        while let Some(parent) = self.arena[current].parent {
            line += self.arena[current].start_line_rel;
            current = parent;
        }
        line
    }

    /// Closing offset of `id`, resolving an invalid end to the enclosing region's end.
    pub(crate) fn effective_end_rel(&self, id: NodeId) -> usize {
        let node = &self.arena[id];
        match node.parent {
            Some(parent) if !node.end_line_valid => self
                .effective_end_rel(parent)
                .saturating_sub(node.start_line_rel),
            _ => node.end_line_rel,
        }
    }

    /// Absolute line of the node's closing boundary (or inherited extent if the end is invalid).
    pub fn end_line(&self, id: NodeId) -> usize {
        self.start_line(id)
            .saturating_add(self.effective_end_rel(id))
    }

    /// Deepest node whose span contains `line`; the root if no region does.
    ///
    /// A region without a valid end spans to the end of its parent.
    pub fn find_node_for_line(&self, line: usize) -> NodeId {
        let mut node = self.root;
        let mut offset = 0usize;
        let mut end = self.arena[self.root].end_line_rel;

        'descend: loop {
            for &child in &self.arena[node].children {
                let child_node = &self.arena[child];
                let start = offset + child_node.start_line_rel;
                let child_end = if child_node.end_line_valid {
                    start.saturating_add(child_node.end_line_rel)
                } else {
                    end
                };
                if start <= line && line <= child_end {
                    node = child;
                    offset = start;
                    end = child_end;
                    continue 'descend;
                }
            }
            return node;
        }
    }

    fn queue_forced_rescan_around(&mut self, line: usize) {
        if let Some(above) = line.checked_sub(1) {
            self.forced_rescan.insert(above);
        }
        self.forced_rescan.insert(line);
        self.forced_rescan.insert(line + 1);
    }

    /// Notify the tree that real line `line` was deleted from the buffer.
    pub fn line_has_been_removed(&mut self, line: usize) {
        self.invalidate_caches();
        self.queue_forced_rescan_around(line);
        trace!(line, "line removed");

        let mut previous = self.hidden_lines.clone();
        for block in &mut previous {
            if block.start > line {
                block.start -= 1;
            } else if block.start + block.length > line {
                block.length -= 1;
            }
        }

        let had_tokens = !self.line_tokens(line).is_empty();
        if line < self.line_tokens.len() {
            self.line_tokens.remove(line);
        }

        if had_tokens {
            // Boundaries on the removed line vanish: everything after it is matched again.
            let truncation = self.truncate_from(line, Some(line));
            let root = self.root;
            let n = &mut self.arena[root];
            n.end_line_rel = n.end_line_rel.saturating_sub(1);
            self.rematch_from(line, truncation, &previous);
            return;
        }

        let mut node = self.find_node_for_line(line);
        while node != self.root && self.start_line(node) >= line {
            node = self.arena[node].parent.unwrap_or(self.root);
        }

        let start_line = self.start_line(node);
        {
            let root = self.root;
            let n = &mut self.arena[node];
            if n.end_line_rel == 0 && node != root {
                n.end_line_valid = false;
            }
            n.end_line_rel = n.end_line_rel.saturating_sub(1);
        }

        let children = self.arena[node].children.clone();
        for child in children {
            let c = &mut self.arena[child];
            if c.start_line_rel + start_line >= line {
                c.start_line_rel = c.start_line_rel.saturating_sub(1);
            }
        }

        if let Some(parent) = self.arena[node].parent {
            self.decrement_by_1(parent, node);
        }
        self.refresh_after_shift();
    }

    /// Recompute the hidden blocks after a pure line shift.
    fn refresh_after_shift(&mut self) {
        for start in self.rebuild_hidden_blocks(None) {
            self.emit(FoldingEvent::RegionVisibilityChanged { line: start });
        }
    }

    /// Shrink `node` by one line and shift every sibling after `after`, then walk up.
    fn decrement_by_1(&mut self, node: NodeId, after: NodeId) {
        let mut node = node;
        let mut after = after;
        loop {
            let root = self.root;
            {
                let n = &mut self.arena[node];
                if n.end_line_rel == 0 && node != root {
                    n.end_line_valid = false;
                }
                n.end_line_rel = n.end_line_rel.saturating_sub(1);
            }

            if let Some(pos) = self.child_position(node, after) {
                let later = self.arena[node].children[pos + 1..].to_vec();
                for sibling in later {
                    let s = &mut self.arena[sibling];
                    s.start_line_rel = s.start_line_rel.saturating_sub(1);
                }
            }

            match self.arena[node].parent {
                Some(parent) => {
                    after = node;
                    node = parent;
                }
                None => break,
            }
        }
    }

    /// Notify the tree that a new real line was inserted at index `line`.
    ///
    /// The line previously at `line` (and everything after it) moves down by one.
    pub fn line_has_been_inserted(&mut self, line: usize) {
        self.invalidate_caches();
        self.queue_forced_rescan_around(line);
        trace!(line, "line inserted");
        if line < self.line_tokens.len() {
            self.line_tokens.insert(line, Vec::new());
        }

        // Stray-close markers and regions opening on `line` move down with it.
        let mut node = self.find_node_for_line(line);
        while node != self.root && self.start_line(node) >= line {
            node = self.arena[node].parent.unwrap_or(self.root);
        }

        let start_line = self.start_line(node);
        {
            let n = &mut self.arena[node];
            n.end_line_rel = n.end_line_rel.saturating_add(1);
        }

        let children = self.arena[node].children.clone();
        for child in children {
            let c = &mut self.arena[child];
            if c.start_line_rel + start_line >= line {
                c.start_line_rel += 1;
            }
        }

        if let Some(parent) = self.arena[node].parent {
            self.increment_by_1(parent, node);
        }
        self.refresh_after_shift();
    }

    fn increment_by_1(&mut self, node: NodeId, after: NodeId) {
        let mut node = node;
        let mut after = after;
        loop {
            {
                let n = &mut self.arena[node];
                n.end_line_rel = n.end_line_rel.saturating_add(1);
            }

            if let Some(pos) = self.child_position(node, after) {
                let later = self.arena[node].children[pos + 1..].to_vec();
                for sibling in later {
                    self.arena[sibling].start_line_rel += 1;
                }
            }

            match self.arena[node].parent {
                Some(parent) => {
                    after = node;
                    node = parent;
                }
                None => break,
            }
        }
    }

    /// Recursive textual dump of the tree, one node per line.
    ///
    /// The dump is also emitted at `debug` level.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        debug!("folding region tree:\n{out}");
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        use std::fmt::Write as _;

        let node = &self.arena[id];
        let end_rel = self.effective_end_rel(id);
        let end = if end_rel >= UNBOUNDED_END / 2 {
            "unbounded".to_string()
        } else {
            end_rel.to_string()
        };
        let _ = writeln!(
            out,
            "{:indent$}type {}, start {} (valid {}), end {} (valid {}), visible {}",
            "",
            node.region_type,
            node.start_line_rel,
            node.start_line_valid,
            end,
            node.end_line_valid,
            node.visible,
            indent = depth * 3
        );
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

impl Default for FoldingTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FoldingTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldingTree")
            .field("regions", &self.region_count())
            .field("root_end_line", &self.root_end_line())
            .field("hidden_lines", &self.hidden_lines)
            .finish_non_exhaustive()
    }
}
