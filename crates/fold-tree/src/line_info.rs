//! Per-line folding queries for the editor gutter.

use crate::node::NodeId;
use crate::tree::FoldingTree;

/// What the folding gutter should show for one real line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineInfo {
    /// No top-level region contains the line.
    pub top_level: bool,
    /// An unfolded region opens on the line.
    pub starts_visible_block: bool,
    /// A folded region opens on the line.
    pub starts_invisible_block: bool,
    /// A region closes on the line.
    pub ends_block: bool,
    /// A close token on the line has no matching opening.
    pub invalid_block_end: bool,
}

impl FoldingTree {
    /// Folding state of real line `line`.
    pub fn line_info(&self, line: usize) -> LineInfo {
        let mut info = LineInfo {
            top_level: self.is_top_level(line),
            ..LineInfo::default()
        };
        if info.top_level {
            return info;
        }

        for id in self.find_all_nodes_opened_or_closed_at(line) {
            let node = self.node(id);
            if node.region_type < 0 {
                info.invalid_block_end = true;
            } else if self.start_line(id) != line {
                info.ends_block = true;
            } else if node.visible {
                info.starts_visible_block = true;
            } else {
                info.starts_invisible_block = true;
            }
        }
        info
    }

    /// Returns `true` if no top-level region contains `line`.
    pub fn is_top_level(&self, line: usize) -> bool {
        let root_end = self.root_end_line();
        !self.node(self.root).children.iter().any(|id| {
            let node = self.node(*id);
            let end = if node.end_line_valid {
                node.start_line_rel.saturating_add(node.end_line_rel)
            } else {
                root_end
            };
            node.start_line_rel <= line && line <= end
        })
    }

    /// Every node opening or closing on `line`, innermost first.
    ///
    /// Collected along the path from the deepest node containing `line` to the root, plus
    /// later siblings on that path that open on `line` ("} else {") and their own children
    /// opening on the same line.
    pub(crate) fn find_all_nodes_opened_or_closed_at(&self, line: usize) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut node = self.find_node_for_line(line);

        while let Some(parent) = self.node(node).parent {
            let start = self.start_line(node);
            let n = self.node(node);
            let opens_here = start == line && n.start_line_valid;
            let closes_here = n.end_line_valid && start + n.end_line_rel == line;
            if opens_here || closes_here {
                found.push(node);
            }

            if let Some(pos) = self.child_position(parent, node) {
                for &sibling in &self.node(parent).children[pos + 1..] {
                    let sibling_start = self.start_line(sibling);
                    if sibling_start > line {
                        break;
                    }
                    if sibling_start == line {
                        self.collect_opened_at(sibling, &mut found);
                    }
                }
            }
            node = parent;
        }
        found
    }

    /// Push `id` and its descendants that open on the same line as `id`.
    fn collect_opened_at(&self, id: NodeId, found: &mut Vec<NodeId>) {
        found.push(id);
        for &child in &self.node(id).children {
            if self.node(child).start_line_rel != 0 {
                break;
            }
            self.collect_opened_at(child, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_every_region_is_top_level() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(2, &[1], true);
        tree.update_line(8, &[-1], true);

        assert_eq!(
            tree.line_info(12),
            LineInfo {
                top_level: true,
                ..LineInfo::default()
            }
        );
        assert!(!tree.is_top_level(5));
        assert!(tree.is_top_level(1));
    }

    #[test]
    fn test_open_and_close_lines() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(2, &[1], true);
        tree.update_line(8, &[-1], true);

        let open = tree.line_info(2);
        assert!(open.starts_visible_block && !open.ends_block);
        let close = tree.line_info(8);
        assert!(close.ends_block && !close.starts_visible_block);
        let inner = tree.line_info(5);
        assert_eq!(
            inner,
            LineInfo::default(),
            "a line strictly inside a region reports nothing"
        );

        tree.toggle_region_visibility(2);
        assert!(tree.line_info(2).starts_invisible_block);
    }

    #[test]
    fn test_else_line_both_ends_and_starts() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(0, &[1], true);
        tree.update_line(4, &[-1, 1], true);
        tree.update_line(8, &[-1], true);

        let info = tree.line_info(4);
        assert!(info.ends_block);
        assert!(info.starts_visible_block);
        assert!(!info.invalid_block_end);
        assert_eq!(tree.find_all_nodes_opened_or_closed_at(4).len(), 2);
    }

    #[test]
    fn test_nested_openings_on_one_line_are_all_found() {
        let mut tree = FoldingTree::with_line_count(20);
        tree.update_line(3, &[1, 2], true);
        tree.update_line(6, &[-2, -1], true);

        assert_eq!(tree.find_all_nodes_opened_or_closed_at(3).len(), 2);
        assert_eq!(tree.find_all_nodes_opened_or_closed_at(6).len(), 2);
    }

    #[test]
    fn test_unclosed_region_does_not_end_at_inherited_end() {
        let mut tree = FoldingTree::with_line_count(10);
        tree.update_line(0, &[1], true);
        tree.update_line(2, &[2], true);

        // The inner region inherits line 10 as its end but never closes there.
        assert!(!tree.line_info(10).ends_block);
    }
}
