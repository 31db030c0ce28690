//! Region tree nodes and the arena that owns them.
//!
//! Nodes never hold references to each other. A node stores the [`NodeId`] of its parent and an
//! ordered list of child ids; the [`NodeArena`] owns every node. Freeing a node frees its whole
//! subtree, so ownership stays a strict tree even though the parent link points upward.

/// Signed region token / region type.
///
/// `t > 0` opens a region of kind `t`, `-t` closes it. Type `0` is reserved for the root.
pub type RegionType = i32;

/// Sentinel used for "extends to the end of the enclosing region".
///
/// Kept well below `usize::MAX` so that `start + end_line_rel` never overflows.
pub const UNBOUNDED_END: usize = usize::MAX / 4;

/// Stable handle of a node inside a [`crate::FoldingTree`].
///
/// Ids are generational: once a node is destroyed its id stays invalid even if the slot is
/// reused by a later node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index (mostly useful for debugging output).
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// A node of the folding region tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) start_line_rel: usize,
    pub(crate) end_line_rel: usize,
    pub(crate) start_line_valid: bool,
    pub(crate) end_line_valid: bool,
    pub(crate) region_type: RegionType,
    pub(crate) visible: bool,
    /// Index among the openings of the same type on the start line.
    pub(crate) rank: u32,
    pub(crate) delete_opening: bool,
    pub(crate) delete_ending: bool,
}

impl FoldingNode {
    /// Build the root shape: type 0, no parent, valid start, unbounded end.
    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            start_line_rel: 0,
            end_line_rel: UNBOUNDED_END,
            start_line_valid: true,
            end_line_valid: true,
            region_type: 0,
            visible: true,
            rank: 0,
            delete_opening: false,
            delete_ending: false,
        }
    }

    /// Build a node under `parent`, opening `start_line_rel` lines after the parent's start.
    ///
    /// The end stays invalid (and unbounded) until a matching close is found.
    pub(crate) fn new(parent: NodeId, region_type: RegionType, start_line_rel: usize) -> Self {
        Self {
            parent: Some(parent),
            children: Vec::new(),
            start_line_rel,
            end_line_rel: UNBOUNDED_END,
            start_line_valid: true,
            end_line_valid: false,
            region_type,
            visible: true,
            rank: 0,
            delete_opening: false,
            delete_ending: false,
        }
    }

    /// The enclosing node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes, sorted by ascending start line.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns `true` if the node has at least one child.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Offset of the opening line from the parent's start line.
    pub fn start_line_rel(&self) -> usize {
        self.start_line_rel
    }

    /// Offset of the closing line from this node's own start line.
    ///
    /// Only meaningful when [`end_line_valid`](Self::end_line_valid) is `true`; use
    /// [`FoldingTree::end_line`](crate::FoldingTree::end_line) for the inherited extent.
    pub fn end_line_rel(&self) -> usize {
        self.end_line_rel
    }

    /// Whether the opening boundary is known (`false` for stray-close markers).
    pub fn start_line_valid(&self) -> bool {
        self.start_line_valid
    }

    /// Whether the closing boundary is known.
    pub fn end_line_valid(&self) -> bool {
        self.end_line_valid
    }

    /// Region kind; negative for stray-close markers, `0` for the root.
    pub fn region_type(&self) -> RegionType {
        self.region_type
    }

    /// Whether the region body is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns `true` for a synthesized "closed but never opened" marker.
    pub fn is_stray_close(&self) -> bool {
        self.region_type < 0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<FoldingNode>,
}

/// Owner of every node of a tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, node: FoldingNode) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&FoldingNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut FoldingNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes (the root included).
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Destroy `id` and every node below it.
    ///
    /// The caller is responsible for unlinking `id` from its parent's child list.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            self.live -= 1;
            pending.extend(node.children);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = FoldingNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale folding node id {id:?}"),
        }
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale folding node id {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_subtree_releases_children() {
        let mut arena = NodeArena::new();
        let root = arena.alloc(FoldingNode::root());
        let child = arena.alloc(FoldingNode::new(root, 1, 2));
        let grandchild = arena.alloc(FoldingNode::new(child, 2, 1));
        arena[root].children.push(child);
        arena[child].children.push(grandchild);

        assert_eq!(arena.len(), 3);
        arena[root].children.clear();
        arena.free_subtree(child);

        assert_eq!(arena.len(), 1);
        assert!(arena.get(child).is_none());
        assert!(arena.get(grandchild).is_none());
        assert!(arena.get(root).is_some());
    }

    #[test]
    fn test_reused_slot_does_not_alias_stale_id() {
        let mut arena = NodeArena::new();
        let root = arena.alloc(FoldingNode::root());
        let first = arena.alloc(FoldingNode::new(root, 1, 0));
        arena.free_subtree(first);

        let second = arena.alloc(FoldingNode::new(root, 3, 4));
        assert_eq!(first.index(), second.index());
        assert!(arena.get(first).is_none());
        assert_eq!(arena[second].region_type(), 3);
    }

    #[test]
    fn test_new_node_is_open_and_visible() {
        let mut arena = NodeArena::new();
        let root = arena.alloc(FoldingNode::root());
        let node = FoldingNode::new(root, 1, 5);

        assert!(node.start_line_valid());
        assert!(!node.end_line_valid());
        assert!(node.is_visible());
        assert_eq!(node.end_line_rel(), UNBOUNDED_END);
        assert_eq!(node.parent(), Some(root));
    }
}
