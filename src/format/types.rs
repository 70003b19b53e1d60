use std::fmt;

use crate::format::error::FormatError;

/// Number of octrees stored per batch. Slots are indexed `0..TREES_PER_BATCH`.
pub const TREES_PER_BATCH: usize = 125;
pub const MAX_NODES_PER_TREE: usize = u16::MAX as usize;
pub const MAX_OCTREES_PER_BATCH: usize = u8::MAX as usize;

/// On-wire size of one [`Node`] in bytes.
pub const NODE_SIZE: usize = 4;

/// `Node` is one sample of an octree.
///
/// - `material_type`: 0 is empty (air), anything else is a material id
/// - `signed_distance`: 1..=125 is above the isosurface, 127..=252 is below, 0 is fully solid for non-empty materials
/// - `first_child_node`: 0 marks a leaf, otherwise the index of the first of 8 contiguous children inside the same tree
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Node {
    pub material_type: u8,
    pub signed_distance: u8,
    pub first_child_node: u16,
}

impl Node {
    pub const fn new(material_type: u8, signed_distance: u8, first_child_node: u16) -> Node {
        Node { material_type, signed_distance, first_child_node }
    }

    pub fn is_leaf(&self) -> bool {
        self.first_child_node == 0
    }

    pub fn is_empty(&self) -> bool {
        self.material_type == 0
    }
}

/// `Tree` is one octree stored as a flat node sequence with index based child links. The node count written to disk
/// is always derived from the sequence itself.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Result<Tree, FormatError> {
        if nodes.len() > MAX_NODES_PER_TREE {
            return Err(FormatError::TooManyNodes(nodes.len()));
        }
        Ok(Tree { nodes })
    }

    pub fn empty() -> Tree {
        Tree { nodes: Vec::new() }
    }

    pub fn node_count(&self) -> u16 {
        self.nodes.len() as u16
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// `Root` is the content of a dense batch file: a version and exactly [`TREES_PER_BATCH`] octrees.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Root {
    pub version: i32,
    trees: Box<[Tree; TREES_PER_BATCH]>,
}

impl Root {
    pub fn new(version: i32, trees: Vec<Tree>) -> Result<Root, FormatError> {
        let len = trees.len();
        let trees: Box<[Tree; TREES_PER_BATCH]> = trees.try_into().map_err(|_| FormatError::TreeCount(len))?;
        Ok(Root { version, trees })
    }

    /// Creates a root where every slot holds an empty tree.
    pub fn empty(version: i32) -> Root {
        Root { version, trees: Box::new(std::array::from_fn(|_| Tree::empty())) }
    }

    pub fn tree(&self, slot: usize) -> Option<&Tree> {
        self.trees.get(slot)
    }

    pub fn trees(&self) -> &[Tree; TREES_PER_BATCH] {
        &self.trees
    }

    pub fn trees_mut(&mut self) -> &mut [Tree; TREES_PER_BATCH] {
        &mut self.trees
    }

    /// Replaces the tree at `slot` and returns the previous one.
    pub fn set_tree(&mut self, slot: usize, tree: Tree) -> Result<Tree, FormatError> {
        let current = self.trees.get_mut(slot).ok_or(FormatError::SlotOutOfRange(slot))?;
        Ok(std::mem::replace(current, tree))
    }

    pub fn total_nodes(&self) -> usize {
        self.trees.iter().map(|t| t.nodes.len()).sum()
    }
}

/// `BatchPos` addresses a batch inside the world grid.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BatchPos {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl BatchPos {
    pub const fn new(x: i16, y: i16, z: i16) -> BatchPos {
        BatchPos { x, y, z }
    }
}

impl fmt::Display for BatchPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// `PatchTree` replaces the octree at slot `octree_number` of the batch it belongs to.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PatchTree {
    octree_number: u8,
    nodes: Vec<Node>,
}

impl PatchTree {
    pub fn new(octree_number: u8, nodes: Vec<Node>) -> Result<PatchTree, FormatError> {
        if octree_number as usize >= TREES_PER_BATCH {
            return Err(FormatError::SlotOutOfRange(octree_number as usize));
        }
        if nodes.len() > MAX_NODES_PER_TREE {
            return Err(FormatError::TooManyNodes(nodes.len()));
        }
        Ok(PatchTree { octree_number, nodes })
    }

    /// Copies the nodes of `tree` into a patch entry for `slot`.
    pub fn from_tree(slot: usize, tree: &Tree) -> Result<PatchTree, FormatError> {
        let octree_number = u8::try_from(slot).map_err(|_| FormatError::SlotOutOfRange(slot))?;
        PatchTree::new(octree_number, tree.nodes.clone())
    }

    /// Copies a tree of a root into a patch entry. `slot` must address the grid.
    pub(crate) fn from_root_slot(slot: usize, tree: &Tree) -> PatchTree {
        debug_assert!(slot < TREES_PER_BATCH);
        PatchTree { octree_number: slot as u8, nodes: tree.nodes.clone() }
    }

    pub fn octree_number(&self) -> u8 {
        self.octree_number
    }

    pub fn node_count(&self) -> u16 {
        self.nodes.len() as u16
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn to_tree(&self) -> Tree {
        Tree { nodes: self.nodes.clone() }
    }
}

/// `PatchBatch` groups all patched octrees of one batch.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PatchBatch {
    pos: BatchPos,
    octrees: Vec<PatchTree>,
}

impl PatchBatch {
    pub fn new(pos: BatchPos, octrees: Vec<PatchTree>) -> Result<PatchBatch, FormatError> {
        if octrees.len() > MAX_OCTREES_PER_BATCH {
            return Err(FormatError::TooManyOctrees(octrees.len()));
        }
        Ok(PatchBatch { pos, octrees })
    }

    /// Wraps the output of [`crate::diff::diff`], which never holds more than one entry per slot.
    pub(crate) fn from_diff(pos: BatchPos, octrees: Vec<PatchTree>) -> PatchBatch {
        debug_assert!(octrees.len() <= TREES_PER_BATCH);
        PatchBatch { pos, octrees }
    }

    pub fn pos(&self) -> BatchPos {
        self.pos
    }

    pub fn octree_count(&self) -> u8 {
        self.octrees.len() as u8
    }

    pub fn octrees(&self) -> &[PatchTree] {
        &self.octrees
    }

    pub fn is_empty(&self) -> bool {
        self.octrees.is_empty()
    }
}

/// `PatchRoot` is the content of a sparse patch file. The number of batches is not stored on disk.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PatchRoot {
    pub version: i32,
    batches: Vec<PatchBatch>,
}

impl PatchRoot {
    pub fn new(version: i32) -> PatchRoot {
        PatchRoot { version, batches: Vec::new() }
    }

    pub fn with_batches(version: i32, batches: Vec<PatchBatch>) -> PatchRoot {
        PatchRoot { version, batches }
    }

    pub fn push_batch(&mut self, batch: PatchBatch) {
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[PatchBatch] {
        &self.batches
    }

    /// Returns the first batch stored for `pos`, if any.
    pub fn batch(&self, pos: BatchPos) -> Option<&PatchBatch> {
        self.batches.iter().find(|b| b.pos == pos)
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
