use thiserror::Error;

use crate::format::types::{MAX_NODES_PER_TREE, MAX_OCTREES_PER_BATCH, TREES_PER_BATCH};

/// `FormatError` is returned when a value is constructed that could not be represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A root was built from a tree count other than [`TREES_PER_BATCH`].
    #[error("a root holds exactly {TREES_PER_BATCH} trees, got {0}")]
    TreeCount(usize),
    /// A tree or patch octree exceeds the `u16` node count.
    #[error("a tree holds at most {MAX_NODES_PER_TREE} nodes, got {0}")]
    TooManyNodes(usize),
    /// A patch batch exceeds the `u8` octree count.
    #[error("a patch batch holds at most {MAX_OCTREES_PER_BATCH} octrees, got {0}")]
    TooManyOctrees(usize),
    /// A slot does not address the 125 slot grid.
    #[error("slot {0} is outside of the {TREES_PER_BATCH} slot grid")]
    SlotOutOfRange(usize),
}

/// `DecodeError` describes why a byte buffer could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended before a value could be read completely.
    #[error("truncated input: need {needed} bytes at offset {offset}, but only {available} are left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A patch octree names a slot outside of the grid. `offset` points at the slot byte.
    #[error("invalid octree slot {slot} at offset {offset}")]
    InvalidSlot { offset: usize, slot: u8 },
    /// Decoded values violate a format limit.
    #[error(transparent)]
    Format(#[from] FormatError),
}
