use log::debug;

use crate::format::{BatchPos, PatchBatch, PatchTree, Root, Tree};

/// Finds all octrees of `new` that differ from the octree in the same slot of `old`. The entries are copied from
/// `new` and ordered by ascending slot.
///
/// Octrees are compared strictly node by node. Two octrees that describe the same shape with a different child
/// layout are reported as changed. Removing an octree cannot be expressed in a patch, but since both roots always
/// hold all slots, an emptied slot simply shows up as a changed octree with zero nodes.
pub fn diff(old: &Root, new: &Root) -> Vec<PatchTree> {
    let changed: Vec<PatchTree> = old.trees().iter()
        .zip(new.trees().iter())
        .enumerate()
        .filter(|(_, (old_tree, new_tree))| !trees_equal(old_tree, new_tree))
        .map(|(slot, (_, new_tree))| PatchTree::from_root_slot(slot, new_tree))
        .collect();

    debug!("diff found {} changed octrees", changed.len());
    changed
}

/// Same as [`diff`], but wraps the changes into a batch at `pos`. Returns `None` if nothing changed.
pub fn diff_batch(pos: BatchPos, old: &Root, new: &Root) -> Option<PatchBatch> {
    let changed = diff(old, new);
    if changed.is_empty() {
        return None;
    }
    Some(PatchBatch::from_diff(pos, changed))
}

fn trees_equal(a: &Tree, b: &Tree) -> bool {
    a.node_count() == b.node_count() && a.nodes() == b.nodes()
}
