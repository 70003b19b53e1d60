use log::trace;

use crate::format::{BatchPos, PatchBatch, PatchRoot, Root};

/// Returns a copy of `root` where every slot addressed by `batch` is replaced with the patched octree. The batch
/// position is not checked against the root, callers pick the matching batch.
pub fn apply_batch(root: &Root, batch: &PatchBatch) -> Root {
    let mut patched = root.clone();
    let trees = patched.trees_mut();
    for octree in batch.octrees() {
        // slots of a `PatchTree` are always inside the grid
        trees[octree.octree_number() as usize] = octree.to_tree();
    }
    trace!("applied {} octrees of batch {}", batch.octree_count(), batch.pos());
    patched
}

/// Applies every batch of `patch` stored for `pos` in file order, so later batches win.
pub fn apply_patch(root: &Root, pos: BatchPos, patch: &PatchRoot) -> Root {
    patch.batches().iter()
        .filter(|batch| batch.pos() == pos)
        .fold(root.clone(), |root, batch| apply_batch(&root, batch))
}

#[cfg(test)]
mod apply_tests {
    use crate::diff::apply::{apply_batch, apply_patch};
    use crate::diff::differ::diff_batch;
    use crate::format::{BatchPos, decode_root, Node, PatchBatch, PatchRoot, PatchTree, Root, Tree};
    use crate::format::root::fixtures;

    #[test]
    fn apply_reverses_diff() {
        let old = decode_root(&fixtures::one_tree_two_nodes()).unwrap();
        let mut new = Root::empty(4);
        new.set_tree(2, Tree::new(vec![Node::new(23, 0, 0)]).unwrap()).unwrap();
        new.set_tree(90, Tree::new(vec![Node::new(0, 126, 1), Node::new(37, 128, 0)]).unwrap()).unwrap();

        let pos = BatchPos::new(12, 18, 12);
        let batch = diff_batch(pos, &old, &new).unwrap();
        assert_eq!(apply_batch(&old, &batch), new);
    }

    #[test]
    fn apply_patch_uses_matching_batches_in_order() {
        let pos = BatchPos::new(0, 0, 0);
        let first = PatchTree::new(5, vec![Node::new(1, 0, 0)]).unwrap();
        let second = PatchTree::new(5, vec![Node::new(2, 0, 0)]).unwrap();
        let other = PatchTree::new(6, vec![Node::new(3, 0, 0)]).unwrap();

        let patch = PatchRoot::with_batches(0, vec![
            PatchBatch::new(pos, vec![first]).unwrap(),
            PatchBatch::new(BatchPos::new(1, 0, 0), vec![other]).unwrap(),
            PatchBatch::new(pos, vec![second]).unwrap(),
        ]);

        let patched = apply_patch(&Root::empty(4), pos, &patch);
        assert_eq!(patched.trees()[5].nodes(), &[Node::new(2, 0, 0)]);
        assert!(patched.trees()[6].is_empty());
        assert_eq!(patched.total_nodes(), 1);
    }
}
