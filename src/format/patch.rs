use log::{debug, trace};

use crate::format::cursor::{Reader, Writer};
use crate::format::error::DecodeError;
use crate::format::types::{BatchPos, NODE_SIZE, PatchBatch, PatchRoot, PatchTree, TREES_PER_BATCH};

/// Decodes a sparse patch file.
///
/// ### Binary format
///
/// ```text
/// i32            version
/// until the end of the buffer:
///   i16 x, i16 y, i16 z
///   u8           octree count
///   octree count times:
///     u8         octree number (slot 0..125)
///     u16        node count
///     node count × [u8 material type, u8 signed distance, u16 first child node]
/// ```
///
/// Patches written by the game always carry a single node per octree. Larger octrees are decoded in full so that
/// patches produced by [`crate::diff::diff`] survive a round trip.
pub fn decode_patch(bytes: &[u8]) -> Result<PatchRoot, DecodeError> {
    let mut reader = Reader::new(bytes);
    let mut root = PatchRoot::new(reader.i32()?);

    while !reader.is_at_end() {
        let batch = read_batch(&mut reader)?;
        trace!("decoded patch batch {} with {} octrees", batch.pos(), batch.octree_count());
        root.push_batch(batch);
    }

    debug!("decoded patch v{} with {} batches from {} bytes", root.version, root.batches().len(), bytes.len());
    Ok(root)
}

fn read_batch(reader: &mut Reader) -> Result<PatchBatch, DecodeError> {
    let pos = BatchPos::new(reader.i16()?, reader.i16()?, reader.i16()?);
    let octree_count = reader.u8()?;

    let mut octrees = Vec::with_capacity(octree_count as usize);
    for _ in 0..octree_count {
        let offset = reader.offset();
        let octree_number = reader.u8()?;
        if octree_number as usize >= TREES_PER_BATCH {
            return Err(DecodeError::InvalidSlot { offset, slot: octree_number });
        }

        let node_count = reader.u16()?;
        let nodes = reader.nodes(node_count as usize)?;
        octrees.push(PatchTree::new(octree_number, nodes)?);
    }

    Ok(PatchBatch::new(pos, octrees)?)
}

/// Returns the exact number of bytes [`encode_patch`] produces for `patch`.
pub fn encoded_patch_len(patch: &PatchRoot) -> usize {
    let batches: usize = patch.batches().iter()
        .map(|batch| {
            let octrees: usize = batch.octrees().iter()
                .map(|octree| 1 + 2 + octree.nodes().len() * NODE_SIZE)
                .sum();
            6 + 1 + octrees
        })
        .sum();
    4 + batches
}

/// Encodes `patch` into the sparse patch format, see [`decode_patch`]. Every node held by an octree is written.
pub fn encode_patch(patch: &PatchRoot) -> Vec<u8> {
    let len = encoded_patch_len(patch);
    let mut writer = Writer::with_len(len);

    write_patch(&mut writer, patch).unwrap_or_else(|err| unreachable!("patch buffer was sized to {len} bytes: {err}"));
    debug!("encoded patch v{} with {} batches into {} bytes", patch.version, patch.batches().len(), len);

    writer.into_inner()
}

fn write_patch(writer: &mut Writer, patch: &PatchRoot) -> Result<(), DecodeError> {
    writer.i32(patch.version)?;
    for batch in patch.batches() {
        let pos = batch.pos();
        writer.i16(pos.x)?;
        writer.i16(pos.y)?;
        writer.i16(pos.z)?;
        writer.u8(batch.octree_count())?;

        for octree in batch.octrees() {
            writer.u8(octree.octree_number())?;
            writer.u16(octree.node_count())?;
            writer.nodes(octree.nodes())?;
        }
    }
    Ok(())
}
