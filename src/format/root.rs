use log::debug;

use crate::format::cursor::{Reader, Writer};
use crate::format::error::DecodeError;
use crate::format::types::{NODE_SIZE, Root, Tree, TREES_PER_BATCH};

/// Decodes a dense batch file.
///
/// ### Binary format
///
/// ```text
/// i32            version
/// 125 times:
///   u16          node count
///   node count × [u8 material type, u8 signed distance, u16 first child node]
/// ```
///
/// All integers are little-endian. There is no per-tree length prefix besides the node count, so each tree starts
/// right after the previous one. Bytes after the last tree are ignored.
pub fn decode_root(bytes: &[u8]) -> Result<Root, DecodeError> {
    let mut reader = Reader::new(bytes);
    let version = reader.i32()?;

    let mut trees = Vec::with_capacity(TREES_PER_BATCH);
    for _ in 0..TREES_PER_BATCH {
        let node_count = reader.u16()?;
        let nodes = reader.nodes(node_count as usize)?;
        trees.push(Tree::new(nodes)?);
    }

    if !reader.is_at_end() {
        debug!("ignoring {} trailing bytes after the last tree", reader.remaining());
    }

    Ok(Root::new(version, trees)?)
}

/// Returns the exact number of bytes [`encode_root`] produces for `root`.
pub fn encoded_root_len(root: &Root) -> usize {
    4 + root.trees().iter().map(|tree| 2 + tree.nodes().len() * NODE_SIZE).sum::<usize>()
}

/// Encodes `root` into the dense batch format, see [`decode_root`].
pub fn encode_root(root: &Root) -> Vec<u8> {
    let len = encoded_root_len(root);
    let mut writer = Writer::with_len(len);

    write_root(&mut writer, root).unwrap_or_else(|err| unreachable!("root buffer was sized to {len} bytes: {err}"));
    debug!("encoded root v{} with {} nodes into {} bytes", root.version, root.total_nodes(), len);

    writer.into_inner()
}

fn write_root(writer: &mut Writer, root: &Root) -> Result<(), DecodeError> {
    writer.i32(root.version)?;
    for tree in root.trees().iter() {
        writer.u16(tree.node_count())?;
        writer.nodes(tree.nodes())?;
    }
    Ok(())
}


#[cfg(test)]
mod root_codec_tests {
    use crate::format::error::DecodeError;
    use crate::format::root::{decode_root, encode_root, encoded_root_len, fixtures};
    use crate::format::types::{Node, Root, Tree, TREES_PER_BATCH};

    #[test]
    fn decode_one_tree_two_nodes() {
        let root = decode_root(&fixtures::one_tree_two_nodes()).unwrap();

        assert_eq!(root.version, 4);
        assert_eq!(root.trees().len(), TREES_PER_BATCH);
        assert_eq!(root.trees()[0].node_count(), 2);
        assert_eq!(root.trees()[0].nodes(), &[Node::new(37, 128, 2), Node::new(0, 126, 0)]);
        assert!(root.trees()[1..].iter().all(Tree::is_empty));
    }

    #[test]
    fn decode_two_trees() {
        let mut bytes = vec![
            0x04, 0x00, 0x00, 0x00,
            // tree 0
            0x02, 0x00,
            0x25, 0x80, 0x02, 0x00,
            0x00, 0x7E, 0x00, 0x00,
            // tree 1
            0x03, 0x00,
            0x10, 0x40, 0x01, 0x00,
            0x11, 0x41, 0x02, 0x00,
            0x12, 0x42, 0x00, 0x00,
        ];
        bytes.resize(bytes.len() + 123 * 2, 0x00);

        let root = decode_root(&bytes).unwrap();

        assert_eq!(root.version, 4);
        assert_eq!(root.trees()[0].nodes(), &[Node::new(37, 128, 2), Node::new(0, 126, 0)]);
        assert_eq!(root.trees()[1].nodes(), &[Node::new(16, 64, 1), Node::new(17, 65, 2), Node::new(18, 66, 0)]);
        assert_eq!(root.total_nodes(), 5);
    }

    #[test]
    fn encode_reproduces_input() {
        let bytes = fixtures::one_tree_two_nodes();
        let root = decode_root(&bytes).unwrap();

        assert_eq!(encoded_root_len(&root), bytes.len());
        assert_eq!(encode_root(&root), bytes);
    }

    #[test]
    fn decode_reproduces_encoded_root() {
        let mut root = Root::empty(-7);
        root.set_tree(0, Tree::new(vec![Node::new(1, 2, 1), Node::new(3, 4, 0)]).unwrap()).unwrap();
        root.set_tree(64, Tree::new(vec![Node::new(255, 252, 0xABCD); 9]).unwrap()).unwrap();
        root.set_tree(124, Tree::new(vec![Node::new(23, 0, 0)]).unwrap()).unwrap();

        let bytes = encode_root(&root);
        assert_eq!(bytes.len(), 4 + 125 * 2 + 12 * 4);
        assert_eq!(decode_root(&bytes).unwrap(), root);
    }

    #[test]
    fn decode_empty_root() {
        let mut bytes = vec![0x01, 0x00, 0x00, 0x00];
        bytes.resize(4 + 125 * 2, 0x00);
        assert_eq!(decode_root(&bytes).unwrap(), Root::empty(1));
    }

    #[test]
    fn decode_truncated() {
        let bytes = fixtures::one_tree_two_nodes();

        // missing node count of the last tree
        let err = decode_root(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: bytes.len() - 2, needed: 2, available: 1 });

        // node count claims more nodes than are left
        let err = decode_root(&bytes[..10]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 6, needed: 8, available: 4 });

        // version only partially present
        let err = decode_root(&bytes[..3]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 0, needed: 4, available: 3 });
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = fixtures::one_tree_two_nodes();
        let expected = decode_root(&bytes).unwrap();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode_root(&bytes).unwrap(), expected);
    }
}
