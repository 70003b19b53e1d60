//! Little-endian primitives shared by the root and patch codecs.
//!
//! All accessors are bounds-checked: reading or writing past the end of a buffer is reported as
//! [`DecodeError::Truncated`] instead of panicking.

use crate::format::error::DecodeError;
use crate::format::types::{Node, NODE_SIZE};

fn range(len: usize, offset: usize, needed: usize) -> Result<std::ops::Range<usize>, DecodeError> {
    let truncated = DecodeError::Truncated { offset, needed, available: len.saturating_sub(offset) };
    let end = offset.checked_add(needed).ok_or(truncated.clone())?;
    if end > len {
        return Err(truncated);
    }
    Ok(offset..end)
}

fn read_exact<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    let range = range(buf.len(), offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[range]);
    Ok(out)
}

fn write_exact<const N: usize>(buf: &mut [u8], offset: usize, bytes: [u8; N]) -> Result<(), DecodeError> {
    let range = range(buf.len(), offset, N)?;
    buf[range].copy_from_slice(&bytes);
    Ok(())
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, DecodeError> {
    Ok(read_exact::<1>(buf, offset)?[0])
}

pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    Ok(u16::from_le_bytes(read_exact(buf, offset)?))
}

pub fn read_i16_le(buf: &[u8], offset: usize) -> Result<i16, DecodeError> {
    Ok(i16::from_le_bytes(read_exact(buf, offset)?))
}

pub fn read_i32_le(buf: &[u8], offset: usize) -> Result<i32, DecodeError> {
    Ok(i32::from_le_bytes(read_exact(buf, offset)?))
}

/// Reads one node record: material type, signed distance and the first child index (LE16).
pub fn read_node(buf: &[u8], offset: usize) -> Result<Node, DecodeError> {
    let bytes = read_exact::<NODE_SIZE>(buf, offset)?;
    Ok(Node {
        material_type: bytes[0],
        signed_distance: bytes[1],
        first_child_node: u16::from_le_bytes([bytes[2], bytes[3]]),
    })
}

pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<(), DecodeError> {
    write_exact(buf, offset, [value])
}

pub fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) -> Result<(), DecodeError> {
    write_exact(buf, offset, value.to_le_bytes())
}

pub fn write_i16_le(buf: &mut [u8], offset: usize, value: i16) -> Result<(), DecodeError> {
    write_exact(buf, offset, value.to_le_bytes())
}

pub fn write_i32_le(buf: &mut [u8], offset: usize, value: i32) -> Result<(), DecodeError> {
    write_exact(buf, offset, value.to_le_bytes())
}

pub fn write_node(buf: &mut [u8], offset: usize, node: &Node) -> Result<(), DecodeError> {
    let [lo, hi] = node.first_child_node.to_le_bytes();
    write_exact(buf, offset, [node.material_type, node.signed_distance, lo, hi])
}

/// `Reader` walks a byte buffer front to back. Each read advances the cursor by the size of the
/// value read. A failed read leaves the cursor untouched.
pub struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.buf.len()
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        let value = read_u8(self.buf, self.offset)?;
        self.offset += 1;
        Ok(value)
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        let value = read_u16_le(self.buf, self.offset)?;
        self.offset += 2;
        Ok(value)
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        let value = read_i16_le(self.buf, self.offset)?;
        self.offset += 2;
        Ok(value)
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        let value = read_i32_le(self.buf, self.offset)?;
        self.offset += 4;
        Ok(value)
    }

    pub fn node(&mut self) -> Result<Node, DecodeError> {
        let value = read_node(self.buf, self.offset)?;
        self.offset += NODE_SIZE;
        Ok(value)
    }

    /// Reads `count` consecutive nodes. The whole run is bounds-checked up front, so a bogus count
    /// fails before anything is allocated.
    pub fn nodes(&mut self, count: usize) -> Result<Vec<Node>, DecodeError> {
        range(self.buf.len(), self.offset, count * NODE_SIZE)?;
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(self.node()?);
        }
        Ok(nodes)
    }
}

/// `Writer` fills a zero-initialized buffer of a precomputed size front to back.
pub struct Writer {
    buf: Vec<u8>,
    offset: usize,
}

impl Writer {
    pub fn with_len(len: usize) -> Writer {
        Writer { buf: vec![0; len], offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn u8(&mut self, value: u8) -> Result<(), DecodeError> {
        write_u8(&mut self.buf, self.offset, value)?;
        self.offset += 1;
        Ok(())
    }

    pub fn u16(&mut self, value: u16) -> Result<(), DecodeError> {
        write_u16_le(&mut self.buf, self.offset, value)?;
        self.offset += 2;
        Ok(())
    }

    pub fn i16(&mut self, value: i16) -> Result<(), DecodeError> {
        write_i16_le(&mut self.buf, self.offset, value)?;
        self.offset += 2;
        Ok(())
    }

    pub fn i32(&mut self, value: i32) -> Result<(), DecodeError> {
        write_i32_le(&mut self.buf, self.offset, value)?;
        self.offset += 4;
        Ok(())
    }

    pub fn nodes(&mut self, nodes: &[Node]) -> Result<(), DecodeError> {
        for node in nodes {
            write_node(&mut self.buf, self.offset, node)?;
            self.offset += NODE_SIZE;
        }
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod primitive_tests {
    use crate::format::cursor::*;
    use crate::format::error::DecodeError;
    use crate::format::types::Node;

    #[test]
    fn read_little_endian() {
        let buf = [0x04, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0x02, 0x01];
        assert_eq!(read_i32_le(&buf, 0).unwrap(), 4);
        assert_eq!(read_i16_le(&buf, 4).unwrap(), -2);
        assert_eq!(read_u16_le(&buf, 4).unwrap(), 0xFFFE);
        assert_eq!(read_u16_le(&buf, 6).unwrap(), 0x0102);
        assert_eq!(read_i32_le(&[0xFF, 0xFF, 0xFF, 0x80], 0).unwrap(), i32::from_le_bytes([0xFF, 0xFF, 0xFF, 0x80]));
    }

    #[test]
    fn read_node_record() {
        let buf = [0x00, 0x25, 0x80, 0x02, 0x00];
        assert_eq!(read_node(&buf, 1).unwrap(), Node::new(37, 128, 2));
    }

    #[test]
    fn reads_are_bounds_checked() {
        let buf = [0x01, 0x02, 0x03];
        assert_eq!(read_i32_le(&buf, 0), Err(DecodeError::Truncated { offset: 0, needed: 4, available: 3 }));
        assert_eq!(read_u16_le(&buf, 2), Err(DecodeError::Truncated { offset: 2, needed: 2, available: 1 }));
        assert_eq!(read_node(&buf, 5), Err(DecodeError::Truncated { offset: 5, needed: 4, available: 0 }));
        assert_eq!(read_u8(&buf, usize::MAX), Err(DecodeError::Truncated { offset: usize::MAX, needed: 1, available: 0 }));
    }

    #[test]
    fn write_little_endian() {
        let mut buf = [0u8; 12];
        write_i32_le(&mut buf, 0, -2).unwrap();
        write_i16_le(&mut buf, 4, -4).unwrap();
        write_u16_le(&mut buf, 6, 0x0102).unwrap();
        write_node(&mut buf, 8, &Node::new(37, 128, 2)).unwrap();
        assert_eq!(buf, [0xFE, 0xFF, 0xFF, 0xFF, 0xFC, 0xFF, 0x02, 0x01, 0x25, 0x80, 0x02, 0x00]);

        assert_eq!(write_u16_le(&mut buf, 11, 1), Err(DecodeError::Truncated { offset: 11, needed: 2, available: 1 }));
        assert_eq!(buf[11], 0x00);
    }
}
