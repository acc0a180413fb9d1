//! Page serialization for the B+Tree index.
//!
//! Pages are decoded into a tagged union over the three page roles and
//! encoded back to fixed-size byte buffers. The type tag and entry count are
//! the only position-independent header fields; everything past byte 5 is
//! laid out per type.

use crate::btree::{PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// The three page roles in the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    /// Terminal page holding sorted key entries.
    Leaf = 1,
    /// Routing page holding separator keys and child pointers.
    Internal = 2,
    /// Chain segment holding values for a single key.
    Overflow = 3,
}

impl PageType {
    /// Convert from u8 to PageType
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PageType::Leaf),
            2 => Ok(PageType::Internal),
            3 => Ok(PageType::Overflow),
            _ => Err(Error::corruption(format!("Invalid page type: {}", value))),
        }
    }
}

/// One key entry in a leaf page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    /// The key, unique across the whole tree.
    pub key: Vec<u8>,
    /// First page of the key's overflow chain.
    pub overflow_head: u64,
    /// Last page of the key's overflow chain, cached for O(1) appends.
    pub overflow_tail: u64,
}

/// One separator entry in an internal page.
///
/// Keys in the child right of this entry are `>=` the separator and `<` the
/// next entry's separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalEntry {
    /// The separator key.
    pub key: Vec<u8>,
    /// Child subtree holding keys at or above the separator.
    pub right_child: u64,
}

/// A decoded page: tagged union over the three page roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Leaf page with entries sorted by key.
    Leaf {
        /// Key entries in unsigned lexicographic order.
        entries: Vec<LeafEntry>,
    },
    /// Internal routing page.
    Internal {
        /// Child holding all keys below the first separator.
        leftmost_child: u64,
        /// Separator entries in unsigned lexicographic order.
        entries: Vec<InternalEntry>,
    },
    /// Overflow chain segment.
    Overflow {
        /// Value blobs stored in this segment, in append order.
        values: Vec<Vec<u8>>,
        /// Next page of the chain, or [`crate::btree::NO_PAGE`] at the tail.
        next: i64,
    },
}

impl Node {
    /// The page type tag of this node.
    pub fn page_type(&self) -> PageType {
        match self {
            Node::Leaf { .. } => PageType::Leaf,
            Node::Internal { .. } => PageType::Internal,
            Node::Overflow { .. } => PageType::Overflow,
        }
    }

    /// Encode the node into a full [`PAGE_SIZE`] buffer.
    ///
    /// Callers must stay within the size budgets ([`leaf_size`],
    /// [`internal_size`]); an oversized node is a logic error upstream.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(PAGE_SIZE);
        match self {
            Node::Leaf { entries } => {
                buf.put_u8(PageType::Leaf as u8);
                buf.put_u32(entries.len() as u32);
                for e in entries {
                    buf.put_u32(e.key.len() as u32);
                    buf.put_slice(&e.key);
                    buf.put_u64(e.overflow_head);
                    buf.put_u64(e.overflow_tail);
                }
                assert!(buf.len() <= PAGE_SIZE, "leaf page exceeds PAGE_SIZE");
                buf.resize(PAGE_SIZE, 0);
            }
            Node::Internal { leftmost_child, entries } => {
                buf.put_u8(PageType::Internal as u8);
                buf.put_u32(entries.len() as u32);
                buf.put_u64(*leftmost_child);
                for e in entries {
                    buf.put_u32(e.key.len() as u32);
                    buf.put_slice(&e.key);
                    buf.put_u64(e.right_child);
                }
                assert!(buf.len() <= PAGE_SIZE, "internal page exceeds PAGE_SIZE");
                buf.resize(PAGE_SIZE, 0);
            }
            Node::Overflow { values, next } => {
                buf.put_u8(PageType::Overflow as u8);
                buf.put_u32(values.len() as u32);
                for v in values {
                    buf.put_u32(v.len() as u32);
                    buf.put_slice(v);
                }
                assert!(buf.len() <= PAGE_SIZE - 8, "overflow page exceeds PAGE_SIZE");
                buf.resize(PAGE_SIZE - 8, 0);
                buf.put_i64(*next);
            }
        }
        buf.to_vec()
    }

    /// Decode a node from a full [`PAGE_SIZE`] buffer.
    pub fn decode(buf: &[u8]) -> Result<Node> {
        if buf.len() != PAGE_SIZE {
            return Err(Error::corruption(format!(
                "Page size mismatch: expected {}, got {}",
                PAGE_SIZE,
                buf.len()
            )));
        }

        let page_type = PageType::from_u8(buf[0])?;
        let count = (&buf[1..PAGE_HEADER_SIZE]).get_u32() as usize;
        // No entry encoding is smaller than its 4-byte length prefix, so a
        // count beyond this is corrupt before anything is read.
        if count > PAGE_SIZE / 4 {
            return Err(Error::corruption(format!("Entry count {} exceeds page capacity", count)));
        }

        match page_type {
            PageType::Leaf => {
                let mut cur = &buf[PAGE_HEADER_SIZE..];
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = read_blob(&mut cur)?;
                    if cur.remaining() < 16 {
                        return Err(Error::corruption("Truncated leaf entry"));
                    }
                    let overflow_head = cur.get_u64();
                    let overflow_tail = cur.get_u64();
                    entries.push(LeafEntry { key, overflow_head, overflow_tail });
                }
                Ok(Node::Leaf { entries })
            }
            PageType::Internal => {
                let mut cur = &buf[PAGE_HEADER_SIZE..];
                if cur.remaining() < 8 {
                    return Err(Error::corruption("Truncated internal page"));
                }
                let leftmost_child = cur.get_u64();
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = read_blob(&mut cur)?;
                    if cur.remaining() < 8 {
                        return Err(Error::corruption("Truncated internal entry"));
                    }
                    let right_child = cur.get_u64();
                    entries.push(InternalEntry { key, right_child });
                }
                Ok(Node::Internal { leftmost_child, entries })
            }
            PageType::Overflow => {
                let mut cur = &buf[PAGE_HEADER_SIZE..PAGE_SIZE - 8];
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(read_blob(&mut cur)?);
                }
                let next = (&buf[PAGE_SIZE - 8..]).get_i64();
                Ok(Node::Overflow { values, next })
            }
        }
    }
}

/// Read one length-prefixed blob, guarding against corrupt lengths.
fn read_blob(cur: &mut &[u8]) -> Result<Vec<u8>> {
    if cur.remaining() < 4 {
        return Err(Error::corruption("Truncated length prefix"));
    }
    let len = cur.get_u32() as usize;
    if len > cur.remaining() {
        return Err(Error::corruption(format!("Blob length {} exceeds page bounds", len)));
    }
    let mut blob = vec![0u8; len];
    cur.copy_to_slice(&mut blob);
    Ok(blob)
}

/// Encoded size of a leaf page holding `entries`, header included.
pub fn leaf_size(entries: &[LeafEntry]) -> usize {
    PAGE_HEADER_SIZE + entries.iter().map(|e| 4 + e.key.len() + 16).sum::<usize>()
}

/// Encoded size of an internal page holding `entries`, header and leftmost
/// child pointer included.
pub fn internal_size(entries: &[InternalEntry]) -> usize {
    PAGE_HEADER_SIZE + 8 + entries.iter().map(|e| 4 + e.key.len() + 8).sum::<usize>()
}

/// Size budget a leaf must satisfy before it is written.
pub const LEAF_SIZE_BUDGET: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Size budget an internal page must satisfy before it is written.
pub const INTERNAL_SIZE_BUDGET: usize = PAGE_SIZE - PAGE_HEADER_SIZE - 8;

/// Bytes used in an overflow page holding `values`, header included but not
/// the trailing next-pointer.
pub fn overflow_used(values: &[Vec<u8>]) -> usize {
    PAGE_HEADER_SIZE + values.iter().map(|v| 4 + v.len()).sum::<usize>()
}
