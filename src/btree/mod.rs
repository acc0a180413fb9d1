//! On-disk B+Tree index with duplicate-key support.
//!
//! The tree maps opaque byte keys to small value blobs (typically 8-byte
//! file offsets into a record container). Duplicate keys are supported by
//! storing every value for a key in an overflow chain: a singly-linked list
//! of pages referenced from the key's leaf entry. The leaf caches the chain
//! tail so repeated inserts for the same key append in O(1) page reads.
//!
//! ## File Format
//!
//! ```text
//! [root page id: u64]        // offset 0, big-endian
//! [page 1]                   // pages at id * PAGE_SIZE
//! [page 2]
//! ...
//! ```
//!
//! ## Page Format
//!
//! Every page is 4096 bytes. Byte 0 is the page type, bytes 1..5 the
//! big-endian entry count. The body layout depends on the type:
//!
//! ```text
//! leaf:     { key_len: u32 | key | overflow_head: u64 | overflow_tail: u64 }*
//! internal: leftmost_child: u64, { key_len: u32 | key | right_child: u64 }*
//! overflow: { value_len: u32 | value }*, next page id as i64 in the last
//!           8 bytes (-1 terminates the chain)
//! ```
//!
//! All integers are big-endian. Page ids start at 1; id 0 is reserved for
//! the root pointer slot at the start of the file.

pub mod overflow;
pub mod page;
pub mod store;
pub mod tree;

pub use overflow::Values;
pub use page::{InternalEntry, LeafEntry, Node, PageType};
pub use store::{PageRead, PageStore};
pub use tree::BPlusTree;

/// Size of every page in the index file (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Maximum key size accepted by the index.
pub const MAX_KEY_SIZE: usize = 128;

/// Maximum value size accepted by the index.
pub const MAX_VALUE_SIZE: usize = 8;

/// Size of the common page header (type tag + entry count).
pub const PAGE_HEADER_SIZE: usize = 5;

/// Sentinel page id terminating an overflow chain.
pub const NO_PAGE: i64 = -1;
