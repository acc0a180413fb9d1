//! # Streamdex - An Indexed Append-Only Record Store
//!
//! Streamdex is a minimal embedded storage engine built from two tightly
//! coupled pieces: a sequential binary container for length-prefixed
//! records, and an on-disk B+Tree that maps opaque keys to byte offsets
//! inside that container. Records are written once, sequentially, and never
//! rewritten; point lookups go through the index in O(log n) page reads —
//! the classic "write fast, index separately" design of log-structured
//! stores.
//!
//! ## Architecture
//!
//! - **Container Writer**: append-only framing — magic, header, records,
//!   seal marker — reporting each record's offset through a callback
//! - **Container Reader**: a one-pass sequential enumerator, and a
//!   random-access reader decoding one record at a known offset
//! - **B+Tree Index**: duplicate keys supported via per-key overflow chains
//!   with cached tail pointers for O(1) appends
//! - **PageStore**: fixed-size block I/O under the tree, grow-only
//! - **Remote read-side**: the same search and decode algorithms running
//!   over byte-range fetches against a remote object
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use streamdex::{IndexedReader, IndexedWriter};
//!
//! # fn main() -> Result<(), streamdex::Error> {
//! // Write records; keys extracted per record feed the offset index.
//! let mut writer = IndexedWriter::create(
//!     "prices.bin",
//!     "prices.index",
//!     &b"prices-v1".to_vec(),
//!     |record: &Vec<u8>| record.split(|b| *b == b' ').next().map(<[u8]>::to_vec),
//! )?;
//! writer.write(&b"AAPL 187.20".to_vec())?;
//! writer.write(&b"MSFT 402.11".to_vec())?;
//! writer.close()?;
//!
//! // Point lookup: index search, then random-access record fetch.
//! let mut reader: IndexedReader<Vec<u8>, Vec<u8>> =
//!     IndexedReader::open("prices.bin", "prices.index")?;
//! for record in reader.find(b"AAPL")? {
//!     println!("{:?}", record);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! The engine is single-writer by design. Every mutating operation takes
//! `&mut self` and is atomic with respect to other operations on the same
//! instance; sharing a tree between a writer and readers requires a lock
//! held around whole operations (as [`IndexedWriter`] does internally).
//! Nothing is shared implicitly between instances — each owns its file
//! handle and releases it on close or drop.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod btree;
pub mod config;
pub mod container;
pub mod error;
pub mod indexed;
pub mod remote;

// Re-exports
pub use btree::{BPlusTree, Values};
pub use config::Options;
pub use container::{Bincode, ContainerWriter, Enumerator, Payload, RandomAccess};
pub use error::{Error, Result};
pub use indexed::{IndexedReader, IndexedWriter};
pub use remote::{RangeSource, RemoteContainer, RemoteIndex, RemotePageSource};
