//! Read-side access over remote objects.
//!
//! A remote object store (an S3-style service, typically) exposes nothing
//! but byte-range reads. This module re-implements the read half of the
//! engine on that primitive: index pages are fetched with ranged reads at
//! `page_id * PAGE_SIZE`, container records with ranged reads at their
//! indexed offsets. The search and decode algorithms are the exact ones the
//! local readers use — only the page fetch transport differs.
//!
//! The transport itself is the caller's: implement [`RangeSource`] over the
//! client of your choice. Writes are not supported remotely.

use crate::btree::store::PageRead;
use crate::btree::{tree, Values, PAGE_SIZE};
use crate::container::{Payload, MAGIC, SEAL_MARKER};
use crate::error::{Error, Result};
use bytes::Buf;
use std::marker::PhantomData;

/// Byte-range access to a remote object.
///
/// `fetch_range` bounds are inclusive, mirroring HTTP `Range: bytes=a-b`
/// semantics. A fetch overlapping the end of the object may return fewer
/// bytes than requested; callers handle short reads.
pub trait RangeSource {
    /// Fetch the bytes in `[start, end_inclusive]`.
    fn fetch_range(&mut self, start: u64, end_inclusive: u64) -> Result<Vec<u8>>;

    /// Total size of the object in bytes.
    fn file_size(&mut self) -> Result<u64>;
}

/// Read-only page fetch over a [`RangeSource`].
///
/// The object size is fetched once at open and cached; a short final page
/// is zero-padded to [`PAGE_SIZE`] so decoded pages always have the fixed
/// layout.
pub struct RemotePageSource<R: RangeSource> {
    source: R,
    file_size: u64,
}

impl<R: RangeSource> RemotePageSource<R> {
    /// Probe the object size and wrap the source.
    pub fn open(mut source: R) -> Result<Self> {
        let file_size = source.file_size()?;
        log::info!("Opened remote index object ({} bytes)", file_size);
        Ok(Self { source, file_size })
    }

    /// The object size cached at open.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

impl<R: RangeSource> PageRead for RemotePageSource<R> {
    fn read_page(&mut self, page_id: u64) -> Result<Vec<u8>> {
        let offset = page_id * PAGE_SIZE as u64;
        if page_id == 0 || offset >= self.file_size {
            return Err(Error::PageOutOfBounds {
                page_id,
                page_count: self.file_size / PAGE_SIZE as u64,
            });
        }

        let end = (offset + PAGE_SIZE as u64 - 1).min(self.file_size - 1);
        let mut page = self.source.fetch_range(offset, end)?;
        if page.len() > PAGE_SIZE {
            return Err(Error::corruption(format!(
                "Range fetch returned {} bytes for one page",
                page.len()
            )));
        }
        page.resize(PAGE_SIZE, 0);
        Ok(page)
    }

    fn root_page_id(&mut self) -> Result<u64> {
        let bytes = self.source.fetch_range(0, 7)?;
        if bytes.len() < 8 {
            return Err(Error::corruption("Remote object too small for a root pointer"));
        }
        Ok((&bytes[..8]).get_u64())
    }
}

/// B+Tree search over a remote index object.
///
/// Runs the same descent and chain walk as [`crate::BPlusTree::search`],
/// with pages arriving through ranged reads.
pub struct RemoteIndex<R: RangeSource> {
    pages: RemotePageSource<R>,
}

impl<R: RangeSource> RemoteIndex<R> {
    /// Open a remote index object for searching.
    pub fn open(source: R) -> Result<Self> {
        Ok(Self { pages: RemotePageSource::open(source)? })
    }

    /// Search for a key, yielding every value in its chain in insertion
    /// order. Absent keys yield an empty iterator.
    pub fn search(&mut self, key: &[u8]) -> Result<Values<'_, RemotePageSource<R>>> {
        tree::search(&mut self.pages, key)
    }
}

/// Random-access container reads over a remote object.
///
/// The header is parsed once at open with two ranged reads; each
/// [`RemoteContainer::record_at`] call costs two more (length, then body).
pub struct RemoteContainer<H: Payload, P: Payload, R: RangeSource> {
    source: R,
    header: H,
    _payload: PhantomData<P>,
}

impl<H: Payload, P: Payload, R: RangeSource> RemoteContainer<H, P, R> {
    /// Verify the magic and decode the header via ranged reads.
    pub fn open(mut source: R) -> Result<Self> {
        let preamble = source.fetch_range(0, 7)?;
        if preamble.len() < 8 {
            return Err(Error::corruption("Remote object too small for a container preamble"));
        }
        let mut cur = preamble.as_slice();
        let magic = cur.get_i32();
        if magic != MAGIC {
            return Err(Error::InvalidMagic { expected: MAGIC, actual: magic });
        }
        let header_len = cur.get_i32();
        if header_len < 0 {
            return Err(Error::corruption(format!("Negative header length: {}", header_len)));
        }

        let header_bytes = if header_len == 0 {
            Vec::new()
        } else {
            let bytes = source.fetch_range(8, 8 + header_len as u64 - 1)?;
            if bytes.len() != header_len as usize {
                return Err(Error::corruption("Truncated container header"));
            }
            bytes
        };
        let header = H::decode(&header_bytes)?;

        Ok(Self { source, header, _payload: PhantomData })
    }

    /// The decoded container header.
    pub fn header(&self) -> &H {
        &self.header
    }

    /// Decode the record whose length prefix starts at `offset`.
    ///
    /// Same contract as [`crate::RandomAccess::record_at`]: offset 0 is
    /// rejected, the seal marker decodes to `None`.
    pub fn record_at(&mut self, offset: u64) -> Result<Option<P>> {
        if offset == 0 {
            return Err(Error::InvalidOffset(offset));
        }

        let len_bytes = self.source.fetch_range(offset, offset + 3)?;
        if len_bytes.len() < 4 {
            return Err(Error::corruption(format!("Truncated record at offset {}", offset)));
        }
        let record_len = (&len_bytes[..4]).get_i32();

        if record_len == SEAL_MARKER {
            return Ok(None);
        }
        if record_len < 0 {
            return Err(Error::corruption(format!(
                "Invalid record length {} at offset {}",
                record_len, offset
            )));
        }
        if record_len == 0 {
            return P::decode(&[]).map(Some);
        }

        let bytes = self.source.fetch_range(offset + 4, offset + 3 + record_len as u64)?;
        if bytes.len() != record_len as usize {
            return Err(Error::corruption(format!("Truncated record at offset {}", offset)));
        }
        P::decode(&bytes).map(Some)
    }
}
