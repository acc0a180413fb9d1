//! Fixed-size block I/O over a single index file.
//!
//! The store exposes whole-page reads and writes only; partial-page I/O
//! never reaches the layers above. Page ids are allocated monotonically and
//! never reused. The 8 bytes at file offset 0 hold the root page id.

use crate::btree::page::{Node, PageType};
use crate::btree::{NO_PAGE, PAGE_SIZE};
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Read-only page access shared by the local store and remote page sources.
///
/// The tree's search algorithms are generic over this trait, so the same
/// code serves both a local file and a ranged-read remote object.
pub trait PageRead {
    /// Read the page with the given id into an owned [`PAGE_SIZE`] buffer.
    fn read_page(&mut self, page_id: u64) -> Result<Vec<u8>>;

    /// Read the root page id stored at offset 0.
    fn root_page_id(&mut self) -> Result<u64>;
}

/// Page-granular storage over a single file.
///
/// Buffers returned by [`PageStore::read_page`] are independent copies, not
/// live views; mutating one has no effect until it is written back.
pub struct PageStore {
    file: File,
    path: PathBuf,
    next_page_id: u64,
}

impl PageStore {
    /// Open a page store, creating and initializing the file if missing.
    ///
    /// A new store starts with a single empty leaf page (id 1) installed as
    /// the root. An existing store derives its allocation cursor from the
    /// file length.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        let len = file.metadata()?.len();

        if len == 0 {
            let mut store = Self { file, path, next_page_id: 1 };
            let root = store.allocate(PageType::Leaf)?;
            store.set_root_page_id(root)?;
            log::info!("Created index file {:?}", store.path);
            Ok(store)
        } else {
            let store = Self { file, path, next_page_id: len / PAGE_SIZE as u64 };
            log::info!("Opened index file {:?} ({} pages)", store.path, store.page_count());
            Ok(store)
        }
    }

    /// Write a full page buffer at the given id.
    pub fn write_page(&mut self, page_id: u64, buf: &[u8]) -> Result<()> {
        if buf.len() != PAGE_SIZE {
            return Err(Error::invalid_argument(format!(
                "page buffer must be {} bytes, got {}",
                PAGE_SIZE,
                buf.len()
            )));
        }
        self.file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Allocate a fresh page of the given type and return its id.
    ///
    /// The page is written immediately as an empty node of that type, so a
    /// subsequent read always observes a well-formed page.
    pub fn allocate(&mut self, page_type: PageType) -> Result<u64> {
        let page_id = self.next_page_id;
        self.next_page_id += 1;

        let node = match page_type {
            PageType::Leaf => Node::Leaf { entries: Vec::new() },
            PageType::Internal => Node::Internal { leftmost_child: 0, entries: Vec::new() },
            PageType::Overflow => Node::Overflow { values: Vec::new(), next: NO_PAGE },
        };
        self.write_page(page_id, &node.encode())?;

        Ok(page_id)
    }

    /// Install a new root page id at offset 0.
    pub fn set_root_page_id(&mut self, page_id: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&page_id.to_be_bytes())?;
        Ok(())
    }

    /// Number of pages allocated so far (excluding the reserved id 0).
    pub fn page_count(&self) -> u64 {
        self.next_page_id.saturating_sub(1)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync the file to durable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Sync and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }
}

impl PageRead for PageStore {
    fn read_page(&mut self, page_id: u64) -> Result<Vec<u8>> {
        if page_id == 0 || page_id >= self.next_page_id {
            return Err(Error::PageOutOfBounds { page_id, page_count: self.page_count() });
        }
        self.file.seek(SeekFrom::Start(page_id * PAGE_SIZE as u64))?;
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn root_page_id(&mut self) -> Result<u64> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 8];
        self.file.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }
}
