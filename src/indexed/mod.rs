//! Indexed container store: the container and the B+Tree wired together.
//!
//! The write path feeds the container writer's offset callback straight into
//! the index: every record that yields a key gets `(key, offset)` inserted,
//! with the offset stored as 8 big-endian bytes. The read path inverts it —
//! search the index for a key, then fetch each offset from the container
//! with the random-access reader.

use crate::btree::BPlusTree;
use crate::config::Options;
use crate::container::{ContainerWriter, Payload, RandomAccess};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Container writer that maintains a B+Tree offset index as it writes.
///
/// The key extractor runs on every record; returning `None` skips indexing
/// for that record (a record without a usable key is still written to the
/// container). Inserts happen inside the write call, under a lock held for
/// the whole index operation.
pub struct IndexedWriter<P: Payload> {
    container: ContainerWriter<P>,
    index: Arc<Mutex<BPlusTree>>,
}

impl<P: Payload + 'static> IndexedWriter<P> {
    /// Create a container plus index pair with default options.
    pub fn create<H, Q, F>(data_path: Q, index_path: Q, header: &H, extract_key: F) -> Result<Self>
    where
        H: Payload,
        Q: AsRef<Path>,
        F: Fn(&P) -> Option<Vec<u8>> + Send + 'static,
    {
        Self::with_options(data_path, index_path, header, extract_key, Options::default())
    }

    /// Create a container plus index pair with explicit options.
    pub fn with_options<H, Q, F>(
        data_path: Q,
        index_path: Q,
        header: &H,
        extract_key: F,
        options: Options,
    ) -> Result<Self>
    where
        H: Payload,
        Q: AsRef<Path>,
        F: Fn(&P) -> Option<Vec<u8>> + Send + 'static,
    {
        let index = Arc::new(Mutex::new(BPlusTree::open(index_path)?));

        let sink = Arc::clone(&index);
        let container = ContainerWriter::with_options(data_path, header, options)?.on_write(
            move |offset, record: &P| {
                if let Some(key) = extract_key(record) {
                    sink.lock().insert(&key, &offset.to_be_bytes())?;
                }
                Ok(())
            },
        );

        Ok(Self { container, index })
    }

    /// Write one record, indexing its key if the extractor yields one.
    /// Returns the record's container offset.
    pub fn write(&mut self, record: &P) -> Result<u64> {
        self.container.write(record)
    }

    /// Seal the container's record stream.
    pub fn seal(&mut self) -> Result<()> {
        self.container.seal()
    }

    /// Seal and close the container, then sync and close the index.
    pub fn close(self) -> Result<()> {
        self.container.close()?;
        // Closing the container dropped its callback, releasing the other
        // handle on the index.
        match Arc::try_unwrap(self.index) {
            Ok(index) => index.into_inner().close(),
            Err(shared) => shared.lock().sync(),
        }
    }
}

/// Point lookups against an indexed container.
pub struct IndexedReader<H: Payload, P: Payload> {
    index: BPlusTree,
    records: RandomAccess<H, P>,
}

impl<H: Payload, P: Payload> IndexedReader<H, P> {
    /// Open a container and its index for reading.
    pub fn open<Q: AsRef<Path>>(data_path: Q, index_path: Q) -> Result<Self> {
        let index = BPlusTree::open(index_path)?;
        let records = RandomAccess::open(data_path)?;
        Ok(Self { index, records })
    }

    /// The decoded container header.
    pub fn header(&self) -> &H {
        self.records.header()
    }

    /// Every container offset indexed under `key`, in insertion order.
    pub fn offsets(&mut self, key: &[u8]) -> Result<Vec<u64>> {
        let mut offsets = Vec::new();
        for value in self.index.search(key)? {
            let value = value?;
            if value.len() != 8 {
                return Err(Error::corruption(format!(
                    "Index value for key is {} bytes, expected an 8-byte offset",
                    value.len()
                )));
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&value);
            offsets.push(u64::from_be_bytes(bytes));
        }
        Ok(offsets)
    }

    /// Every record indexed under `key`, fetched in insertion order.
    ///
    /// An absent key returns an empty vector. An indexed offset that points
    /// at the seal marker is skipped.
    pub fn find(&mut self, key: &[u8]) -> Result<Vec<P>> {
        let offsets = self.offsets(key)?;
        let mut records = Vec::with_capacity(offsets.len());
        for offset in offsets {
            if let Some(record) = self.records.record_at(offset)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
