//! Container writer: append-only framing with offset reporting.

use crate::config::Options;
use crate::container::{Payload, MAGIC, SEAL_MARKER};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Callback invoked with each record's file offset before it is written.
///
/// The offset points at the record's length prefix, which is exactly what
/// the random-access reader expects back. The typical callback inserts
/// `(record key, offset)` into a [`crate::BPlusTree`].
pub type WriteCallback<P> = Box<dyn FnMut(u64, &P) -> Result<()> + Send>;

/// Append-only writer for a container file.
///
/// Opens the output, immediately writes the magic number and the encoded
/// header, then frames each record as `length | bytes`. The current write
/// offset is tracked internally, so no write ever queries the filesystem for
/// the file size.
///
/// Dropping an unsealed writer seals it best-effort; prefer calling
/// [`ContainerWriter::close`] so errors surface.
pub struct ContainerWriter<P: Payload> {
    writer: BufWriter<File>,
    path: PathBuf,
    write_offset: u64,
    sealed: bool,
    sync_on_close: bool,
    callback: Option<WriteCallback<P>>,
}

impl<P: Payload> ContainerWriter<P> {
    /// Create a container file and write its magic and header.
    pub fn create<H: Payload, Q: AsRef<Path>>(path: Q, header: &H) -> Result<Self> {
        Self::with_options(path, header, Options::default())
    }

    /// Create a container file with explicit options.
    pub fn with_options<H: Payload, Q: AsRef<Path>>(
        path: Q,
        header: &H,
        options: Options,
    ) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();

        let file = File::create(&path)?;
        let mut writer = BufWriter::with_capacity(options.write_buffer_size, file);

        writer.write_all(&MAGIC.to_be_bytes())?;
        let header_bytes = header.encode()?;
        writer.write_all(&(header_bytes.len() as i32).to_be_bytes())?;
        writer.write_all(&header_bytes)?;

        log::info!("Created container {:?} ({} header bytes)", path, header_bytes.len());

        Ok(Self {
            writer,
            path,
            write_offset: 8 + header_bytes.len() as u64,
            sealed: false,
            sync_on_close: options.sync_on_close,
            callback: None,
        })
    }

    /// Install a callback receiving `(offset, record)` on every write.
    pub fn on_write<F>(mut self, callback: F) -> Self
    where
        F: FnMut(u64, &P) -> Result<()> + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Append one record and return the offset its length prefix starts at.
    ///
    /// Fails with [`Error::Sealed`] once the container has been sealed. A
    /// callback error aborts the write before any bytes reach the file.
    pub fn write(&mut self, record: &P) -> Result<u64> {
        if self.sealed {
            return Err(Error::Sealed);
        }

        let bytes = record.encode()?;
        let offset = self.write_offset;

        if let Some(callback) = self.callback.as_mut() {
            callback(offset, record)?;
        }

        self.writer.write_all(&(bytes.len() as i32).to_be_bytes())?;
        self.writer.write_all(&bytes)?;
        self.write_offset += 4 + bytes.len() as u64;

        Ok(offset)
    }

    /// Write the seal marker, ending the record stream.
    ///
    /// Idempotent: sealing an already-sealed container does nothing.
    pub fn seal(&mut self) -> Result<()> {
        if !self.sealed {
            self.writer.write_all(&SEAL_MARKER.to_be_bytes())?;
            self.write_offset += 4;
            self.sealed = true;
        }
        Ok(())
    }

    /// Seal (if not yet sealed), flush, and close the container.
    ///
    /// An unsealed file is the signal readers use to detect a crashed
    /// writer, so closing always seals first.
    pub fn close(mut self) -> Result<()> {
        self.seal()?;
        self.writer.flush()?;
        if self.sync_on_close {
            self.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// The offset the next record would be written at.
    pub fn offset(&self) -> u64 {
        self.write_offset
    }

    /// Whether the seal marker has been written.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: Payload> Drop for ContainerWriter<P> {
    fn drop(&mut self) {
        // Best effort seal and flush on drop
        let _ = self.seal();
        let _ = self.writer.flush();
    }
}
