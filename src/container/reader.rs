//! Container readers: sequential enumeration and random offset access.
//!
//! Both access modes parse the same header framing, then diverge: the
//! enumerator walks the record stream once from the front, while the
//! random-access reader seeks straight to offsets handed out by the writer
//! callback (usually retrieved from a B+Tree index).

use crate::container::{Payload, MAGIC, SEAL_MARKER};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Read and verify the container preamble, returning the decoded header.
fn read_header<H: Payload, R: Read>(reader: &mut R) -> Result<H> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(truncated_header)?;
    let magic = i32::from_be_bytes(magic);
    if magic != MAGIC {
        return Err(Error::InvalidMagic { expected: MAGIC, actual: magic });
    }

    let mut len = [0u8; 4];
    reader.read_exact(&mut len).map_err(truncated_header)?;
    let header_len = i32::from_be_bytes(len);
    if header_len < 0 {
        return Err(Error::corruption(format!("Negative header length: {}", header_len)));
    }

    let mut header_bytes = vec![0u8; header_len as usize];
    reader.read_exact(&mut header_bytes).map_err(truncated_header)?;
    H::decode(&header_bytes)
}

fn truncated_header(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::corruption("Truncated container header")
    } else {
        Error::Io(err)
    }
}

/// One-pass sequential reader over a container's record stream.
///
/// The sequence is finite and not restartable: once the seal marker has been
/// observed (or an error returned), the enumerator is exhausted. Reaching
/// end-of-file without ever seeing the seal raises [`Error::Unsealed`] —
/// the file was truncated or its writer crashed.
pub struct Enumerator<H: Payload, P: Payload> {
    reader: BufReader<File>,
    path: PathBuf,
    header: H,
    seal_reached: bool,
    poisoned: bool,
    _payload: PhantomData<P>,
}

impl<H: Payload, P: Payload> Enumerator<H, P> {
    /// Open a container and decode its header.
    pub fn open<Q: AsRef<Path>>(path: Q) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let header = read_header(&mut reader)?;

        Ok(Self { reader, path, header, seal_reached: false, poisoned: false, _payload: PhantomData })
    }

    /// The decoded container header.
    pub fn header(&self) -> &H {
        &self.header
    }

    /// Read the next record, or `None` once the seal marker is reached.
    pub fn next_record(&mut self) -> Result<Option<P>> {
        if self.seal_reached {
            return Ok(None);
        }

        let mut len = [0u8; 4];
        match self.reader.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                log::warn!("Container {:?} ended without a seal marker", self.path);
                return Err(Error::unsealed(format!(
                    "{:?} ended before its seal marker; the writer did not finish",
                    self.path
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let record_len = i32::from_be_bytes(len);
        if record_len == SEAL_MARKER {
            self.seal_reached = true;
            return Ok(None);
        }
        if record_len < 0 {
            return Err(Error::corruption(format!("Invalid record length: {}", record_len)));
        }

        let mut bytes = vec![0u8; record_len as usize];
        match self.reader.read_exact(&mut bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // A record cut short is the same crashed-writer signal as a
                // missing seal.
                log::warn!("Container {:?} truncated mid-record", self.path);
                return Err(Error::unsealed(format!(
                    "{:?} truncated inside a record; the writer did not finish",
                    self.path
                )));
            }
            Err(e) => return Err(e.into()),
        }

        P::decode(&bytes).map(Some)
    }

    /// Whether the seal marker has been observed.
    pub fn seal_reached(&self) -> bool {
        self.seal_reached
    }
}

impl<H: Payload, P: Payload> Iterator for Enumerator<H, P> {
    type Item = Result<P>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.poisoned = true;
                Some(Err(e))
            }
        }
    }
}

/// Random-access reader decoding exactly one record per call.
///
/// Offsets must be the length-prefix offsets reported by the writer's
/// callback. Each call is independent: the reader seeks, decodes one frame,
/// and has no notion of a current position or "next" record.
pub struct RandomAccess<H: Payload, P: Payload> {
    file: File,
    header: H,
    _payload: PhantomData<P>,
}

impl<H: Payload, P: Payload> RandomAccess<H, P> {
    /// Open a container, verifying its magic and decoding its header.
    pub fn open<Q: AsRef<Path>>(path: Q) -> Result<Self> {
        let mut file = File::open(path)?;
        let header = read_header(&mut file)?;
        Ok(Self { file, header, _payload: PhantomData })
    }

    /// The decoded container header.
    pub fn header(&self) -> &H {
        &self.header
    }

    /// Decode the record whose length prefix starts at `offset`.
    ///
    /// Returns `None` if the offset points exactly at the seal marker.
    /// Offset 0 always falls inside the header region and is rejected with
    /// [`Error::InvalidOffset`] before any I/O.
    pub fn record_at(&mut self, offset: u64) -> Result<Option<P>> {
        if offset == 0 {
            return Err(Error::InvalidOffset(offset));
        }

        self.file.seek(SeekFrom::Start(offset))?;

        let mut len = [0u8; 4];
        self.file.read_exact(&mut len).map_err(|e| truncated_record(e, offset))?;
        let record_len = i32::from_be_bytes(len);

        if record_len == SEAL_MARKER {
            return Ok(None);
        }
        if record_len < 0 {
            return Err(Error::corruption(format!(
                "Invalid record length {} at offset {}",
                record_len, offset
            )));
        }

        let mut bytes = vec![0u8; record_len as usize];
        self.file.read_exact(&mut bytes).map_err(|e| truncated_record(e, offset))?;

        P::decode(&bytes).map(Some)
    }
}

fn truncated_record(err: std::io::Error, offset: u64) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::corruption(format!("Truncated record at offset {}", offset))
    } else {
        Error::Io(err)
    }
}
