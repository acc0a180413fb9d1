//! Error types for the streamdex storage engine.

use std::fmt;
use std::io;

/// The result type used throughout streamdex.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for streamdex operations.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred.
    Io(io::Error),

    /// The file does not start with the expected magic number.
    InvalidMagic {
        /// The magic number the format requires.
        expected: i32,
        /// The value actually read.
        actual: i32,
    },

    /// The record stream ended without a seal marker.
    ///
    /// This is the signal that the writer crashed or the file was never
    /// flushed to completion.
    Unsealed(String),

    /// Data corruption was detected.
    Corruption(String),

    /// A write was attempted after the container was sealed.
    Sealed,

    /// The key exceeds the maximum size supported by the index.
    KeyTooLarge {
        /// Size of the rejected key.
        len: usize,
        /// Maximum permitted key size.
        max: usize,
    },

    /// The value exceeds the maximum size supported by the index.
    ValueTooLarge {
        /// Size of the rejected value.
        len: usize,
        /// Maximum permitted value size.
        max: usize,
    },

    /// A record offset is outside the valid range.
    InvalidOffset(u64),

    /// A page id is outside the allocated extent of the page store.
    PageOutOfBounds {
        /// The requested page id.
        page_id: u64,
        /// Number of pages currently allocated.
        page_count: u64,
    },

    /// An invalid argument was provided.
    InvalidArgument(String),

    /// A serialization or deserialization error occurred.
    Serialization(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new unsealed-file error.
    pub fn unsealed(msg: impl Into<String>) -> Self {
        Error::Unsealed(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::InvalidMagic { expected, actual } => {
                write!(f, "Invalid magic number: expected {:#x}, got {:#x}", expected, actual)
            }
            Error::Unsealed(msg) => write!(f, "Unsealed file: {}", msg),
            Error::Corruption(msg) => write!(f, "Data corruption: {}", msg),
            Error::Sealed => write!(f, "Container is sealed"),
            Error::KeyTooLarge { len, max } => {
                write!(f, "Key too large: {} bytes (max {})", len, max)
            }
            Error::ValueTooLarge { len, max } => {
                write!(f, "Value too large: {} bytes (max {})", len, max)
            }
            Error::InvalidOffset(offset) => write!(f, "Invalid record offset: {}", offset),
            Error::PageOutOfBounds { page_id, page_count } => {
                write!(f, "Page {} out of bounds ({} pages allocated)", page_id, page_count)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
