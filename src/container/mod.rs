//! Append-only record container format.
//!
//! A container is a single sequentially-written file holding a header and a
//! stream of length-prefixed records, terminated by a seal marker:
//!
//! ```text
//! MAGIC            i32  = 0x1973
//! header_length    i32
//! header_bytes     [header_length]
//! repeat:
//!   record_length  i32
//!   record_bytes   [record_length]
//! SEAL             i32  = -1
//! ```
//!
//! All integers are big-endian. A file without the seal marker was never
//! closed cleanly; readers treat that as a crashed write, not a clean end.
//!
//! The container never inspects record contents. Headers and records pass
//! through the [`Payload`] codec boundary as opaque byte strings of known
//! length, so any schema layer (protobuf-style, bincode, raw bytes) plugs in
//! from outside.

pub mod reader;
pub mod writer;

pub use reader::{Enumerator, RandomAccess};
pub use writer::ContainerWriter;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic number opening every container file.
pub const MAGIC: i32 = 0x1973;

/// Length sentinel terminating the record stream.
pub const SEAL_MARKER: i32 = -1;

/// Codec boundary for container headers and records.
///
/// The container core only needs a byte encoding of known length in each
/// direction; schema concerns stay entirely on the caller's side of this
/// trait.
pub trait Payload: Sized {
    /// Encode the payload to its byte form.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode a payload from its byte form.
    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// Raw byte payloads pass through unchanged.
impl Payload for Vec<u8> {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

/// Adapter making any serde type a container payload via bincode.
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use streamdex::{Bincode, ContainerWriter};
///
/// #[derive(Serialize, Deserialize)]
/// struct Quote {
///     name: String,
///     price: f64,
/// }
///
/// # fn main() -> Result<(), streamdex::Error> {
/// let mut writer = ContainerWriter::create("quotes.bin", &b"v1".to_vec())?;
/// writer.write(&Bincode(Quote { name: "AAPL".into(), price: 187.2 }))?;
/// writer.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Bincode<T>(pub T);

impl<T: Serialize + DeserializeOwned> Payload for Bincode<T> {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.0)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Bincode(bincode::deserialize(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_vec_payload_identity() {
        let data = b"opaque bytes".to_vec();
        let encoded = data.encode().unwrap();
        assert_eq!(encoded, data);
        assert_eq!(Vec::<u8>::decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_bincode_payload_roundtrip() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Header {
            source: String,
            version: u32,
        }

        let header = Bincode(Header { source: "test".to_string(), version: 3 });
        let encoded = header.encode().unwrap();
        let decoded = Bincode::<Header>::decode(&encoded).unwrap();
        assert_eq!(decoded.0, header.0);
    }

    #[test]
    fn test_bincode_decode_garbage_fails() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Header {
            source: String,
        }

        let result = Bincode::<Header>::decode(&[0xFF; 3]);
        assert!(result.is_err());
    }
}
