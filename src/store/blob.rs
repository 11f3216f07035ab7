//! Blob type - the on-disk envelope for every stored value
//!
//! Encoded layout:
//! ```text
//! [type: 1 byte][digest: 32 bytes][zstd payload: variable]
//! ```
//! The digest covers the type byte and the uncompressed payload.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const DIGEST_LEN: usize = blake3::OUT_LEN;
const PREFIX_LEN: usize = 1 + DIGEST_LEN;

/// Type tag for blobs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobType {
    /// A bincode-encoded file record
    Record,
    /// Raw file content
    Content,
}

impl BlobType {
    pub fn as_byte(&self) -> u8 {
        match self {
            BlobType::Record => 0,
            BlobType::Content => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(BlobType::Record),
            1 => Some(BlobType::Content),
            _ => None,
        }
    }
}

/// A typed chunk of data, compressed and checksummed on the way to disk
#[derive(Clone, Debug)]
pub struct Blob {
    pub blob_type: BlobType,
    /// Raw data (uncompressed)
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(blob_type: BlobType, data: Vec<u8>) -> Self {
        Blob { blob_type, data }
    }

    /// BLAKE3 over the type byte followed by the uncompressed data
    pub fn digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[self.blob_type.as_byte()]);
        hasher.update(&self.data);
        hasher.finalize()
    }

    /// Encode for storage at the given zstd level
    pub fn encode(&self, level: i32) -> Result<Vec<u8>> {
        let compressed = zstd::encode_all(self.data.as_slice(), level)?;
        let mut output = Vec::with_capacity(PREFIX_LEN + compressed.len());
        output.push(self.blob_type.as_byte());
        output.extend_from_slice(self.digest().as_bytes());
        output.extend(compressed);
        Ok(output)
    }

    /// Decode a stored blob, verifying its type tag and digest
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < PREFIX_LEN {
            return Err(Error::Corruption(format!(
                "Blob too short: {} bytes",
                data.len()
            )));
        }

        let blob_type = BlobType::from_byte(data[0])
            .ok_or_else(|| Error::Corruption(format!("Invalid blob type: {}", data[0])))?;

        let mut digest_bytes = [0u8; DIGEST_LEN];
        digest_bytes.copy_from_slice(&data[1..PREFIX_LEN]);
        let expected = blake3::Hash::from(digest_bytes);

        let blob = Blob {
            blob_type,
            data: zstd::decode_all(&data[PREFIX_LEN..])?,
        };

        let actual = blob.digest();
        if actual != expected {
            return Err(Error::Corruption(format!(
                "Digest mismatch: stored {}, computed {}",
                short_hex(&expected),
                short_hex(&actual)
            )));
        }

        Ok(blob)
    }

    /// Decode and require a particular blob type
    pub fn decode_as(data: &[u8], expected: BlobType) -> Result<Self> {
        let blob = Self::decode(data)?;
        if blob.blob_type != expected {
            return Err(Error::Corruption(format!(
                "Expected {:?}, got {:?}",
                expected, blob.blob_type
            )));
        }
        Ok(blob)
    }
}

/// First 12 hex chars of a digest, for error messages
fn short_hex(digest: &blake3::Hash) -> String {
    hex::encode(&digest.as_bytes()[..6])
}
