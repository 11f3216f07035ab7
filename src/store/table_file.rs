//! Single-file ordered key-value table
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("BLKVAULT")
//!   - version: 4 bytes (u32 LE)
//!   - kind: 4 bytes (blob type byte, zero padded)
//!   - entry_count: 8 bytes (u64 LE)
//!   - index_offset: 8 bytes (u64 LE)
//!   - reserved: 32 bytes
//!
//! [VALUES: variable]
//!   - encoded blobs, appended
//!
//! [INDEX: variable]
//!   - key-sorted array of (key_len u16, key, offset u64, size u64) entries
//! ```
//!
//! The file only grows. Values are appended after whatever is already there,
//! and [`TableFile::sync`] appends a fresh index after them, flushes, and only
//! then points the header at it. A crash before the header write leaves the
//! previous index intact. Removed values and superseded indexes stay in the
//! file as dead bytes.

use crate::store::blob::{Blob, BlobType};
use crate::{Error, Result, MAGIC, VERSION};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HEADER_SIZE: u64 = 64;

/// Location of a value in the file
#[derive(Clone, Copy, Debug)]
struct IndexEntry {
    offset: u64,
    size: u64,
}

/// An ordered key-value table backed by a single file
pub struct TableFile {
    path: PathBuf,
    kind: BlobType,
    compression_level: i32,
    file: RwLock<File>,
    /// Key-ordered index, so enumeration is deterministic
    index: RwLock<BTreeMap<String, IndexEntry>>,
    /// End of the file; the next value or index goes here
    write_offset: RwLock<u64>,
}

impl TableFile {
    /// Create a new, empty table file, truncating anything at `path`
    pub fn create(path: impl AsRef<Path>, kind: BlobType, compression_level: i32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        header[12] = kind.as_byte();
        file.write_all(&header)?;
        file.sync_all()?;

        debug!(path = %path.display(), ?kind, "created table file");

        Ok(TableFile {
            path,
            kind,
            compression_level,
            file: RwLock::new(file),
            index: RwLock::new(BTreeMap::new()),
            write_offset: RwLock::new(HEADER_SIZE),
        })
    }

    /// Open an existing table file
    pub fn open(path: impl AsRef<Path>, kind: BlobType, compression_level: i32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile(format!(
                "{}: invalid magic bytes",
                path.display()
            )));
        }

        let version = u32::from_le_bytes(le_bytes(&header, 8));
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        if BlobType::from_byte(header[12]) != Some(kind) {
            return Err(Error::InvalidFile(format!(
                "{}: table holds kind {}, expected {:?}",
                path.display(),
                header[12],
                kind
            )));
        }

        let entry_count = u64::from_le_bytes(le_bytes(&header, 16));
        let index_offset = u64::from_le_bytes(le_bytes(&header, 24));

        let mut index = BTreeMap::new();
        if index_offset > 0 && entry_count > 0 {
            file.seek(SeekFrom::Start(index_offset))?;
            for _ in 0..entry_count {
                let mut len_buf = [0u8; 2];
                file.read_exact(&mut len_buf)?;
                let key_len = u16::from_le_bytes(len_buf) as usize;

                let mut key_buf = vec![0u8; key_len];
                file.read_exact(&mut key_buf)?;
                let key = String::from_utf8(key_buf)
                    .map_err(|e| Error::Corruption(format!("Index key is not UTF-8: {}", e)))?;

                let mut entry_buf = [0u8; 16];
                file.read_exact(&mut entry_buf)?;
                let offset = u64::from_le_bytes(le_bytes(&entry_buf, 0));
                let size = u64::from_le_bytes(le_bytes(&entry_buf, 8));

                index.insert(key, IndexEntry { offset, size });
            }
        }

        // Bytes past the committed index are values from a session that never
        // synced; leave them alone and append after them
        let write_offset = file.seek(SeekFrom::End(0))?;

        debug!(
            path = %path.display(),
            entries = index.len(),
            "opened table file"
        );

        Ok(TableFile {
            path,
            kind,
            compression_level,
            file: RwLock::new(file),
            index: RwLock::new(index),
            write_offset: RwLock::new(write_offset),
        })
    }

    /// Open the table if the file exists, otherwise create it
    pub fn open_or_create(
        path: impl AsRef<Path>,
        kind: BlobType,
        compression_level: i32,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path, kind, compression_level)
        } else {
            Self::create(path, kind, compression_level)
        }
    }

    /// Insert or overwrite the value at `key`
    pub fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if u16::try_from(key.len()).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key of {} bytes does not fit the index", key.len()),
            )
            .into());
        }

        let encoded = Blob::new(self.kind, value).encode(self.compression_level)?;
        let size = encoded.len() as u64;

        let offset = {
            let mut write_offset = self.write_offset.write();
            let offset = *write_offset;

            let mut file = self.file.write();
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&encoded)?;

            *write_offset = offset + size;
            offset
        };

        self.index
            .write()
            .insert(key.to_string(), IndexEntry { offset, size });

        Ok(())
    }

    /// Read the value at `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = self.index.read().get(key).copied();
        match entry {
            Some(entry) => self.read_entry(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Drop `key` from the index and return its last value
    pub fn remove(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = self.index.write().remove(key);
        match entry {
            Some(entry) => self.read_entry(entry).map(Some),
            None => Ok(None),
        }
    }

    /// All keys, in order
    pub fn keys(&self) -> Vec<String> {
        self.index.read().keys().cloned().collect()
    }

    /// All values, in key order
    pub fn values(&self) -> Result<Vec<Vec<u8>>> {
        let entries: Vec<IndexEntry> = self.index.read().values().copied().collect();
        entries.into_iter().map(|e| self.read_entry(e)).collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    fn read_entry(&self, entry: IndexEntry) -> Result<Vec<u8>> {
        let mut data = vec![0u8; entry.size as usize];
        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(entry.offset))?;
            file.read_exact(&mut data)?;
        }
        Ok(Blob::decode_as(&data, self.kind)?.data)
    }

    /// Append the index, flush, then commit it in the header
    ///
    /// Holds the write offset for the whole call so no `put` can land a value
    /// where the index is being written.
    pub fn sync(&self) -> Result<()> {
        let index = self.index.read();
        let mut write_offset = self.write_offset.write();
        let mut file = self.file.write();

        let index_offset = *write_offset;
        let mut encoded = Vec::new();
        for (key, entry) in index.iter() {
            encoded.extend_from_slice(&(key.len() as u16).to_le_bytes());
            encoded.extend_from_slice(key.as_bytes());
            encoded.extend_from_slice(&entry.offset.to_le_bytes());
            encoded.extend_from_slice(&entry.size.to_le_bytes());
        }
        file.seek(SeekFrom::Start(index_offset))?;
        file.write_all(&encoded)?;
        file.sync_data()?;

        file.seek(SeekFrom::Start(16))?;
        file.write_all(&(index.len() as u64).to_le_bytes())?;
        file.write_all(&index_offset.to_le_bytes())?;
        file.sync_all()?;

        *write_offset = index_offset + encoded.len() as u64;
        Ok(())
    }
}

impl Drop for TableFile {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(path = %self.path.display(), error = %e, "sync on drop failed");
        }
    }
}

fn le_bytes<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[at..at + N]);
    out
}
