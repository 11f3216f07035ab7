//! The two stores behind a vault
//!
//! Both stores are ordered maps keyed by [`FileId`]. The metadata store holds
//! [`FileRecord`]s, the content store holds raw bytes. Each comes in an
//! in-memory flavour (tests, scratch vaults) and a file-backed flavour built
//! on [`TableFile`].
//!
//! Absence is `Ok(None)`. Errors are reserved for storage faults.

mod blob;
mod content;
mod metadata;
mod table_file;

pub use blob::{Blob, BlobType};
pub use content::{FileContentStore, MemoryContentStore};
pub use metadata::{FileMetadataStore, MemoryMetadataStore};
pub use table_file::TableFile;

use crate::model::{FileId, FileRecord};
use crate::Result;
use bytes::Bytes;

/// Ordered map from file id to metadata record
pub trait MetadataStore: Send + Sync {
    /// Insert or silently overwrite the record at `id`
    fn insert(&self, id: &FileId, record: &FileRecord) -> Result<()>;

    fn get(&self, id: &FileId) -> Result<Option<FileRecord>>;

    /// Every record, in id order
    fn values(&self) -> Result<Vec<FileRecord>>;

    /// Remove and return the record at `id`
    fn remove(&self, id: &FileId) -> Result<Option<FileRecord>>;

    /// Every id, in order
    fn ids(&self) -> Result<Vec<FileId>> {
        Ok(self.values()?.into_iter().map(|r| r.id).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.ids()?.len())
    }

    /// Flush pending writes to durable storage
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Ordered map from file id to raw content
pub trait ContentStore: Send + Sync {
    /// Insert or silently overwrite the content at `id`
    fn insert(&self, id: &FileId, content: Bytes) -> Result<()>;

    fn get(&self, id: &FileId) -> Result<Option<Bytes>>;

    /// Remove and return the content at `id`
    fn remove(&self, id: &FileId) -> Result<Option<Bytes>>;

    /// Every id, in order. Content itself is never listed in bulk.
    fn keys(&self) -> Result<Vec<FileId>>;

    /// Flush pending writes to durable storage
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
