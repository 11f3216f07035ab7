//! Content store implementations

use super::{BlobType, ContentStore, TableFile};
use crate::model::FileId;
use crate::Result;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

/// Content held in memory only
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<BTreeMap<FileId, Bytes>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryContentStore {
    fn insert(&self, id: &FileId, content: Bytes) -> Result<()> {
        self.blobs.write().insert(id.clone(), content);
        Ok(())
    }

    fn get(&self, id: &FileId) -> Result<Option<Bytes>> {
        Ok(self.blobs.read().get(id).cloned())
    }

    fn remove(&self, id: &FileId) -> Result<Option<Bytes>> {
        Ok(self.blobs.write().remove(id))
    }

    fn keys(&self) -> Result<Vec<FileId>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }
}

/// Content persisted as compressed, checksummed blobs in a [`TableFile`]
pub struct FileContentStore {
    table: TableFile,
}

impl FileContentStore {
    pub fn open_or_create(path: impl AsRef<Path>, compression_level: i32) -> Result<Self> {
        let table = TableFile::open_or_create(path, BlobType::Content, compression_level)?;
        Ok(FileContentStore { table })
    }
}

impl ContentStore for FileContentStore {
    fn insert(&self, id: &FileId, content: Bytes) -> Result<()> {
        self.table.put(id.as_str(), content.to_vec())
    }

    fn get(&self, id: &FileId) -> Result<Option<Bytes>> {
        Ok(self.table.get(id.as_str())?.map(Bytes::from))
    }

    fn remove(&self, id: &FileId) -> Result<Option<Bytes>> {
        Ok(self.table.remove(id.as_str())?.map(Bytes::from))
    }

    fn keys(&self) -> Result<Vec<FileId>> {
        Ok(self.table.keys().into_iter().map(FileId).collect())
    }

    fn sync(&self) -> Result<()> {
        self.table.sync()
    }
}
