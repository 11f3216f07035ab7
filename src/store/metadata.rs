//! Metadata store implementations

use super::{BlobType, MetadataStore, TableFile};
use crate::model::{FileId, FileRecord};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

/// Metadata held in memory only
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<FileId, FileRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert(&self, id: &FileId, record: &FileRecord) -> Result<()> {
        self.records.write().insert(id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn values(&self) -> Result<Vec<FileRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn remove(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.records.write().remove(id))
    }

    fn ids(&self) -> Result<Vec<FileId>> {
        Ok(self.records.read().keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}

/// Metadata persisted as bincode records in a [`TableFile`]
pub struct FileMetadataStore {
    table: TableFile,
}

impl FileMetadataStore {
    pub fn open_or_create(path: impl AsRef<Path>, compression_level: i32) -> Result<Self> {
        let table = TableFile::open_or_create(path, BlobType::Record, compression_level)?;
        Ok(FileMetadataStore { table })
    }
}

impl MetadataStore for FileMetadataStore {
    fn insert(&self, id: &FileId, record: &FileRecord) -> Result<()> {
        self.table.put(id.as_str(), bincode::serialize(record)?)
    }

    fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        match self.table.get(id.as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn values(&self) -> Result<Vec<FileRecord>> {
        self.table
            .values()?
            .iter()
            .map(|data| bincode::deserialize(data).map_err(Error::from))
            .collect()
    }

    fn remove(&self, id: &FileId) -> Result<Option<FileRecord>> {
        match self.table.remove(id.as_str())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn ids(&self) -> Result<Vec<FileId>> {
        Ok(self.table.keys().into_iter().map(FileId).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.table.len())
    }

    fn sync(&self) -> Result<()> {
        self.table.sync()
    }
}
