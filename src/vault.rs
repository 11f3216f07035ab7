//! High-level Vault API
//!
//! A [`Vault`] pairs a metadata store with a content store and keeps them in
//! step: upload writes both, delete removes both, update touches metadata
//! only. Neither pair of writes is transactional. A failure between the two
//! leaves an orphan behind, which [`Vault::check`] reports and
//! [`Vault::repair`] removes.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::model::{FileId, FileRecord};
use crate::store::{
    ContentStore, FileContentStore, FileMetadataStore, MemoryContentStore, MemoryMetadataStore,
    MetadataStore,
};
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The file vault
///
/// Safe to share between threads. Mutations, `check` and `sync` are
/// serialized by an internal lock so the two-store sequences of different
/// calls never interleave; `list_all` and `get_by_id` do not take it.
pub struct Vault {
    metadata: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    sync_on_write: bool,
    write_lock: Mutex<()>,
}

/// Result of comparing the id sets of the two stores
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Records in the metadata store
    pub records: usize,
    /// Entries in the content store
    pub blobs: usize,
    /// Ids with metadata but no content
    pub orphaned_metadata: Vec<FileId>,
    /// Ids with content but no metadata
    pub orphaned_content: Vec<FileId>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_metadata.is_empty() && self.orphaned_content.is_empty()
    }
}

impl Vault {
    /// Build a vault over caller-supplied stores
    pub fn new(metadata: Arc<dyn MetadataStore>, content: Arc<dyn ContentStore>) -> Self {
        Vault {
            metadata,
            content,
            clock: Arc::new(SystemClock),
            sync_on_write: true,
            write_lock: Mutex::new(()),
        }
    }

    /// A vault that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryMetadataStore::new()),
            Arc::new(MemoryContentStore::new()),
        )
    }

    /// Open (or create) the file-backed vault described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.vault_dir)?;

        let metadata =
            FileMetadataStore::open_or_create(config.metadata_path(), config.compression_level)?;
        let content =
            FileContentStore::open_or_create(config.content_path(), config.compression_level)?;

        info!(vault = %config.vault_dir.display(), "opened vault");

        Ok(Self::new(Arc::new(metadata), Arc::new(content))
            .with_sync_on_write(config.sync_on_write))
    }

    /// Set the time source for `uploaded_at` / `updated_at`
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    // === File Operations ===

    /// Store a new file and return its metadata
    ///
    /// `file_size` is recorded as given; it is not checked against
    /// `content.len()`.
    pub fn upload(
        &self,
        file_name: impl Into<String>,
        file_size: u64,
        file_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Result<FileRecord> {
        let _guard = self.write_lock.lock();

        let id = FileId::generate();
        let record = FileRecord::new(
            id.clone(),
            file_name,
            file_size,
            file_type,
            self.clock.now_nanos(),
        );

        self.metadata.insert(&id, &record)?;
        if let Err(e) = self.content.insert(&id, content.into()) {
            warn!(%id, error = %e, "content insert failed after metadata insert; metadata is orphaned");
            return Err(e);
        }
        self.flush()?;

        info!(%id, file_name = %record.file_name, file_size, "uploaded file");
        Ok(record)
    }

    /// Every record, in id order
    pub fn list_all(&self) -> Result<Vec<FileRecord>> {
        let records = self.metadata.values()?;
        debug!(count = records.len(), "listed files");
        Ok(records)
    }

    /// Fetch a record and its content
    ///
    /// NotFound unless both stores hold the id.
    pub fn get_by_id(&self, id: &FileId) -> Result<(FileRecord, Bytes)> {
        let record = self.metadata.get(id)?;
        let content = self.content.get(id)?;

        match (record, content) {
            (Some(record), Some(content)) => {
                debug!(%id, len = content.len(), "fetched file");
                Ok((record, content))
            }
            (record, content) => {
                if record.is_some() != content.is_some() {
                    warn!(
                        %id,
                        has_metadata = record.is_some(),
                        has_content = content.is_some(),
                        "stores disagree about id"
                    );
                }
                Err(Error::not_found(id.as_str()))
            }
        }
    }

    /// Replace a file's name and type
    ///
    /// The content store is never touched. An unknown id changes nothing.
    pub fn update_metadata(
        &self,
        id: &FileId,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Result<FileRecord> {
        let _guard = self.write_lock.lock();

        let current = self
            .metadata
            .get(id)?
            .ok_or_else(|| Error::not_found(id.as_str()))?;

        let updated = current.with_metadata(file_name, file_type, self.clock.now_nanos());
        self.metadata.insert(id, &updated)?;
        self.flush()?;

        info!(%id, file_name = %updated.file_name, "updated file metadata");
        Ok(updated)
    }

    /// Remove a file from both stores and return its last metadata
    ///
    /// Both removals always run. If either store lacked the id the result is
    /// NotFound, even though the other removal went through.
    pub fn delete_file(&self, id: &FileId) -> Result<FileRecord> {
        let _guard = self.write_lock.lock();

        let record = self.metadata.remove(id)?;
        let content = match self.content.remove(id) {
            Ok(content) => content,
            Err(e) => {
                if record.is_some() {
                    warn!(%id, error = %e, "content removal failed after metadata removal; content is orphaned");
                }
                return Err(e);
            }
        };
        self.flush()?;

        match (record, content) {
            (Some(record), Some(_)) => {
                info!(%id, "deleted file");
                Ok(record)
            }
            (record, content) => {
                if record.is_some() || content.is_some() {
                    warn!(%id, "removed one half of a split pair");
                }
                Err(Error::not_found(id.as_str()))
            }
        }
    }

    // === Consistency ===

    /// Compare the id sets of the two stores
    ///
    /// Waits for in-flight mutations, so a half-finished upload or delete is
    /// never reported as an orphan.
    pub fn check(&self) -> Result<ConsistencyReport> {
        let _guard = self.write_lock.lock();
        self.compare_stores()
    }

    fn compare_stores(&self) -> Result<ConsistencyReport> {
        let metadata_ids: BTreeSet<FileId> = self.metadata.ids()?.into_iter().collect();
        let content_ids: BTreeSet<FileId> = self.content.keys()?.into_iter().collect();

        let report = ConsistencyReport {
            records: metadata_ids.len(),
            blobs: content_ids.len(),
            orphaned_metadata: metadata_ids.difference(&content_ids).cloned().collect(),
            orphaned_content: content_ids.difference(&metadata_ids).cloned().collect(),
        };

        if !report.is_consistent() {
            warn!(
                orphaned_metadata = report.orphaned_metadata.len(),
                orphaned_content = report.orphaned_content.len(),
                "vault stores are out of step"
            );
        }
        Ok(report)
    }

    /// Remove every orphan found by [`Vault::check`]
    ///
    /// Returns the report describing what was removed.
    pub fn repair(&self) -> Result<ConsistencyReport> {
        let _guard = self.write_lock.lock();

        let report = self.compare_stores()?;
        for id in &report.orphaned_metadata {
            self.metadata.remove(id)?;
        }
        for id in &report.orphaned_content {
            self.content.remove(id)?;
        }
        self.flush()?;

        if !report.is_consistent() {
            info!(
                metadata = report.orphaned_metadata.len(),
                content = report.orphaned_content.len(),
                "removed orphans"
            );
        }
        Ok(report)
    }

    /// Flush both stores to disk
    pub fn sync(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.sync_stores()
    }

    /// Caller holds `write_lock`
    fn flush(&self) -> Result<()> {
        if self.sync_on_write {
            self.sync_stores()?;
        }
        Ok(())
    }

    fn sync_stores(&self) -> Result<()> {
        self.metadata.sync()?;
        self.content.sync()
    }
}
