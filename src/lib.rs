//! # blockvault
//!
//! A file vault built from two ordered key-value stores: one for metadata
//! records, one for raw content, joined by a shared file id.
//!
//! ## Core Concepts
//!
//! - **FileRecord**: name, claimed size, type and timestamps for one file
//! - **Metadata Store / Content Store**: independent maps keyed by [`FileId`]
//! - **Vault**: upload, list, get, update and delete across both stores
//! - **Check / Repair**: find and remove ids present in only one store
//!
//! ## Example
//!
//! ```
//! use blockvault::Vault;
//!
//! let vault = Vault::in_memory();
//! let record = vault.upload("a.txt", 3, "text/plain", b"ABC".to_vec())?;
//! let (fetched, content) = vault.get_by_id(&record.id)?;
//! assert_eq!(fetched, record);
//! assert_eq!(content.as_ref(), b"ABC");
//! # Ok::<(), blockvault::Error>(())
//! ```

pub mod clock;
pub mod config;
pub mod model;
pub mod store;

mod error;
mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{FileId, FileRecord};
pub use store::{
    ContentStore, FileContentStore, FileMetadataStore, MemoryContentStore, MemoryMetadataStore,
    MetadataStore,
};
pub use vault::{ConsistencyReport, Vault};

/// Table file format version
pub const VERSION: u32 = 1;

/// Magic bytes for table file identification
pub const MAGIC: &[u8; 8] = b"BLKVAULT";
