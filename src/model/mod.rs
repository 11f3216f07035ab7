//! Core data model types for blockvault

mod record;

pub use record::{FileId, FileRecord};
