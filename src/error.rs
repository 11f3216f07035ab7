//! Error types for blockvault

use thiserror::Error;

/// Result type alias for blockvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blockvault operations
#[derive(Error, Debug)]
pub enum Error {
    /// The id is missing from the metadata store, the content store, or both
    #[error("File with id={id} not found")]
    NotFound { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid vault file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(id: impl Into<String>) -> Self {
        Error::NotFound { id: id.into() }
    }

    /// True for the NotFound signal, false for storage faults
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
