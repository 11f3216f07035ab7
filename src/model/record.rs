//! File metadata record and its identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier shared by a metadata record and its content blob
///
/// Generated ids are random UUIDv4 strings. Uniqueness is probabilistic:
/// nothing checks a fresh id against the stores.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        FileId(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        FileId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        FileId(s.to_string())
    }
}

impl From<String> for FileId {
    fn from(s: String) -> Self {
        FileId(s)
    }
}

impl From<&FileId> for FileId {
    fn from(id: &FileId) -> Self {
        id.clone()
    }
}

/// Metadata for one stored file
///
/// `id`, `file_size` and `uploaded_at` are write-once. `file_size` is whatever
/// the uploader claimed and may differ from the stored content length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    /// Creation timestamp (unix nanos)
    pub uploaded_at: u64,
    /// Time of the latest metadata update (unix nanos), `None` until the first one
    pub updated_at: Option<u64>,
}

impl FileRecord {
    pub fn new(
        id: FileId,
        file_name: impl Into<String>,
        file_size: u64,
        file_type: impl Into<String>,
        uploaded_at: u64,
    ) -> Self {
        FileRecord {
            id,
            file_name: file_name.into(),
            file_size,
            file_type: file_type.into(),
            uploaded_at,
            updated_at: None,
        }
    }

    /// Copy of this record with a new name and type, stamped at `now`
    ///
    /// The stamp never goes backwards: it is clamped to the previous
    /// `updated_at`, or to `uploaded_at` on the first update.
    pub fn with_metadata(
        &self,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        now: u64,
    ) -> Self {
        let floor = self.updated_at.unwrap_or(self.uploaded_at);
        FileRecord {
            file_name: file_name.into(),
            file_type: file_type.into(),
            updated_at: Some(now.max(floor)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        let a = FileId::generate();
        let b = FileId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_new_record_has_no_update_stamp() {
        let record = FileRecord::new(FileId::new("f1"), "a.txt", 3, "text/plain", 100);
        assert_eq!(record.updated_at, None);
        assert_eq!(record.uploaded_at, 100);
    }

    #[test]
    fn test_with_metadata_keeps_write_once_fields() {
        let record = FileRecord::new(FileId::new("f1"), "a.txt", 3, "text/plain", 100);
        let updated = record.with_metadata("b.md", "text/markdown", 250);

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.file_size, 3);
        assert_eq!(updated.uploaded_at, 100);
        assert_eq!(updated.file_name, "b.md");
        assert_eq!(updated.file_type, "text/markdown");
        assert_eq!(updated.updated_at, Some(250));
    }

    #[test]
    fn test_with_metadata_clamps_clock_skew() {
        let record = FileRecord::new(FileId::new("f1"), "a.txt", 3, "text/plain", 500);
        let first = record.with_metadata("b", "t", 400);
        assert_eq!(first.updated_at, Some(500));

        let second = first.with_metadata("c", "t", 450);
        assert_eq!(second.updated_at, Some(500));

        let third = second.with_metadata("d", "t", 900);
        assert_eq!(third.updated_at, Some(900));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let record = FileRecord::new(FileId::new("f1"), "a.txt", 3, "text/plain", 7);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "f1");
        assert_eq!(json["fileName"], "a.txt");
        assert_eq!(json["fileSize"], 3);
        assert!(json["updatedAt"].is_null());
    }
}
