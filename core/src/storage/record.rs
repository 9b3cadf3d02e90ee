use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::search::media_type_for;
use crate::storage::EntityKind;

/// A record that can live in a [`MetadataIndex`](super::MetadataIndex).
pub trait IndexRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Called for every entry after the index is loaded, with the key it was stored under.
    /// Lets a record fill in an id that is missing from its own fields.
    fn adopt_key(&mut self, _key: &str) {}
}

/// Metadata for a document imported into the knowledge base.
///
/// The id of a document is its original file name. Every field tolerates being
/// absent so that entries written by older tools still load; gaps are filled from
/// the index key by [`IndexRecord::adopt_key`] and by the document manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub original_filename: String,
    /// Empty when the index entry did not record it.
    #[serde(rename = "path_in_kb", default)]
    pub stored_path: PathBuf,
    #[serde(rename = "import_date", default)]
    pub imported_at: NaiveDateTime,
    #[serde(default)]
    pub size_bytes: u64,
    /// Lowercased extension including the leading dot, or empty.
    #[serde(default)]
    pub file_type: String,
}

impl DocumentRecord {
    /// Media type derived from [`file_type`](Self::file_type), if it is one we know.
    pub fn media_type(&self) -> Option<Mime> {
        media_type_for(&self.file_type)
    }
}

impl IndexRecord for DocumentRecord {
    const KIND: EntityKind = EntityKind::Document;

    fn id(&self) -> &str {
        &self.original_filename
    }

    fn adopt_key(&mut self, key: &str) {
        if self.original_filename.is_empty() {
            self.original_filename = key.to_string();
        }
        if self.file_type.is_empty() {
            self.file_type = file_type_of(Path::new(key));
        }
    }
}

/// Metadata for a free-text note. The content lives in a separate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "created_date", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "last_modified_date", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<NaiveDateTime>,
    /// File name relative to the notes content directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_filename: Option<String>,
}

impl IndexRecord for NoteRecord {
    const KIND: EntityKind = EntityKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn adopt_key(&mut self, key: &str) {
        if self.id.is_empty() {
            self.id = key.to_string();
        }
    }
}

/// Current local time without offset, the format used for every timestamp in the indexes.
pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Lowercased extension of `path` with its leading dot (`"Report.TXT"` -> `".txt"`).
/// Files without an extension, including dotfiles such as `.bashrc`, yield an empty string.
pub(crate) fn file_type_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of(Path::new("report.txt")), ".txt");
        assert_eq!(file_type_of(Path::new("Scan.PDF")), ".pdf");
        assert_eq!(file_type_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(file_type_of(Path::new("README")), "");
        assert_eq!(file_type_of(Path::new(".bashrc")), "");
    }

    #[test]
    fn test_document_record_json_schema() {
        let value = json!({
            "original_filename": "report.txt",
            "path_in_kb": "kb/local_documents/report.txt",
            "import_date": "2024-03-01T09:15:42.123456",
            "size_bytes": 16,
            "file_type": ".txt"
        });
        let record: DocumentRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.id(), "report.txt");
        assert_eq!(record.size_bytes, 16);
        assert_eq!(record.media_type(), Some(mime::TEXT_PLAIN));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["path_in_kb"], value["path_in_kb"]);
        assert_eq!(back["file_type"], ".txt");
        assert!(back.get("stored_path").is_none());
    }

    #[test]
    fn test_document_record_fills_gaps_from_key() {
        let mut record: DocumentRecord = serde_json::from_value(json!({ "size_bytes": 9 })).unwrap();
        assert_eq!(record.original_filename, "");
        assert!(record.stored_path.as_os_str().is_empty());

        record.adopt_key("Survey.CSV");
        assert_eq!(record.id(), "Survey.CSV");
        assert_eq!(record.file_type, ".csv");
        assert_eq!(record.size_bytes, 9);
    }

    #[test]
    fn test_note_record_optional_fields() {
        let mut record: NoteRecord = serde_json::from_value(json!({ "title": "Untimed" })).unwrap();
        assert!(record.created_at.is_none());
        assert!(record.content_filename.is_none());

        record.adopt_key("abc-123");
        assert_eq!(record.id(), "abc-123");

        let back = serde_json::to_value(&record).unwrap();
        assert!(back.get("created_date").is_none());
        assert_eq!(back["id"], "abc-123");
    }

    #[test]
    fn test_note_record_reads_seconds_precision_dates() {
        let record: NoteRecord = serde_json::from_value(json!({
            "id": "n1",
            "title": "T",
            "created_date": "2024-03-01T09:15:42",
            "last_modified_date": "2024-03-01T09:15:42.5",
            "content_filename": "n1.txt"
        }))
        .unwrap();
        assert!(record.created_at.is_some());
        assert_eq!(record.content_filename.as_deref(), Some("n1.txt"));
    }
}
