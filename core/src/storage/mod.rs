//! Provides filesystem storage for the documents and notes of a knowledge base.
//!
//! This module defines how records and their content are laid out on disk and
//! the managers that keep the two consistent.
//!
//! # Core Concepts
//!
//! *   **[`KnowledgeBase`]:** The root container. It is built from a [`StoreConfig`]
//!     and hands out one [`DocumentManager`] and one [`NoteManager`].
//! *   **Metadata index:** Each entity kind has a single JSON object mapping an id to
//!     its record (`local_documents/metadata.json`, `local_notes/notes_metadata.json`).
//!     The index is the source of truth and is reloaded from disk on every call.
//! *   **Content files:** One file per record. Documents are copied in under their
//!     original file name; notes are written to `local_notes/content/<id>.txt`.
//!
//! # Identity Rules
//!
//! *   A document's id is its original file name. Adding a second file with the same
//!     name is a [`ConflictError::EntryExists`]; a stray, unindexed file of that name in
//!     the documents directory is a [`ConflictError::ContentFileExists`]. Nothing is
//!     overwritten or renamed.
//! *   A note's id is a freshly generated UUID. If it is already present the add fails
//!     with [`Error::Collision`], which [`Error::is_retryable`] reports as retryable.
//!
//! # Consistency
//!
//! A record and its content file are created and removed together, but the two
//! writes are not atomic. Within one process, each manager serialises its mutating
//! calls behind a lock so that concurrent tasks never interleave a load-modify-save
//! cycle. Nothing guards against a second *process* writing the same index: the last
//! writer wins.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lorekeep_core::{config::StoreConfig, storage::KnowledgeBase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let kb = KnowledgeBase::new(StoreConfig::new("/tmp/my_kb"));
//!
//!     let note = kb.notes().add("Field trip", "Basalt samples from ridge B").await?;
//!     let found = kb.notes().search("basalt").await?;
//!     assert_eq!(found[0].id, note.id);
//!
//!     kb.notes().remove(&note.id).await?;
//!     Ok(())
//! }
//! ```

pub use self::document::DocumentManager;
pub use self::file::ContentStore;
pub use self::index::MetadataIndex;
pub use self::knowledge_base::KnowledgeBase;
pub use self::note::NoteManager;
pub use self::record::{DocumentRecord, IndexRecord, NoteRecord};

pub use crate::config::StoreConfig;

mod document;
mod file;
mod index;
mod knowledge_base;
mod note;
mod record;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DOCUMENTS_DIR_NAME: &str = "local_documents";
pub const DOCUMENTS_INDEX_FILENAME: &str = "metadata.json";
pub const NOTES_DIR_NAME: &str = "local_notes";
pub const NOTES_INDEX_FILENAME: &str = "notes_metadata.json";
pub const NOTES_CONTENT_DIR_NAME: &str = "content";
pub const NOTE_CONTENT_EXTENSION: &str = "txt";


/// The kind of record an index holds, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Document,
    Note,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Document => f.write_str("Document"),
            EntityKind::Note => f.write_str("Note"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Document '{0}' already exists in the knowledge base")]
    EntryExists(String),

    #[error("A file that is not tracked by the index already exists at {0}")]
    ContentFileExists(PathBuf),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source is not a file: {0}")]
    NotAFile(PathBuf),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Content file not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("Note ID collision ({0}). Please try again.")]
    Collision(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Metadata index is unreadable or malformed: {0}")]
    CorruptIndex(PathBuf),

    #[error("Metadata serialization/deserialization error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures where the entity, its source, or its content file is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::FileNotFound(_) | Error::SourceNotFound(_)
        )
    }

    /// True when repeating the same call may succeed (a generated id collided).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Collision(_))
    }

    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Error::NotFound { kind, id: id.to_string() }
    }
}

// Define a standard Result type for the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::not_found(EntityKind::Note, "abc");
        assert_eq!(err.to_string(), "Note 'abc' not found");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());

        let err: Error = ConflictError::EntryExists("report.txt".into()).into();
        assert_eq!(err.to_string(), "Document 'report.txt' already exists in the knowledge base");
        assert!(!err.is_not_found());

        assert!(Error::Collision("x".into()).is_retryable());
    }
}
