use std::path::{Path, PathBuf};

use crate::storage::{
    DOCUMENTS_DIR_NAME, DOCUMENTS_INDEX_FILENAME, NOTES_CONTENT_DIR_NAME, NOTES_DIR_NAME,
    NOTES_INDEX_FILENAME,
};

/// How a metadata index reacts to a file it cannot read or parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Treat the index as empty and log a warning. The next mutating call overwrites it.
    #[default]
    Lenient,
    /// Fail with [`Error::CorruptIndex`](crate::storage::Error::CorruptIndex) and leave the file untouched.
    Strict,
}

/// Resolved locations and behavior for one knowledge base.
///
/// Every manager owns a copy; nothing is shared through process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    base_path: PathBuf,
    index_policy: IndexPolicy,
}

impl StoreConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            base_path: base_path.into(),
            index_policy: IndexPolicy::default(),
        }
    }

    pub fn with_index_policy(mut self, policy: IndexPolicy) -> Self {
        self.index_policy = policy;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn index_policy(&self) -> IndexPolicy {
        self.index_policy
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.base_path.join(DOCUMENTS_DIR_NAME)
    }

    pub fn documents_index_path(&self) -> PathBuf {
        self.documents_dir().join(DOCUMENTS_INDEX_FILENAME)
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.base_path.join(NOTES_DIR_NAME)
    }

    pub fn notes_index_path(&self) -> PathBuf {
        self.notes_dir().join(NOTES_INDEX_FILENAME)
    }

    pub fn notes_content_dir(&self) -> PathBuf {
        self.notes_dir().join(NOTES_CONTENT_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_paths() {
        let config = StoreConfig::new("/data/kb");
        assert_eq!(config.documents_index_path(), PathBuf::from("/data/kb/local_documents/metadata.json"));
        assert_eq!(config.notes_index_path(), PathBuf::from("/data/kb/local_notes/notes_metadata.json"));
        assert_eq!(config.notes_content_dir(), PathBuf::from("/data/kb/local_notes/content"));
        assert_eq!(config.index_policy(), IndexPolicy::Lenient);

        let strict = config.with_index_policy(IndexPolicy::Strict);
        assert_eq!(strict.index_policy(), IndexPolicy::Strict);
    }
}
