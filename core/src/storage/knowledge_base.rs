use std::path::Path;

use crate::config::StoreConfig;
use crate::search::Extractors;
use crate::storage::{DocumentManager, NoteManager};

/// The document and note stores rooted at one base path.
#[derive(Debug)]
pub struct KnowledgeBase {
    config: StoreConfig,
    documents: DocumentManager,
    notes: NoteManager,
}

impl KnowledgeBase {
    /// No I/O happens here; directories and index files are created on first use.
    pub fn new(config: StoreConfig) -> Self {
        KnowledgeBase {
            documents: DocumentManager::new(config.clone()),
            notes: NoteManager::new(config.clone()),
            config,
        }
    }

    /// Replaces the text extractors used for document search.
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.documents = self.documents.with_extractors(extractors);
        self
    }

    pub fn base_path(&self) -> &Path {
        self.config.base_path()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.documents
    }

    pub fn notes(&self) -> &NoteManager {
        &self.notes
    }
}
