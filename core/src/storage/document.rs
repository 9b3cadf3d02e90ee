use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;
use crate::search::{collect_matches, Extractors, Keyword, ScanOutcome, SkipReason};
use crate::storage::index::Entries;
use crate::storage::record::{file_type_of, now};
use crate::storage::{
    ConflictError, ContentStore, DocumentRecord, EntityKind, Error, IndexRecord, MetadataIndex, Result,
    DOCUMENTS_INDEX_FILENAME,
};

/// Imports files into `local_documents/` and keeps `metadata.json` in step with them.
///
/// A document is identified by its original file name. Mutating calls on one manager
/// are serialized; separate processes sharing a directory are not coordinated.
#[derive(Debug)]
pub struct DocumentManager {
    config: StoreConfig,
    index: MetadataIndex<DocumentRecord>,
    extractors: Extractors,
    write_lock: Mutex<()>,
}

impl DocumentManager {
    pub fn new(config: StoreConfig) -> Self {
        let index = MetadataIndex::new(config.documents_index_path(), config.index_policy());
        DocumentManager {
            config,
            index,
            extractors: Extractors::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Replaces the text extractors used by [`search`](Self::search).
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn extractors_mut(&mut self) -> &mut Extractors {
        &mut self.extractors
    }

    /// Directory holding the stored copies and the index.
    pub fn directory(&self) -> PathBuf {
        self.config.documents_dir()
    }

    /// Loads the index, pointing entries that lack a stored path at the documents directory.
    async fn load(&self) -> Result<Entries<DocumentRecord>> {
        let mut entries = self.index.load().await?;
        for record in entries.values_mut() {
            if record.stored_path.as_os_str().is_empty() {
                record.stored_path = self.directory().join(&record.original_filename);
            }
        }
        Ok(entries)
    }

    /// Copies the file at `source` into the knowledge base and records its metadata.
    ///
    /// # Errors
    ///
    /// * [`Error::SourceNotFound`] if `source` does not exist.
    /// * [`Error::NotAFile`] if it is a directory or other non-regular file.
    /// * [`Error::InvalidInput`] if it has no usable file name or uses the index file's name.
    /// * [`Error::Conflict`] if a document of that name is already indexed, or an untracked
    ///   file of that name already sits in the documents directory. Nothing is modified.
    #[instrument(skip(self, source), fields(source = %source.display()))]
    pub async fn add(&self, source: &Path) -> Result<DocumentRecord> {
        let meta = fs::metadata(source).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::SourceNotFound(source.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        if !meta.is_file() {
            return Err(Error::NotAFile(source.to_path_buf()));
        }

        let filename = source
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| Error::InvalidInput(format!("'{}' has no usable file name", source.display())))?;
        if filename == DOCUMENTS_INDEX_FILENAME {
            return Err(Error::InvalidInput(format!(
                "'{}' is reserved for the document index",
                DOCUMENTS_INDEX_FILENAME
            )));
        }

        let _guard = self.write_lock.lock().await;
        self.index.ensure().await?;
        let mut entries = self.load().await?;

        if entries.contains_key(filename) {
            debug!("Document '{}' is already indexed", filename);
            return Err(ConflictError::EntryExists(filename.to_string()).into());
        }

        let directory = self.directory();
        let destination = directory.join(filename);
        if ContentStore::exists(&destination).await? {
            debug!("Untracked file already present at {}", destination.display());
            return Err(ConflictError::ContentFileExists(destination).into());
        }

        let (stored_path, size_bytes) = ContentStore::copy(source, &directory, filename).await?;
        let record = DocumentRecord {
            original_filename: filename.to_string(),
            stored_path,
            imported_at: now(),
            size_bytes,
            file_type: file_type_of(source),
        };
        entries.insert(filename.to_string(), record.clone());

        if let Err(e) = self.index.save(&entries).await {
            warn!("Saving the document index failed ({}); removing copied file", e);
            if let Err(cleanup) = ContentStore::delete(&record.stored_path).await {
                warn!("Could not remove '{}': {}", record.stored_path.display(), cleanup);
            }
            return Err(e);
        }

        info!("Document '{}' added ({} bytes)", filename, size_bytes);
        Ok(record)
    }

    /// All documents, in the order they were added.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        self.index.ensure().await?;
        Ok(self.load().await?.into_values().collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<DocumentRecord> {
        self.index.ensure().await?;
        self.load()
            .await?
            .swap_remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))
    }

    /// Location of the stored copy.
    pub async fn path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.get(id).await?.stored_path)
    }

    /// Raw bytes of the stored copy.
    ///
    /// Fails with [`Error::FileNotFound`] if the record exists but its file is gone.
    #[instrument(skip(self))]
    pub async fn get_content(&self, id: &str) -> Result<Vec<u8>> {
        let record = self.get(id).await?;
        ContentStore::read(&record.stored_path).await
    }

    /// Documents whose extracted text contains `keyword`, ignoring case.
    ///
    /// An empty keyword yields no results. Documents without a text extractor for
    /// their type, with missing content, or that fail to read are skipped.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<Vec<DocumentRecord>> {
        let Some(keyword) = Keyword::parse(keyword) else {
            return Ok(Vec::new());
        };
        self.index.ensure().await?;
        let entries = self.load().await?;

        let mut scanned = Vec::with_capacity(entries.len());
        for record in entries.into_values() {
            let outcome = self.scan(&record, &keyword).await;
            scanned.push((record, outcome));
        }
        let found = collect_matches(scanned, |r| r.id());
        debug!("{} document(s) matched '{}'", found.len(), keyword);
        Ok(found)
    }

    async fn scan(&self, record: &DocumentRecord, keyword: &Keyword) -> ScanOutcome {
        let Some(extractor) = self.extractors.for_file_type(&record.file_type) else {
            return ScanOutcome::Skipped(SkipReason::UnsupportedType(record.file_type.clone()));
        };
        let content = match ContentStore::read(&record.stored_path).await {
            Ok(content) => content,
            Err(Error::FileNotFound(_)) => return ScanOutcome::Skipped(SkipReason::MissingContent),
            Err(e) => return ScanOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
        };
        match extractor.extract(&content) {
            Ok(text) => ScanOutcome::of(keyword, &text),
            Err(e) => ScanOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
        }
    }

    /// Deletes the stored copy and the index entry. Returns the removed record.
    ///
    /// A stored copy that is already gone does not block removal. Any other failure
    /// to delete it aborts before the index is touched.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<DocumentRecord> {
        let _guard = self.write_lock.lock().await;
        self.index.ensure().await?;
        let mut entries = self.load().await?;

        let Some(record) = entries.get(id).cloned() else {
            return Err(Error::not_found(EntityKind::Document, id));
        };

        match ContentStore::delete(&record.stored_path).await {
            Ok(()) => {}
            Err(Error::FileNotFound(path)) => {
                warn!("Content for document '{}' was already missing at {}", id, path.display());
            }
            Err(e) => return Err(e),
        }

        entries.shift_remove(id);
        self.index.save(&entries).await?;
        info!("Document '{}' removed", id);
        Ok(record)
    }
}
