use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::config::IndexPolicy;
use crate::storage::{Error, IndexRecord, Result};

/// Records keyed by id, in the order they were inserted.
pub type Entries<R> = IndexMap<String, R>;

/// The JSON file mapping ids to records for one entity kind.
///
/// Every operation reads or writes the whole file. Callers mutate by loading,
/// changing the in-memory map and saving it back, which is only correct with a
/// single writer.
#[derive(Debug, Clone)]
pub struct MetadataIndex<R> {
    path: PathBuf,
    policy: IndexPolicy,
    _record: PhantomData<fn() -> R>,
}

impl<R: IndexRecord> MetadataIndex<R> {
    pub fn new(path: PathBuf, policy: IndexPolicy) -> Self {
        MetadataIndex { path, policy, _record: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty index file if the file is absent.
    pub async fn ensure(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        if !fs::try_exists(&self.path).await.map_err(Error::Io)? {
            debug!("Creating empty {} index at {}", R::KIND, self.path.display());
            fs::write(&self.path, "{}").await.map_err(Error::Io)?;
        }
        Ok(())
    }

    /// Loads the full mapping.
    ///
    /// An absent or blank file is an empty index. A file that cannot be read or
    /// parsed, or an entry that does not fit the record type, is handled according
    /// to the configured [`IndexPolicy`]: lenient loading drops only what is broken.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Entries<R>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Index file absent, treating as empty");
                return Ok(Entries::new());
            }
            Err(e) => return self.unreadable(&e),
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Entries::new());
        }

        match serde_json::from_slice::<IndexMap<String, Value>>(&content) {
            Ok(raw) => self.decode(raw),
            Err(e) => self.unreadable(&e),
        }
    }

    /// Converts entries one at a time so a single malformed record cannot hide the rest.
    fn decode(&self, raw: IndexMap<String, Value>) -> Result<Entries<R>> {
        let mut entries = Entries::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_value::<R>(value) {
                Ok(mut record) => {
                    record.adopt_key(&key);
                    entries.insert(key, record);
                }
                Err(e) => match self.policy {
                    IndexPolicy::Lenient => {
                        warn!(
                            "Skipping malformed {} entry '{}' in '{}': {}",
                            R::KIND,
                            key,
                            self.path.display(),
                            e
                        );
                    }
                    IndexPolicy::Strict => {
                        warn!("{} entry '{}' in '{}' is malformed: {}", R::KIND, key, self.path.display(), e);
                        return Err(Error::CorruptIndex(self.path.clone()));
                    }
                },
            }
        }
        debug!("Loaded {} entries", entries.len());
        Ok(entries)
    }

    /// Serializes the full mapping and overwrites the index file.
    ///
    /// Not transactional: a crash during the write can leave a truncated file.
    #[instrument(skip(self, entries), fields(path = %self.path.display(), entries = entries.len()))]
    pub async fn save(&self, entries: &Entries<R>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries).map_err(Error::Metadata)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        fs::write(&self.path, content).await.map_err(Error::Io)?;
        debug!("Index saved");
        Ok(())
    }

    fn unreadable(&self, cause: &dyn std::fmt::Display) -> Result<Entries<R>> {
        match self.policy {
            IndexPolicy::Lenient => {
                warn!(
                    "{} index '{}' is unreadable ({}); treating it as empty",
                    R::KIND,
                    self.path.display(),
                    cause
                );
                Ok(Entries::new())
            }
            IndexPolicy::Strict => {
                warn!("{} index '{}' is unreadable: {}", R::KIND, self.path.display(), cause);
                Err(Error::CorruptIndex(self.path.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NoteRecord;
    use tempfile::tempdir;

    fn note(id: &str, title: &str) -> NoteRecord {
        NoteRecord {
            id: id.to_string(),
            title: title.to_string(),
            created_at: None,
            modified_at: None,
            content_filename: Some(format!("{id}.txt")),
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_empty_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub/notes_metadata.json");
        let index = MetadataIndex::<NoteRecord>::new(path.clone(), IndexPolicy::Lenient);

        index.ensure().await.unwrap();
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "{}");
        assert!(index.load().await.unwrap().is_empty());

        // A second call must not clobber existing entries
        let mut entries = Entries::new();
        entries.insert("a".to_string(), note("a", "A"));
        index.save(&entries).await.unwrap();
        index.ensure().await.unwrap();
        assert_eq!(index.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_absent_and_blank_files_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        let index = MetadataIndex::<NoteRecord>::new(path.clone(), IndexPolicy::Strict);

        assert!(index.load().await.unwrap().is_empty());

        fs::write(&path, "  \n").await.unwrap();
        assert!(index.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let index = MetadataIndex::<NoteRecord>::new(dir.path().join("index.json"), IndexPolicy::Lenient);

        let mut entries = Entries::new();
        for id in ["zeta", "alpha", "mid"] {
            entries.insert(id.to_string(), note(id, id));
        }
        index.save(&entries).await.unwrap();

        let keys: Vec<_> = index.load().await.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_malformed_index_lenient_vs_strict() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "{ not json }").await.unwrap();

        let lenient = MetadataIndex::<NoteRecord>::new(path.clone(), IndexPolicy::Lenient);
        assert!(lenient.load().await.unwrap().is_empty());

        let strict = MetadataIndex::<NoteRecord>::new(path.clone(), IndexPolicy::Strict);
        assert!(matches!(strict.load().await, Err(Error::CorruptIndex(p)) if p == path));

        // The damaged file is left as it was
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "{ not json }");
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_hide_the_rest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"{ "good": { "id": "good", "title": "Kept" }, "bad": { "title": 42 }, "also": { "title": "Kept too" } }"#,
        )
        .await
        .unwrap();

        let lenient = MetadataIndex::<NoteRecord>::new(path.clone(), IndexPolicy::Lenient);
        let keys: Vec<_> = lenient.load().await.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["good", "also"]);

        let strict = MetadataIndex::<NoteRecord>::new(path, IndexPolicy::Strict);
        assert!(matches!(strict.load().await, Err(Error::CorruptIndex(_))));
    }

    #[tokio::test]
    async fn test_load_fills_missing_ids_from_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, r#"{ "k1": { "title": "No id field" } }"#).await.unwrap();

        let index = MetadataIndex::<NoteRecord>::new(path, IndexPolicy::Strict);
        let entries = index.load().await.unwrap();
        assert_eq!(entries["k1"].id, "k1");
    }
}
