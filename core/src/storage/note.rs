use std::path::PathBuf;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::search::{collect_matches, Keyword, ScanOutcome, SkipReason};
use crate::storage::record::now;
use crate::storage::{
    ContentStore, EntityKind, Error, IndexRecord, MetadataIndex, NoteRecord, Result, NOTE_CONTENT_EXTENSION,
};

/// Stores free-text notes under `local_notes/`, one content file per note.
///
/// Note ids are generated UUIDs, independent of the title. Mutating calls on one
/// manager are serialized; separate processes sharing a directory are not coordinated.
#[derive(Debug)]
pub struct NoteManager {
    config: StoreConfig,
    index: MetadataIndex<NoteRecord>,
    new_id: fn() -> String,
    write_lock: Mutex<()>,
}

fn generate_note_id() -> String {
    Uuid::new_v4().to_string()
}

impl NoteManager {
    pub fn new(config: StoreConfig) -> Self {
        let index = MetadataIndex::new(config.notes_index_path(), config.index_policy());
        NoteManager {
            config,
            index,
            new_id: generate_note_id,
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding the note content files.
    pub fn content_dir(&self) -> PathBuf {
        self.config.notes_content_dir()
    }

    async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(self.content_dir()).await.map_err(Error::Io)?;
        self.index.ensure().await
    }

    /// Creates a note and returns its record, including the generated id.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInput`] if `content` is empty. Any title is accepted.
    /// * [`Error::Collision`] if the generated id is already in use. Retrying will
    ///   draw a new id.
    ///
    /// If saving the index fails after the content was written, the content file is
    /// left behind and the error is returned.
    #[instrument(skip(self, content))]
    pub async fn add(&self, title: &str, content: &str) -> Result<NoteRecord> {
        if content.is_empty() {
            return Err(Error::InvalidInput("Note content must not be empty".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        self.prepare().await?;
        let mut entries = self.index.load().await?;

        let id = (self.new_id)();
        if entries.contains_key(&id) {
            warn!("Generated note id {} is already in use", id);
            return Err(Error::Collision(id));
        }

        let filename = format!("{}.{}", id, NOTE_CONTENT_EXTENSION);
        let content_path = ContentStore::write(&self.content_dir(), &filename, content).await?;

        let timestamp = now();
        let record = NoteRecord {
            id: id.clone(),
            title: title.to_string(),
            created_at: Some(timestamp),
            modified_at: Some(timestamp),
            content_filename: Some(filename),
        };
        entries.insert(id.clone(), record.clone());

        if let Err(e) = self.index.save(&entries).await {
            warn!(
                "Saving the note index failed ({}); content left at {}",
                e,
                content_path.display()
            );
            return Err(e);
        }

        info!("Note '{}' added with id {}", title, id);
        Ok(record)
    }

    /// All notes, newest first. Notes without a creation time come last.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<NoteRecord>> {
        self.prepare().await?;
        let mut notes: Vec<_> = self.index.load().await?.into_values().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<NoteRecord> {
        self.prepare().await?;
        self.index
            .load()
            .await?
            .swap_remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Note, id))
    }

    /// The note's text exactly as it was written.
    ///
    /// Fails with [`Error::NotFound`] if the note or its content pointer is missing and
    /// with [`Error::FileNotFound`] if the content file itself is gone.
    #[instrument(skip(self))]
    pub async fn get_content(&self, id: &str) -> Result<String> {
        let record = self.get(id).await?;
        let path = self
            .content_path(&record)
            .ok_or_else(|| Error::not_found(EntityKind::Note, id))?;
        ContentStore::read_string(&path).await
    }

    fn content_path(&self, record: &NoteRecord) -> Option<PathBuf> {
        record
            .content_filename
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| self.content_dir().join(name))
    }

    /// Notes whose title or content contains `keyword`, ignoring case, newest first.
    ///
    /// An empty keyword yields no results. Notes whose content cannot be read are
    /// matched on their title only.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<Vec<NoteRecord>> {
        let Some(keyword) = Keyword::parse(keyword) else {
            return Ok(Vec::new());
        };
        let notes = self.list().await?;

        let mut scanned = Vec::with_capacity(notes.len());
        for note in notes {
            let outcome = self.scan(&note, &keyword).await;
            scanned.push((note, outcome));
        }
        let found = collect_matches(scanned, |n| n.id());
        debug!("{} note(s) matched '{}'", found.len(), keyword);
        Ok(found)
    }

    async fn scan(&self, note: &NoteRecord, keyword: &Keyword) -> ScanOutcome {
        if keyword.matches(&note.title) {
            return ScanOutcome::Match;
        }
        let Some(path) = self.content_path(note) else {
            return ScanOutcome::Skipped(SkipReason::MissingContent);
        };
        match ContentStore::read_string(&path).await {
            Ok(content) => ScanOutcome::of(keyword, &content),
            Err(Error::FileNotFound(_)) => ScanOutcome::Skipped(SkipReason::MissingContent),
            Err(e) => ScanOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
        }
    }

    /// Deletes the note's content file and index entry. Returns the removed record.
    ///
    /// A content file that is already gone does not block removal. Any other failure
    /// to delete it aborts before the index is touched.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<NoteRecord> {
        let _guard = self.write_lock.lock().await;
        self.prepare().await?;
        let mut entries = self.index.load().await?;

        let Some(record) = entries.get(id).cloned() else {
            return Err(Error::not_found(EntityKind::Note, id));
        };

        if let Some(path) = self.content_path(&record) {
            match ContentStore::delete(&path).await {
                Ok(()) => {}
                Err(Error::FileNotFound(path)) => {
                    warn!("Content for note '{}' was already missing at {}", id, path.display());
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!("Note '{}' has no content file", id);
        }

        entries.shift_remove(id);
        self.index.save(&entries).await?;
        info!("Note '{}' ({}) deleted", id, record.title);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NOTES_INDEX_FILENAME;
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, NoteManager) {
        let dir = tempdir().unwrap();
        let notes = NoteManager::new(StoreConfig::new(dir.path()));
        (dir, notes)
    }

    #[tokio::test]
    async fn test_add_and_read_back_verbatim() {
        let (_dir, notes) = setup();
        let body = "line one\nline two\n\n  indented\r\nünïcödé";

        let record = notes.add("T1", body).await.unwrap();
        assert_eq!(record.title, "T1");
        assert_eq!(record.created_at, record.modified_at);
        assert_eq!(record.content_filename.as_deref(), Some(format!("{}.txt", record.id).as_str()));

        assert_eq!(notes.get_content(&record.id).await.unwrap(), body);
        assert_eq!(notes.get(&record.id).await.unwrap(), record);
        assert!(notes.content_dir().join(format!("{}.txt", record.id)).exists());
    }

    #[tokio::test]
    async fn test_titles_are_not_unique() {
        let (_dir, notes) = setup();
        let a = notes.add("Same", "first").await.unwrap();
        let b = notes.add("Same", "second").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(notes.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_content_is_invalid() {
        let (_dir, notes) = setup();
        assert!(matches!(notes.add("Empty", "").await, Err(Error::InvalidInput(_))));
        assert!(notes.list().await.unwrap().is_empty());
        let mut leftovers = fs::read_dir(notes.content_dir()).await.unwrap();
        assert!(leftovers.next_entry().await.unwrap().is_none());

        // Titles are free text, blank included
        let record = notes.add("", "body").await.unwrap();
        assert_eq!(notes.get(&record.id).await.unwrap().title, "");
    }

    #[tokio::test]
    async fn test_id_collision_is_retryable_and_leaves_existing_note() {
        let (_dir, mut notes) = setup();
        notes.new_id = || "fixed-id".to_string();

        let first = notes.add("First", "original").await.unwrap();
        let err = notes.add("Second", "replacement").await.unwrap_err();
        assert!(matches!(&err, Error::Collision(id) if id == "fixed-id"));
        assert!(err.is_retryable());

        assert_eq!(notes.get("fixed-id").await.unwrap(), first);
        assert_eq!(notes.get_content("fixed-id").await.unwrap(), "original");
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first_with_undated_last() {
        let (dir, notes) = setup();
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let index = serde_json::json!({
            "old": { "id": "old", "title": "Old", "created_date": date(1), "last_modified_date": date(1), "content_filename": "old.txt" },
            "undated": { "id": "undated", "title": "Undated", "content_filename": "undated.txt" },
            "new": { "id": "new", "title": "New", "created_date": date(20), "last_modified_date": date(20), "content_filename": "new.txt" }
        });
        let notes_dir = dir.path().join("local_notes");
        fs::create_dir_all(&notes_dir).await.unwrap();
        fs::write(notes_dir.join(NOTES_INDEX_FILENAME), index.to_string()).await.unwrap();

        let ids: Vec<_> = notes.list().await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[tokio::test]
    async fn test_search_title_then_content() {
        let (_dir, notes) = setup();
        let alpha = notes.add("Alpha Particles", "decay chain").await.unwrap();
        let beta = notes.add("Field log", "Saw ALPHA emitters near the vent").await.unwrap();
        notes.add("Unrelated", "nothing here").await.unwrap();

        for keyword in ["alpha", "ALPHA", "Alpha"] {
            let ids: Vec<_> = notes.search(keyword).await.unwrap().into_iter().map(|n| n.id).collect();
            assert_eq!(ids.len(), 2, "keyword {keyword}");
            assert!(ids.contains(&alpha.id));
            assert!(ids.contains(&beta.id));
        }
        assert!(notes.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_skips_missing_content_but_still_matches_title() {
        let (_dir, notes) = setup();
        let record = notes.add("Basalt", "vesicular texture").await.unwrap();
        fs::remove_file(notes.content_dir().join(format!("{}.txt", record.id))).await.unwrap();

        assert_eq!(notes.search("basalt").await.unwrap().len(), 1);
        assert!(notes.search("vesicular").await.unwrap().is_empty());
        assert!(matches!(notes.get_content(&record.id).await, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_deletes_content_and_entry() {
        let (_dir, notes) = setup();
        let record = notes.add("T1", "line one\nline two").await.unwrap();
        let content_path = notes.content_dir().join(record.content_filename.clone().unwrap());

        let removed = notes.remove(&record.id).await.unwrap();
        assert_eq!(removed.id, record.id);
        assert!(!content_path.exists());
        assert!(matches!(notes.get(&record.id).await, Err(Error::NotFound { .. })));
        assert!(notes.search("line").await.unwrap().is_empty());
        assert!(matches!(notes.remove(&record.id).await, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_content() {
        let (_dir, notes) = setup();
        let record = notes.add("T", "body").await.unwrap();
        fs::remove_file(notes.content_dir().join(format!("{}.txt", record.id))).await.unwrap();

        notes.remove(&record.id).await.unwrap();
        assert!(notes.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_index_save_leaves_content_file() {
        let (dir, notes) = setup();
        // A directory where the index file should be makes every save fail
        fs::create_dir_all(dir.path().join("local_notes").join(NOTES_INDEX_FILENAME)).await.unwrap();

        let err = notes.add("Orphan", "kept on disk").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let mut entries = fs::read_dir(notes.content_dir()).await.unwrap();
        let orphan = entries.next_entry().await.unwrap().expect("content file left behind");
        assert_eq!(fs::read_to_string(orphan.path()).await.unwrap(), "kept on disk");
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let (_dir, notes) = setup();
        let notes = std::sync::Arc::new(notes);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let notes = notes.clone();
                tokio::spawn(async move { notes.add(&format!("note {i}"), "body").await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(notes.list().await.unwrap().len(), 8);
    }
}
