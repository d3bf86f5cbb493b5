//! The study set collection store
//!
//! All sets live in memory, most recent first, and the whole collection is
//! mirrored to one key of a [`PersistenceBackend`] after every mutation:
//! ```text
//! study_sets  ->  {"version": 1, "studySets": [ ...StudySet ]}
//! ```
//! Persistence is best effort. Write failures go to a [`PersistenceReporter`]
//! and the in-memory collection stays authoritative for the session.

use std::io;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::backend::PersistenceBackend;
use super::models::*;

/// Storage key holding the serialized collection
pub const STUDY_SETS_KEY: &str = "study_sets";

/// Current layout version of the persisted blob
pub const STORAGE_VERSION: u32 = 1;

/// Default number of sets returned by [`StudySetStore::recent`]
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum StudySetStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Study set store has not finished loading")]
    NotReady,

    #[error("Cannot replace {expected} material with {found} material")]
    ModeMismatch { expected: StudyMode, found: StudyMode },

    #[error("Unsupported storage version: {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, StudySetStoreError>;

/// Observer for persistence failures that are not surfaced to callers
pub trait PersistenceReporter: Send + Sync {
    fn persistence_failed(&self, operation: &str, error: &StudySetStoreError);
}

/// Reports persistence failures through the `log` facade
pub struct LogReporter;

impl PersistenceReporter for LogReporter {
    fn persistence_failed(&self, operation: &str, error: &StudySetStoreError) {
        log::error!("Study set persistence failed during {}: {}", operation, error);
    }
}

/// Lifecycle of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Loading,
    Ready,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StudySetsData<'a> {
    version: u32,
    study_sets: &'a [StudySet],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStudySets {
    version: u32,
    #[serde(default)]
    study_sets: Vec<StudySet>,
}

/// Either the versioned layout or the bare array written before versioning
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBlob {
    Versioned(StoredStudySets),
    Legacy(Vec<StudySet>),
}

/// Store shared between threads; the mutex covers memory and the write
pub type SharedStudySetStore = Arc<Mutex<StudySetStore>>;

/// Owner of all saved study sets for a session
pub struct StudySetStore {
    backend: Box<dyn PersistenceBackend>,
    reporter: Arc<dyn PersistenceReporter>,
    storage_key: String,
    state: StoreState,
    sets: Vec<StudySet>,
}

impl StudySetStore {
    /// Create an unloaded store; call [`load`](Self::load) before use
    pub fn new(backend: impl PersistenceBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            reporter: Arc::new(LogReporter),
            storage_key: STUDY_SETS_KEY.to_string(),
            state: StoreState::Uninitialized,
            sets: Vec::new(),
        }
    }

    /// Create a store and load it immediately
    pub fn open(backend: impl PersistenceBackend + 'static) -> Self {
        let mut store = Self::new(backend);
        store.load();
        store
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PersistenceReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn into_shared(self) -> SharedStudySetStore {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StoreState::Ready
    }

    /// Load the collection from the backend. Missing or unreadable data
    /// leaves an empty collection; the store is ready either way.
    pub fn load(&mut self) {
        self.state = StoreState::Loading;

        self.sets = match self.read_blob() {
            Ok(sets) => sets,
            Err(e) => {
                self.reporter.persistence_failed("load", &e);
                Vec::new()
            }
        };

        self.state = StoreState::Ready;
        log::info!("Loaded {} study sets", self.sets.len());
    }

    fn read_blob(&self) -> Result<Vec<StudySet>> {
        let Some(content) = self.backend.read(&self.storage_key)? else {
            return Ok(Vec::new());
        };

        let mut sets = match serde_json::from_str::<StoredBlob>(&content)? {
            StoredBlob::Versioned(data) if data.version > STORAGE_VERSION => {
                return Err(StudySetStoreError::UnsupportedVersion(data.version));
            }
            StoredBlob::Versioned(data) => data.study_sets,
            StoredBlob::Legacy(sets) => {
                log::info!("Migrating unversioned study set data to version {}", STORAGE_VERSION);
                sets
            }
        };

        // Ids must be unique; keep the first (most recent) occurrence
        let mut seen = std::collections::HashSet::new();
        sets.retain(|s| {
            let fresh = seen.insert(s.id);
            if !fresh {
                log::warn!("Dropping duplicate study set {}", s.id);
            }
            fresh
        });

        Ok(sets)
    }

    /// Serialize the whole collection in the persisted layout
    pub fn to_json(&self) -> Result<String> {
        let data = StudySetsData {
            version: STORAGE_VERSION,
            study_sets: &self.sets,
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    fn try_persist(&self) -> Result<()> {
        let json = self.to_json()?;
        self.backend.write(&self.storage_key, &json)?;
        Ok(())
    }

    /// Overwrite the stored blob, reporting (never returning) failures
    fn persist(&self, operation: &str) {
        if let Err(e) = self.try_persist() {
            self.reporter.persistence_failed(operation, &e);
        }
    }

    /// Write the collection out once more, e.g. at shutdown
    pub fn flush(&self) {
        if self.is_ready() {
            self.persist("flush");
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StudySetStoreError::NotReady)
        }
    }

    // ==================== Queries ====================

    /// All sets in collection order (most recently created first)
    pub fn list(&self) -> Vec<StudySet> {
        if !self.is_ready() {
            return Vec::new();
        }
        self.sets.clone()
    }

    pub fn len(&self) -> usize {
        if self.is_ready() {
            self.sets.len()
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a set by id
    pub fn get(&self, id: Uuid) -> Option<StudySet> {
        if !self.is_ready() {
            return None;
        }
        self.sets.iter().find(|s| s.id == id).cloned()
    }

    /// Sets whose name or any tag contains `query` as given (whitespace
    /// included), ignoring case, in collection order
    pub fn search(&self, query: &str) -> Vec<StudySet> {
        if !self.is_ready() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.sets
            .iter()
            .filter(|s| s.matches(&needle))
            .cloned()
            .collect()
    }

    /// Up to `limit` sets, most recently updated first. Ties keep
    /// collection order.
    pub fn recent(&self, limit: usize) -> Vec<StudySet> {
        if !self.is_ready() {
            return Vec::new();
        }
        let mut sets = self.sets.clone();
        sets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sets.truncate(limit);
        sets
    }

    // ==================== Mutations ====================

    /// Create a new set at the front of the collection
    pub fn create(&mut self, request: CreateStudySet) -> Result<StudySet> {
        self.ensure_ready()?;

        let set = StudySet::new(request);
        self.sets.insert(0, set.clone());
        self.persist("create");

        log::info!("Created {} study set {} ({})", set.mode(), set.id, set.name);
        Ok(set)
    }

    /// Merge `update` into the set with `id`. Returns `Ok(None)` if there
    /// is no such set.
    pub fn update(&mut self, id: Uuid, update: UpdateStudySet) -> Result<Option<StudySet>> {
        self.ensure_ready()?;

        let Some(set) = self.sets.iter_mut().find(|s| s.id == id) else {
            log::debug!("Ignoring update for unknown study set {}", id);
            return Ok(None);
        };

        if let Some(payload) = &update.payload {
            if payload.mode() != set.mode() {
                return Err(StudySetStoreError::ModeMismatch {
                    expected: set.mode(),
                    found: payload.mode(),
                });
            }
        }

        if let Some(name) = update.name {
            set.name = name;
        }
        if let Some(tags) = update.tags {
            set.tags = normalize_tags(tags);
        }
        if let Some(source_text) = update.source_text {
            set.source_text = Some(source_text);
        }
        if let Some(summary) = update.summary {
            set.summary = Some(summary);
        }
        if let Some(payload) = update.payload {
            set.payload = payload;
        }
        set.touch();

        let updated = set.clone();
        self.persist("update");
        Ok(Some(updated))
    }

    /// Remove the set with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: Uuid) -> Result<bool> {
        self.ensure_ready()?;

        let before = self.sets.len();
        self.sets.retain(|s| s.id != id);
        let removed = self.sets.len() != before;

        if removed {
            log::info!("Deleted study set {}", id);
        }
        self.persist("delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study_sets::backend::{FileBackend, MemoryBackend};
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn flashcards(name: &str) -> CreateStudySet {
        CreateStudySet::new(
            name,
            StudyPayload::Flashcards {
                flashcards: vec![
                    FlashcardItem {
                        question: "What is a cell?".to_string(),
                        answer: "The basic unit of life".to_string(),
                    },
                    FlashcardItem {
                        question: "What is DNA?".to_string(),
                        answer: "Genetic material".to_string(),
                    },
                ],
            },
        )
    }

    fn create_test_store() -> (StudySetStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = StudySetStore::open(Arc::clone(&backend));
        (store, backend)
    }

    /// Sleeps between mutations so `updated_at` values are distinct
    fn tick() {
        sleep(Duration::from_millis(5));
    }

    struct FailingBackend;

    impl PersistenceBackend for FailingBackend {
        fn read(&self, _key: &str) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "quota exceeded"))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        failures: Mutex<Vec<String>>,
    }

    impl PersistenceReporter for RecordingReporter {
        fn persistence_failed(&self, operation: &str, _error: &StudySetStoreError) {
            self.failures.lock().unwrap().push(operation.to_string());
        }
    }

    #[test]
    fn test_create_assigns_id_and_timestamps() {
        let (mut store, _backend) = create_test_store();

        let a = store.create(flashcards("Biology 101")).unwrap();
        let b = store.create(flashcards("Biology 102")).unwrap();

        assert!(!a.id.is_nil());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(a.mode(), StudyMode::Flashcards);

        // Most recent first
        let names: Vec<_> = store.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Biology 102", "Biology 101"]);
    }

    #[test]
    fn test_update_renames_and_refreshes_timestamp() {
        let (mut store, _backend) = create_test_store();
        let created = store.create(flashcards("Old name")).unwrap();

        let updated = store
            .update(created.id, UpdateStudySet::rename("X"))
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "X");
        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.name, "X");
        assert!(fetched.updated_at > created.updated_at);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let (mut store, _backend) = create_test_store();
        store.create(flashcards("Keep")).unwrap();

        let result = store.update(Uuid::new_v4(), UpdateStudySet::rename("X")).unwrap();
        assert!(result.is_none());
        assert_eq!(store.list()[0].name, "Keep");
    }

    #[test]
    fn test_update_rejects_payload_of_other_mode() {
        let (mut store, _backend) = create_test_store();
        let created = store.create(flashcards("Cards")).unwrap();

        let update = UpdateStudySet {
            payload: Some(StudyPayload::Quiz { quiz_questions: Vec::new() }),
            ..Default::default()
        };
        let err = store.update(created.id, update).unwrap_err();
        assert!(matches!(
            err,
            StudySetStoreError::ModeMismatch {
                expected: StudyMode::Flashcards,
                found: StudyMode::Quiz
            }
        ));
        assert_eq!(store.get(created.id).unwrap(), created);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mut store, _backend) = create_test_store();
        let created = store.create(flashcards("Temp")).unwrap();

        assert!(store.delete(created.id).unwrap());
        assert!(store.get(created.id).is_none());
        assert!(!store.delete(created.id).unwrap());
    }

    #[test]
    fn test_recent_orders_by_updated_at() {
        let (mut store, _backend) = create_test_store();
        let first = store.create(flashcards("First")).unwrap();
        tick();
        let second = store.create(flashcards("Second")).unwrap();
        tick();
        let third = store.create(flashcards("Third")).unwrap();

        let recent = store.recent(2);
        let ids: Vec<_> = recent.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);

        // Touching the oldest set moves it to the front
        tick();
        store.update(first.id, UpdateStudySet::rename("First again")).unwrap();
        assert_eq!(store.recent(DEFAULT_RECENT_LIMIT)[0].id, first.id);
        assert_eq!(store.recent(DEFAULT_RECENT_LIMIT).len(), 3);
        // Collection order is unchanged
        assert_eq!(store.list()[2].id, first.id);
    }

    #[test]
    fn test_search_matches_name_or_tag() {
        let (mut store, _backend) = create_test_store();
        store.create(flashcards("Biology 101")).unwrap();
        store
            .create(flashcards("Cells").with_tags(vec!["biology".to_string()]))
            .unwrap();
        store.create(flashcards("Chemistry")).unwrap();

        let names: Vec<_> = store.search("bio").into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Cells", "Biology 101"]);

        assert_eq!(store.search("CHEM").len(), 1);
        assert!(store.search("physics").is_empty());
    }

    #[test]
    fn test_search_keeps_whitespace_in_query() {
        let (mut store, _backend) = create_test_store();
        store.create(flashcards("Biology 101")).unwrap();
        store.create(flashcards("Chemistry")).unwrap();

        assert!(store.search("bio ").is_empty());
        assert!(store.search("   ").is_empty());
        assert_eq!(store.search("logy 1").len(), 1);
    }

    #[test]
    fn test_roundtrip_through_backend() {
        let (mut store, backend) = create_test_store();
        let quiz = CreateStudySet::new(
            "Planets",
            StudyPayload::Quiz {
                quiz_questions: vec![QuizQuestion {
                    question: "Largest planet?".to_string(),
                    options: [
                        "Mars".to_string(),
                        "Jupiter".to_string(),
                        "Venus".to_string(),
                        "Earth".to_string(),
                    ],
                    correct_answer: "Jupiter".to_string(),
                    explanation: Some("It is a gas giant".to_string()),
                }],
            },
        )
        .with_source_text("The solar system has eight planets.")
        .with_tags(vec!["astronomy".to_string()]);
        store.create(flashcards("Biology")).unwrap();
        store.create(quiz).unwrap();

        let reloaded = StudySetStore::open(Arc::clone(&backend));
        assert_eq!(reloaded.list(), store.list());

        // Serialized form reloads into an identical collection
        let copy = MemoryBackend::new().with_entry(STUDY_SETS_KEY, &store.to_json().unwrap());
        assert_eq!(StudySetStore::open(copy).list(), store.list());
    }

    #[test]
    fn test_file_backed_store_survives_restart() {
        let temp = TempDir::new().unwrap();
        let created = {
            let backend = FileBackend::new(temp.path().to_path_buf()).unwrap();
            let mut store = StudySetStore::open(backend);
            store.create(flashcards("Persisted")).unwrap()
        };

        let store = StudySetStore::open(FileBackend::new(temp.path().to_path_buf()).unwrap());
        assert_eq!(store.get(created.id), Some(created));
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let reporter = Arc::new(RecordingReporter::default());
        let backend = MemoryBackend::new().with_entry(STUDY_SETS_KEY, "{not json");
        let mut store = StudySetStore::new(backend).with_reporter(reporter.clone());
        store.load();

        assert!(store.is_ready());
        assert!(store.is_empty());
        assert_eq!(*reporter.failures.lock().unwrap(), vec!["load"]);
    }

    #[test]
    fn test_newer_version_is_not_read() {
        let blob = serde_json::json!({"version": STORAGE_VERSION + 1, "studySets": []});
        let backend = MemoryBackend::new().with_entry(STUDY_SETS_KEY, &blob.to_string());
        let store = StudySetStore::open(backend);
        assert!(store.is_ready());
        assert!(store.is_empty());
    }

    #[test]
    fn test_legacy_array_is_migrated() {
        let set = StudySet::new(flashcards("Legacy"));
        let legacy = serde_json::to_string(&vec![set.clone()]).unwrap();
        let backend = Arc::new(MemoryBackend::new().with_entry(STUDY_SETS_KEY, &legacy));

        let mut store = StudySetStore::open(Arc::clone(&backend));
        assert_eq!(store.get(set.id), Some(set.clone()));

        store.update(set.id, UpdateStudySet::rename("Migrated")).unwrap();
        let stored: serde_json::Value =
            serde_json::from_str(&backend.read(STUDY_SETS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored["version"], STORAGE_VERSION);
        assert_eq!(stored["studySets"][0]["name"], "Migrated");
    }

    #[test]
    fn test_write_failure_is_reported_not_raised() {
        let reporter = Arc::new(RecordingReporter::default());
        let mut store = StudySetStore::new(FailingBackend).with_reporter(reporter.clone());
        store.load();

        let created = store.create(flashcards("In memory only")).unwrap();
        store.update(created.id, UpdateStudySet::rename("Still here")).unwrap();

        assert_eq!(store.get(created.id).unwrap().name, "Still here");
        assert_eq!(*reporter.failures.lock().unwrap(), vec!["create", "update"]);
    }

    #[test]
    fn test_unloaded_store_reads_empty_and_rejects_writes() {
        let legacy = serde_json::to_string(&vec![StudySet::new(flashcards("x"))]).unwrap();
        let backend = MemoryBackend::new().with_entry(STUDY_SETS_KEY, &legacy);
        let mut store = StudySetStore::new(backend);

        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(store.list().is_empty());
        assert!(store.search("x").is_empty());
        assert!(matches!(
            store.create(flashcards("Too early")),
            Err(StudySetStoreError::NotReady)
        ));

        store.load();
        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_shared_store_serializes_writers() {
        let (store, backend) = create_test_store();
        let shared = store.into_shared();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut store = shared.lock().unwrap();
                    store.create(flashcards(&format!("Set {}", i))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.lock().unwrap().len(), 4);
        let reloaded = StudySetStore::open(backend);
        assert_eq!(reloaded.len(), 4);
    }
}
