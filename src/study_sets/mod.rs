//! Saved study sets for Study Forge
//!
//! This module provides:
//! - Study set models (flashcards, quiz, test material tagged by mode)
//! - The collection store (CRUD, search, recency ordering)
//! - Persistence backends the collection is mirrored to

pub mod backend;
pub mod models;
pub mod storage;

pub use backend::{FileBackend, MemoryBackend, PersistenceBackend};
pub use models::*;
pub use storage::{
    LogReporter, PersistenceReporter, SharedStudySetStore, StoreState, StudySetStore,
    StudySetStoreError, DEFAULT_RECENT_LIMIT, STUDY_SETS_KEY,
};
