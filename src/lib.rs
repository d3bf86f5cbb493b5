pub mod api;
pub mod config;
pub mod study_sets;

use thiserror::Error;

use api::{RequestClient, RequestError, StudyApi};
use config::{ConfigError, Settings};
use study_sets::{FileBackend, SharedStudySetStore, StudySetStore};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Request client setup failed: {0}")]
    Client(#[from] RequestError),

    #[error("Failed to open data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Handles shared by every front end: the service client and the loaded
/// collection
pub struct AppState {
    pub api: StudyApi,
    pub store: SharedStudySetStore,
}

impl AppState {
    pub fn init(settings: &Settings) -> Result<Self, AppError> {
        let client = RequestClient::new(settings.api.base_url.trim())?;
        let api = StudyApi::new(client, settings.request_options())
            .with_limits(settings.limits.clone());

        let data_dir = settings.data_dir()?;
        let backend = FileBackend::new(data_dir.clone())?;
        let mut store =
            StudySetStore::new(backend).with_storage_key(settings.storage.storage_key.clone());
        store.load();
        log::debug!("Study sets stored in {:?}", data_dir);

        Ok(Self {
            api,
            store: store.into_shared(),
        })
    }

    /// Persist the collection one last time
    pub fn shutdown(&self) {
        match self.store.lock() {
            Ok(store) => store.flush(),
            Err(_) => log::error!("Study set store lock poisoned; skipping final flush"),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::study_sets::{CreateStudySet, FlashcardItem, StudyPayload};

    fn settings_in(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.storage.data_dir = Some(dir.path().to_path_buf());
        settings
    }

    #[test]
    fn test_init_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings_in(&temp_dir);

        let state = AppState::init(&settings).unwrap();
        let created = {
            let mut store = state.store.lock().unwrap();
            assert!(store.is_ready());
            store
                .create(CreateStudySet::new(
                    "Cells",
                    StudyPayload::Flashcards {
                        flashcards: vec![FlashcardItem {
                            question: "Unit of life?".to_string(),
                            answer: "The cell".to_string(),
                        }],
                    },
                ))
                .unwrap()
        };
        state.shutdown();

        let reopened = AppState::init(&settings).unwrap();
        let store = reopened.store.lock().unwrap();
        assert_eq!(store.get(created.id), Some(created));
        assert!(temp_dir.path().join("study_sets.json").exists());
    }

    #[test]
    fn test_init_rejects_bad_url() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = settings_in(&temp_dir);
        settings.api.base_url = "localhost:8000".to_string();
        assert!(matches!(AppState::init(&settings), Err(AppError::Client(_))));
    }
}
