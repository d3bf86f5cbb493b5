use std::sync::MutexGuard;

use anyhow::{anyhow, bail, Context, Result};
use uuid::Uuid;

use studyforge_lib::api::StudyApi;
use studyforge_lib::config::Settings;
use studyforge_lib::study_sets::{StudySet, StudySetStore};
use studyforge_lib::AppState;

/// Shared application state for CLI commands
pub struct App {
    state: AppState,
}

impl App {
    pub fn new(settings: &Settings) -> Result<Self> {
        let state = AppState::init(settings).context("Failed to initialize study forge")?;
        Ok(Self { state })
    }

    pub fn api(&self) -> &StudyApi {
        &self.state.api
    }

    pub fn store(&self) -> Result<MutexGuard<'_, StudySetStore>> {
        self.state
            .store
            .lock()
            .map_err(|_| anyhow!("Study set store lock poisoned"))
    }

    /// Find a set by id, or by name (case-insensitive, exact match first,
    /// then prefix match)
    pub fn find_set(&self, key: &str) -> Result<StudySet> {
        let store = self.store()?;

        if let Ok(id) = Uuid::parse_str(key.trim()) {
            return store
                .get(id)
                .with_context(|| format!("No study set with id {}", id));
        }

        let sets = store.list();
        let key_lower = key.trim().to_lowercase();

        // Exact match first
        if let Some(set) = sets.iter().find(|s| s.name.to_lowercase() == key_lower) {
            return Ok(set.clone());
        }

        // Prefix match
        let matches: Vec<&StudySet> = sets
            .iter()
            .filter(|s| s.name.to_lowercase().starts_with(&key_lower))
            .collect();

        match matches.len() {
            0 => bail!("No study set matching '{}'", key),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous study set name '{}'. Matches:\n{}",
                key,
                matches
                    .iter()
                    .map(|s| format!("  - {} ({})", s.name, s.id))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    pub fn shutdown(&self) {
        self.state.shutdown();
    }
}
