//! File-backed persistence for tracker state.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::store::state::TrackerState;

const TEMP_SUFFIX: &str = "tmp";

/// Errors that can occur during state persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for state persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// State repository backed by a single JSON file.
///
/// Writes go to a temp file and are renamed into place so a concurrent
/// reader never observes a partially written state.
#[derive(Debug, Clone)]
pub struct StateRepository {
    path: PathBuf,
}

impl StateRepository {
    /// Create a repository bound to the given state file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted state.
    ///
    /// Returns `Ok(None)` when no state file exists yet or when the file is
    /// unreadable as state: a malformed file is logged and treated as a
    /// fresh start rather than a fatal condition. Only genuine IO errors
    /// (e.g. permissions) surface as `Err`.
    pub fn load(&self) -> StoreResult<Option<TrackerState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };

        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file is malformed, reinitializing"
                );
                Ok(None)
            }
        }
    }

    /// Persist state atomically via write-to-temp-then-rename.
    pub fn save(&self, state: &TrackerState) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        match self.path.extension() {
            Some(ext) => {
                let mut ext = ext.to_os_string();
                ext.push(".");
                ext.push(TEMP_SUFFIX);
                self.path.with_extension(ext)
            }
            None => self.path.with_extension(TEMP_SUFFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::state::UsageSample;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn repo_in(dir: &TempDir) -> StateRepository {
        StateRepository::new(dir.path().join("state.json"))
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = TempDir::new().expect("temp dir");
        let repo = repo_in(&dir);
        assert!(repo.load().expect("load").is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let repo = repo_in(&dir);
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).single().expect("timestamp");

        let mut state = TrackerState::default();
        state.sessions.push(UsageSample::new(12_000, "tests", at));
        state.weekly_total = 12_000;

        repo.save(&state).expect("save");
        let loaded = repo.load().expect("load").expect("state present");
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_malformed_state_reinitializes() {
        let dir = TempDir::new().expect("temp dir");
        let repo = repo_in(&dir);
        fs::write(repo.path(), "{not json").expect("write garbage");

        assert!(repo.load().expect("load").is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().expect("temp dir");
        let repo = StateRepository::new(dir.path().join("nested/deep/state.json"));

        repo.save(&TrackerState::default()).expect("save");
        assert!(repo.path().exists());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().expect("temp dir");
        let repo = repo_in(&dir);

        repo.save(&TrackerState::default()).expect("save");
        assert!(!repo.path().with_extension("json.tmp").exists());
    }
}
