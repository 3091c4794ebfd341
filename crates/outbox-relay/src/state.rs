//! Relay progress state, persisted as a small JSON file.

use crate::error::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// Relay progress counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayState {
    /// Total records successfully relayed over the lifetime of the state file.
    pub items_processed: u64,
    /// When the relay last processed a record.
    pub last_update: Option<DateTime<Utc>>,
}

/// Loads and persists `RelayState`.
///
/// Saves are atomic (write to a temp file, fsync, rename) so a crash
/// mid-save never leaves a truncated state file behind.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// A missing or unreadable file is not an error: the relay starts
    /// from a zero state and rebuilds its counters as it processes.
    pub fn load(&self) -> RelayState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No relay state file, starting fresh");
                return RelayState::default();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read relay state file, starting from zero"
                );
                return RelayState::default();
            }
        };

        match serde_json::from_str::<RelayState>(&contents) {
            Ok(state) => {
                info!(items_processed = state.items_processed, "Loaded relay state");
                state
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt relay state file, starting from zero"
                );
                RelayState::default()
            }
        }
    }

    /// Persist the state atomically.
    pub fn save(&self, state: &RelayState) -> RelayResult<()> {
        let contents = serde_json::to_string_pretty(state)?;
        atomic_write_text(&self.path, &contents)?;
        debug!(items_processed = state.items_processed, "Relay state persisted");
        Ok(())
    }
}

fn atomic_write_text(path: &Path, content: &str) -> RelayResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RelayError::Config(format!("Invalid state path: {}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RelayError::Config(format!("Invalid state path: {}", path.display())))?;

    let tmp_name = format!(
        ".{}.relay.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let tmp_path = dir.join(tmp_name);

    #[cfg(unix)]
    let existing_mode = if path.exists() {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::metadata(path)?.permissions().mode())
    } else {
        None
    };

    let write_result = (|| -> Result<(), io::Error> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        #[cfg(unix)]
        if let Some(mode) = existing_mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(mode))?;
        }

        fs::rename(&tmp_path, path)?;

        if let Ok(parent_dir) = fs::File::open(dir) {
            let _ = parent_dir.sync_all();
        }

        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    Ok(())
}
