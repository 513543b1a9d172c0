//! Durable channel assignments
//!
//! A JSON snapshot of which source each channel points at, rewritten in full
//! after every change and read once at startup:
//!
//! ```json
//! {
//!   "version": 1,
//!   "savedAt": "2026-10-17T09:30:00Z",
//!   "assignments": { "A": "HOST (Cam 1)", "B": null }
//! }
//! ```
//!
//! Failures here are never fatal. A missing or corrupt file loads as an empty
//! mapping, and a failed write leaves the previous file in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Assignments;

/// Format version written to disk
pub const FORMAT_VERSION: u32 = 1;

/// On-disk layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAssignments {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub assignments: Assignments,
}

/// File-backed assignment store
#[derive(Debug, Clone)]
pub struct ChannelStore {
    path: PathBuf,
}

impl ChannelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved assignments
    ///
    /// Returns an empty mapping if the file is absent or unreadable.
    pub fn load(&self) -> Assignments {
        if !self.path.exists() {
            return Assignments::new();
        }

        match self.read() {
            Ok(state) => {
                tracing::info!(
                    path = %self.path.display(),
                    saved_at = %state.saved_at,
                    version = state.version,
                    "Loaded channel assignments"
                );
                state.assignments
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load channel assignments"
                );
                Assignments::new()
            }
        }
    }

    /// Write a fresh snapshot of `assignments`
    ///
    /// Errors are logged, not returned.
    pub fn save(&self, assignments: &Assignments) {
        let state = PersistedAssignments {
            version: FORMAT_VERSION,
            saved_at: Utc::now(),
            assignments: assignments.clone(),
        };

        if let Err(e) = self.write(&state) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to save channel assignments"
            );
        }
    }

    fn read(&self) -> io::Result<PersistedAssignments> {
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(io::Error::from)
    }

    fn write(&self, state: &PersistedAssignments) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(state).map_err(io::Error::from)?;

        // Write beside the target and rename over it.
        let tmp = self.tmp_path();
        if let Err(e) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
