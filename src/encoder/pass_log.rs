//! Scoped ownership of the two-pass statistics file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EncoderError;

/// Owns the statistics written by pass 1 and read by pass 2.
///
/// ffmpeg appends its own suffixes to `-passlogfile` (`-0.log`, `.mbtree`, ...),
/// so the handle owns every file in its directory that starts with the prefix.
/// Dropping the handle deletes them.
#[derive(Debug)]
pub struct PassLog {
    dir: PathBuf,
    stem: String,
}

impl PassLog {
    /// Reserves a fresh, uniquely named pass log inside `dir`.
    pub fn acquire(dir: &Path) -> Result<Self, EncoderError> {
        std::fs::create_dir_all(dir).map_err(EncoderError::PassLog)?;
        let stem = format!("passlog-{}", Uuid::new_v4().simple());
        debug!(dir = ?dir, stem = %stem, "Acquired pass log");
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
        })
    }

    /// Returns the value for ffmpeg's `-passlogfile`.
    pub fn prefix(&self) -> PathBuf {
        self.dir.join(&self.stem)
    }

    /// Lists files the encoder has written for this log.
    pub fn files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&self.stem))
            .map(|entry| entry.path())
            .collect()
    }
}

impl Drop for PassLog {
    fn drop(&mut self) {
        for file in self.files() {
            if let Err(e) = std::fs::remove_file(&file) {
                warn!(file = ?file, error = %e, "Failed to remove pass log file");
            }
        }
    }
}
