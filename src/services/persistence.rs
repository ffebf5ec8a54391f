//! Best-effort snapshot file

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{error::PersistError, state::Snapshot};

/// Writes the latest snapshot to a fixed path for readers that poll the disk
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with one JSON line
    ///
    /// Writes a sibling temp file and renames it over the target so readers
    /// never see a truncated snapshot.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let line = snapshot.to_line()?;
        let tmp = self.path.with_extension("json.tmp");

        std::fs::write(&tmp, line.as_bytes())
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|source| PersistError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Delete the file if present
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed state file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove state file {}: {}", self.path.display(), e),
        }
    }
}
