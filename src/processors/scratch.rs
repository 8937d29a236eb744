//! Scratch directory for exported media.
//!
//! Exports land in a dedicated subdirectory of the configured path, which is
//! the only directory ever emptied or removed; anything else under the
//! configured path is left alone. It holds at most one export at a time and is
//! emptied at startup (leftovers of a crashed run), after every item, and
//! removed when the run ends.

use anyhow::{Context, Result};
use log::{info, warn};
use path_clean::PathClean;
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use walkdir::WalkDir;

use crate::common::{MAX_DELETE_ATTEMPTS, SCRATCH_SUBDIR};

#[derive(Debug, Clone)]
pub struct ScratchDir {
    base: PathBuf,
    path: PathBuf,
    /// The configured path did not exist yet, so it may go once empty
    owns_base: bool,
}

impl ScratchDir {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into().clean();
        Self {
            path: base.join(SCRATCH_SUBDIR),
            owns_base: !base.exists(),
            base,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory, or empty it if a previous run left files behind.
    pub fn reset(&self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .context(format!("failed to create scratch directory {:?}", self.path))?;
        let leftovers = self.files()?;
        if !leftovers.is_empty() {
            info!("Removing {} leftover files from {:?}", leftovers.len(), self.path);
        }
        for file in leftovers {
            delete_with_retry(&file)?;
        }
        Ok(())
    }

    /// Files currently in the directory (not recursive), sorted by name.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1) {
            let entry =
                entry.context(format!("failed to read scratch directory {:?}", self.path))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn clear(&self) -> Result<()> {
        for file in self.files()? {
            delete_with_retry(&file)?;
        }
        Ok(())
    }

    /// Empty and remove the export directory, and the configured path too
    /// when this run created it and nothing else was put there.
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            self.clear()?;
            fs::remove_dir(&self.path)
                .context(format!("failed to remove scratch directory {:?}", self.path))?;
        }
        if self.owns_base && self.base.exists() {
            if let Err(err) = fs::remove_dir(&self.base) {
                info!("Keeping {:?}: {}", self.base, err);
            }
        }
        Ok(())
    }

    /// Empties the directory when dropped, whatever path the caller took.
    pub fn guard(&self) -> ScratchGuard<'_> {
        ScratchGuard(self)
    }
}

pub struct ScratchGuard<'a>(&'a ScratchDir);

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.0.clear() {
            warn!("Failed to empty scratch directory: {err:#}");
        }
    }
}

pub fn delete_with_retry(path: &Path) -> Result<()> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match fs::remove_file(path) {
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) if attempts < MAX_DELETE_ATTEMPTS => {
                warn!(
                    "Failed deleting {:?} (attempt {}), retrying in {}ms: {}",
                    path,
                    attempts,
                    100 * attempts,
                    err
                );
                thread::sleep(Duration::from_millis(100 * attempts));
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Failed deleting {:?} after {} attempts",
                    path, attempts
                ));
            }
        }
    }
}
