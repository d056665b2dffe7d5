//! Temporary output area for a single conversion.
//!
//! Backends encode into a [`Workspace`] next to the destination; only a
//! successful result is moved into place, and the temporary directory (with
//! any partial output) is removed when the workspace is dropped.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use webpforge_common::{Error, Result};

/// Workspace for one conversion.
///
/// # Example
///
/// ```no_run
/// use webpforge_convert::Workspace;
///
/// let workspace = Workspace::new(std::path::Path::new("/srv/out/cat.webp")).unwrap();
/// let candidate = workspace.temp_file("lossy.webp");
/// // ... encode into `candidate` ...
/// workspace.finalize(&candidate).unwrap();
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    destination: PathBuf,
}

impl Workspace {
    /// Create a workspace for writing `destination`.
    ///
    /// The temporary directory is created beside the destination so the final
    /// move is a rename on the same filesystem. Missing parent directories are
    /// created.
    pub fn new(destination: &Path) -> Result<Self> {
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        std::fs::create_dir_all(parent).map_err(|e| {
            Error::conversion(format!(
                "failed to create destination directory {}: {e}",
                parent.display()
            ))
        })?;

        let temp_dir = tempfile::Builder::new()
            .prefix(".webpforge-")
            .tempdir_in(parent)
            .map_err(|e| Error::conversion(format!("failed to create temp dir: {e}")))?;

        Ok(Self {
            temp_dir,
            destination: destination.to_path_buf(),
        })
    }

    /// The final destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a path for a named temporary file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Move `produced` (a file inside the workspace) to the destination,
    /// replacing any existing file there.
    ///
    /// # Errors
    ///
    /// Returns an error if `produced` does not exist or if the move fails.
    pub fn finalize(self, produced: &Path) -> Result<PathBuf> {
        if !produced.is_file() {
            return Err(Error::conversion(format!(
                "backend reported success but produced no output at {}",
                produced.display()
            )));
        }

        // Try rename first (same filesystem), fall back to copy+remove.
        if let Err(_rename_err) = std::fs::rename(produced, &self.destination) {
            std::fs::copy(produced, &self.destination).map_err(|e| {
                Error::conversion(format!("failed to copy output to destination: {e}"))
            })?;
            let _ = std::fs::remove_file(produced);
        }

        Ok(self.destination.clone())
    }
}
