//! External binary discovery.
//!
//! CLI backends locate their executable once, preferring a configured path and
//! falling back to `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

/// Availability information for an external binary.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found and answered its version query.
    pub available: bool,
    /// First non-empty line of the version output, if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    /// Locate `name` and query its version with `version_arg`.
    ///
    /// If `custom_path` is given **and** exists it is used directly; otherwise
    /// [`which::which`] searches `PATH`.
    pub fn discover(name: &str, custom_path: Option<&Path>, version_arg: &str) -> Self {
        let path = resolve(name, custom_path);
        let version = path
            .as_deref()
            .and_then(|p| detect_version(p, version_arg));

        Self {
            name: name.to_string(),
            available: version.is_some(),
            version,
            path,
        }
    }
}

/// Resolve a tool's executable path.
pub fn resolve(name: &str, custom_path: Option<&Path>) -> Option<PathBuf> {
    match custom_path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            tracing::debug!(
                tool = name,
                path = %p.display(),
                "configured path does not exist; searching PATH"
            );
            which::which(name).ok()
        }
        None => which::which(name).ok(),
    }
}

/// Run `<path> <version_arg>` and return the first non-empty output line.
///
/// Some tools print their version on stderr, so both streams are consulted.
pub fn detect_version(path: &Path, version_arg: &str) -> Option<String> {
    let output = Command::new(path).arg(version_arg).output().ok()?;

    if !output.status.success() {
        return None;
    }

    let first = [&output.stdout, &output.stderr]
        .into_iter()
        .flat_map(|bytes| {
            String::from_utf8_lossy(bytes)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .next();
    first
}
