//! Upload/post size ceilings for backends that ship the source elsewhere.

use webpforge_common::config::LimitsConfig;
use webpforge_common::size::parse_shorthand_size;
use webpforge_common::{Error, Result};

use crate::source::SourceDescriptor;

/// Fail if the source is larger than any configured ceiling.
///
/// An unknown file size passes, and so does a ceiling that is unset or cannot
/// be parsed. The latter is logged since it silently disables that limit.
pub fn check_filesize_requirements(source: &SourceDescriptor, limits: &LimitsConfig) -> Result<()> {
    let Some(file_size) = source.size() else {
        tracing::debug!(
            source = %source.path().display(),
            "file size unknown; skipping size ceilings"
        );
        return Ok(());
    };
    check_size_against_limits(file_size, limits)
}

/// The size comparison itself, separated from the stat.
pub fn check_size_against_limits(file_size: u64, limits: &LimitsConfig) -> Result<()> {
    for (name, configured) in limits.ceilings() {
        let Some(configured) = configured.filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        let ceiling = match parse_shorthand_size(configured) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(ceiling = name, error = %e, "size ceiling not enforced");
                continue;
            }
        };

        if ceiling < file_size as f64 {
            return Err(Error::conversion(format!(
                "File is larger than your {name} limit. File size: {} kb. \
                 {name}: {configured} (parsed as {} kb)",
                to_kb(file_size as f64),
                to_kb(ceiling),
            )));
        }
    }
    Ok(())
}

fn to_kb(bytes: f64) -> u64 {
    (bytes / 1024.0).round() as u64
}
