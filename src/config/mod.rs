//! Loading `webpforge.toml`.
//!
//! The config types live in [`webpforge_common::config`]; this module finds,
//! reads and checks the file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use webpforge_convert::params::{preset_ordinal, PRESETS};

pub use webpforge_common::config::*;

/// Locations searched when no config path is given, in order.
pub const DEFAULT_PATHS: [&str; 3] = [
    "./webpforge.toml",
    "~/.config/webpforge/config.toml",
    "/etc/webpforge/config.toml",
];

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    expand_paths(&mut config);
    config.options = config.options.validated();

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    Ok(config)
}

/// Load config from the default locations or return the default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_config() {
        Some(path) => {
            tracing::debug!("Using config file {:?}", path);
            load_config(&path)
        }
        None => Ok(Config::default()),
    }
}

/// First existing file among [`DEFAULT_PATHS`].
pub fn find_config() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

fn expand_paths(config: &mut Config) {
    for path in [&mut config.tools.vips_path, &mut config.tools.cwebp_path]
        .into_iter()
        .flatten()
    {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        *path = PathBuf::from(expanded);
    }
}

/// Hard errors; everything softer is reported by [`Config::validate`].
fn validate_config(config: &Config) -> Result<()> {
    if let Some(preset) = config.options.preset.as_deref() {
        if preset_ordinal(&preset.trim().to_ascii_lowercase()).is_none() {
            anyhow::bail!(
                "Unknown preset '{}' (valid: {})",
                preset,
                PRESETS.join(", ")
            );
        }
    }

    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs cannot be 0");
    }

    if config.cloud.timeout_secs == 0 {
        anyhow::bail!("cloud.timeout_secs cannot be 0");
    }

    Ok(())
}
