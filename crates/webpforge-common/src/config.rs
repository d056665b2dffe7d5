//! Configuration types.
//!
//! The top-level [`Config`] is deserialized by the binary from TOML. Every
//! section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::options::ConversionOptions;
use crate::size::parse_shorthand_size;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub options: ConversionOptions,
    pub limits: LimitsConfig,
    pub tools: ToolsConfig,
    pub cloud: CloudConfig,
}

impl Config {
    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, value) in self.limits.ceilings() {
            // Blank means unset, as the limit checker reads it.
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                if parse_shorthand_size(value).is_err() {
                    warnings.push(format!(
                        "limits.{name} {value:?} is not a valid size; the limit will not be enforced"
                    ));
                }
            }
        }

        for (name, path) in [
            ("vips_path", &self.tools.vips_path),
            ("cwebp_path", &self.tools.cwebp_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; PATH will be searched instead",
                        p.display()
                    ));
                }
            }
        }

        if self.cloud.url.is_some() && self.cloud.api_key.is_none() {
            warnings.push("cloud.url is set but cloud.api_key is missing".into());
        }

        if self.options.max_quality < self.options.default_quality {
            warnings.push(format!(
                "options.max-quality ({}) is below options.default-quality ({})",
                self.options.max_quality, self.options.default_quality
            ));
        }

        warnings
    }
}

/// Size ceilings applied before uploading a source to a remote backend.
///
/// Values are shorthand sizes ("2M", "512K"), kept as strings until parsed so
/// the original spelling can be reported back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub upload_max_filesize: Option<String>,
    pub post_max_size: Option<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            upload_max_filesize: Some("32M".into()),
            post_max_size: Some("32M".into()),
        }
    }
}

impl LimitsConfig {
    /// Every ceiling with its config key, in check order.
    pub fn ceilings(&self) -> [(&'static str, Option<&str>); 2] {
        [
            ("upload_max_filesize", self.upload_max_filesize.as_deref()),
            ("post_max_size", self.post_max_size.as_deref()),
        ]
    }
}

/// External binary overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub vips_path: Option<PathBuf>,
    pub cwebp_path: Option<PathBuf>,
    /// Seconds before a conversion subprocess is killed.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            vips_path: None,
            cwebp_path: None,
            timeout_secs: 300,
        }
    }
}

/// Remote conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}
