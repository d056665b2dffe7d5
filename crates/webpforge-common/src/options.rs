//! Backend-agnostic conversion options.
//!
//! All enums serialize in lowercase so the same spelling works in the TOML
//! config, on the command line, and in JSON reports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputKind};

/// Target quality: a fixed value or "auto" (resolved per source before any
/// backend sees it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Auto,
    Fixed(u8),
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(q) => write!(f, "{q}"),
        }
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<u8>()
            .ok()
            .filter(|q| *q <= 100)
            .map(Self::Fixed)
            .ok_or_else(|| {
                Error::invalid_input(
                    InvalidInputKind::Option,
                    "quality",
                    format!("expected 0-100 or \"auto\", got {s:?}"),
                )
            })
    }
}

impl Serialize for Quality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(q) => serializer.serialize_u8(*q),
        }
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(q) => Ok(Self::Fixed(q)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Encoding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Lossy,
    Lossless,
    /// Encode both ways and keep the smaller file.
    Auto,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lossy => write!(f, "lossy"),
            Self::Lossless => write!(f, "lossless"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lossy" => Ok(Self::Lossy),
            "lossless" => Ok(Self::Lossless),
            "auto" => Ok(Self::Auto),
            other => Err(Error::invalid_input(
                InvalidInputKind::Option,
                "encoding",
                format!("expected lossy, lossless or auto, got {other:?}"),
            )),
        }
    }
}

/// A kind of embedded metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Exif,
    Icc,
    Xmp,
}

impl MetadataKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Icc => "icc",
            Self::Xmp => "xmp",
        }
    }
}

/// Which metadata to carry over into the WebP file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetadataPolicy {
    /// Strip everything.
    #[default]
    None,
    /// Keep everything the backend can keep.
    All,
    /// Keep only the listed kinds.
    Only(Vec<MetadataKind>),
}

impl MetadataPolicy {
    /// Whether the backend should strip metadata.
    pub fn strips(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for MetadataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::All => write!(f, "all"),
            Self::Only(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}

impl FromStr for MetadataPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "none" => return Ok(Self::None),
            "all" => return Ok(Self::All),
            _ => {}
        }

        let mut kinds = Vec::new();
        for part in s.split(',').map(str::trim) {
            let kind = match part {
                "exif" => MetadataKind::Exif,
                "icc" => MetadataKind::Icc,
                "xmp" => MetadataKind::Xmp,
                other => {
                    return Err(Error::invalid_input(
                        InvalidInputKind::Option,
                        "metadata",
                        format!("unknown metadata kind {other:?}"),
                    ))
                }
            };
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(Self::Only(kinds))
    }
}

impl TryFrom<String> for MetadataPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetadataPolicy> for String {
    fn from(value: MetadataPolicy) -> Self {
        value.to_string()
    }
}

/// Uniform option set handed to every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConversionOptions {
    pub quality: Quality,
    /// Used for JPEG sources when "auto" cannot estimate the source quality.
    pub default_quality: u8,
    /// Upper bound for "auto" quality.
    pub max_quality: u8,
    pub encoding: Encoding,
    /// 100 disables near-lossless preprocessing.
    pub near_lossless: u8,
    pub alpha_quality: u8,
    /// Encoder effort, 0 (fast) to 6 (slow, small).
    pub method: u8,
    pub metadata: MetadataPolicy,
    /// One of default, picture, photo, drawing, icon, text. Validated when
    /// parameters are built.
    pub preset: Option<String>,
    pub smart_subsample: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Auto,
            default_quality: 75,
            max_quality: 85,
            encoding: Encoding::Lossy,
            near_lossless: 100,
            alpha_quality: 100,
            method: 6,
            metadata: MetadataPolicy::None,
            preset: None,
            smart_subsample: false,
        }
    }
}

impl ConversionOptions {
    /// Clamp every numeric option into its domain and normalize the preset
    /// spelling.
    #[must_use]
    pub fn validated(mut self) -> Self {
        if let Quality::Fixed(q) = self.quality {
            self.quality = Quality::Fixed(q.min(100));
        }
        self.default_quality = self.default_quality.min(100);
        self.max_quality = self.max_quality.min(100);
        self.near_lossless = self.near_lossless.min(100);
        self.alpha_quality = self.alpha_quality.min(100);
        self.method = self.method.min(6);
        self.preset = self
            .preset
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty());
        self
    }
}
