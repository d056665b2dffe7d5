//! Backend parameter sets and their construction from [`ConversionOptions`].
//!
//! Keys use libvips' webpsave property names as the canonical spelling; each
//! backend translates them into its own dialect when it renders a call.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use webpforge_common::{ConversionOptions, Encoding, Error, InvalidInputKind, Result};

/// Encoder presets, indexed by their ordinal.
pub const PRESETS: [&str; 6] = ["default", "picture", "photo", "drawing", "icon", "text"];

/// Ordinal of a preset name, if it is one of [`PRESETS`].
pub fn preset_ordinal(name: &str) -> Option<i64> {
    PRESETS.iter().position(|p| *p == name).map(|i| i as i64)
}

/// Preset name for an ordinal.
pub fn preset_name(ordinal: i64) -> Option<&'static str> {
    usize::try_from(ordinal).ok().and_then(|i| PRESETS.get(i).copied())
}

/// A parameter a backend may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ParamKey {
    #[serde(rename = "Q")]
    Quality,
    #[serde(rename = "lossless")]
    Lossless,
    #[serde(rename = "strip")]
    Strip,
    #[serde(rename = "alpha_q")]
    AlphaQuality,
    #[serde(rename = "preset")]
    Preset,
    #[serde(rename = "near_lossless")]
    NearLossless,
    #[serde(rename = "smart_subsample")]
    SmartSubsample,
    #[serde(rename = "reduction_effort")]
    ReductionEffort,
}

impl ParamKey {
    pub const ALL: [ParamKey; 8] = [
        Self::Quality,
        Self::Lossless,
        Self::Strip,
        Self::AlphaQuality,
        Self::Preset,
        Self::NearLossless,
        Self::SmartSubsample,
        Self::ReductionEffort,
    ];

    /// Canonical (libvips) property name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Quality => "Q",
            Self::Lossless => "lossless",
            Self::Strip => "strip",
            Self::AlphaQuality => "alpha_q",
            Self::Preset => "preset",
            Self::NearLossless => "near_lossless",
            Self::SmartSubsample => "smart_subsample",
            Self::ReductionEffort => "reduction_effort",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
}

impl ParamValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Backend-native parameters for one conversion call, ordered by key.
///
/// Once handed to the executor, entries are only ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<ParamKey, ParamValue>);

impl ParameterSet {
    pub fn get(&self, key: ParamKey) -> Option<ParamValue> {
        self.0.get(&key).copied()
    }

    pub fn contains(&self, key: ParamKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, ParamValue)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.0.keys().copied()
    }

    pub(crate) fn remove(&mut self, key: ParamKey) -> Option<ParamValue> {
        self.0.remove(&key)
    }

    fn insert(&mut self, key: ParamKey, value: ParamValue) {
        self.0.insert(key, value);
    }
}

impl FromIterator<(ParamKey, ParamValue)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (ParamKey, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The values a backend uses when a parameter is absent.
///
/// Parameters equal to these are left out of the set, so an older backend
/// that lacks the parameter entirely is never asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDefaults {
    pub alpha_quality: u8,
    pub near_lossless: u8,
    pub smart_subsample: bool,
    pub method: u8,
}

impl Default for BackendDefaults {
    /// libwebp's own defaults, which vips and cwebp both inherit.
    fn default() -> Self {
        Self {
            alpha_quality: 100,
            near_lossless: 100,
            smart_subsample: false,
            method: 4,
        }
    }
}

/// Build the parameter set for one encoding pass.
///
/// `quality` must already be concrete ("auto" resolved). `lossless` selects the
/// pass; near-lossless is only emitted when the options explicitly ask for
/// lossless encoding, never during an `auto` pass.
pub fn build(
    options: &ConversionOptions,
    defaults: &BackendDefaults,
    lossless: bool,
    quality: u8,
) -> Result<ParameterSet> {
    let mut params = ParameterSet::default();

    params.insert(ParamKey::Quality, ParamValue::Int(i64::from(quality.min(100))));
    params.insert(ParamKey::Lossless, ParamValue::Bool(lossless));
    params.insert(ParamKey::Strip, ParamValue::Bool(options.metadata.strips()));

    if options.smart_subsample != defaults.smart_subsample {
        params.insert(
            ParamKey::SmartSubsample,
            ParamValue::Bool(options.smart_subsample),
        );
    }

    if options.alpha_quality != defaults.alpha_quality {
        params.insert(
            ParamKey::AlphaQuality,
            ParamValue::Int(i64::from(options.alpha_quality.min(100))),
        );
    }

    if options.method != defaults.method {
        params.insert(
            ParamKey::ReductionEffort,
            ParamValue::Int(i64::from(options.method.min(6))),
        );
    }

    if let Some(name) = options.preset.as_deref() {
        let ordinal = preset_ordinal(name).ok_or_else(|| {
            Error::invalid_input(
                InvalidInputKind::Option,
                "preset",
                format!("unknown preset {name:?} (valid: {})", PRESETS.join(", ")),
            )
        })?;
        params.insert(ParamKey::Preset, ParamValue::Int(ordinal));
    }

    if options.near_lossless != defaults.near_lossless && options.encoding == Encoding::Lossless {
        params.insert(
            ParamKey::NearLossless,
            ParamValue::Int(i64::from(options.near_lossless.min(100))),
        );
    }

    Ok(params)
}
