//! In-process encoding: decode with `image`, encode with libwebp.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;
use webpforge_common::{Error, Result};

use super::{unexpected_handle, Backend, ImageHandle, SaveError};
use crate::capability::{CapabilityCache, CapabilityResult};
use crate::params::{preset_name, ParamKey, ParamValue, ParameterSet};
use crate::source::SourceDescriptor;

/// Largest width or height a WebP image can have.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Encodes with the linked libwebp.
///
/// The encoder writes pixels only, so it cannot honour a request to keep
/// metadata: `strip = false` is reported as unsupported and pruned.
#[derive(Default)]
pub struct NativeBackend {
    capability: CapabilityCache,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn capability_cache(&self) -> &CapabilityCache {
        &self.capability
    }

    fn probe(&self) -> CapabilityResult {
        let smoke = DynamicImage::new_rgba8(1, 1);
        let works = encode(&smoke, &ParameterSet::default()).is_ok();
        CapabilityResult::from_requirements([(
            works,
            "libwebp failed to encode a 1x1 test image",
        )])
    }

    fn check_convertability(&self, source: &SourceDescriptor) -> Result<()> {
        if source.format().is_none() {
            return Err(Error::requirements(format!(
                "unrecognized image format: {}",
                source.path().display()
            )));
        }

        let (width, height) = reader(source.path())
            .map_err(image::ImageError::IoError)
            .and_then(|r| r.into_dimensions())
            .map_err(|e| Error::requirements(format!("cannot read image dimensions: {e}")))?;
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(Error::requirements(format!(
                "{width}x{height} exceeds the WebP limit of {WEBP_MAX_DIMENSION}px per side"
            )));
        }
        Ok(())
    }

    fn open(&self, source: &SourceDescriptor) -> Result<ImageHandle> {
        let img = reader(source.path())
            .map_err(image::ImageError::IoError)
            .and_then(|r| r.decode())
            .map_err(|e| {
                Error::conversion(format!("failed to decode {}: {e}", source.path().display()))
            })?;
        Ok(ImageHandle::Decoded(img))
    }

    fn save(
        &self,
        handle: &ImageHandle,
        output: &Path,
        params: &ParameterSet,
    ) -> std::result::Result<(), SaveError> {
        let ImageHandle::Decoded(img) = handle else {
            return Err(unexpected_handle(self.name(), handle));
        };
        if params.get(ParamKey::Strip) == Some(ParamValue::Bool(false)) {
            return Err(SaveError::Unsupported(ParamKey::Strip));
        }

        let bytes = encode(img, params)?;
        std::fs::write(output, bytes)
            .map_err(|e| SaveError::Message(format!("failed to write {}: {e}", output.display())))
    }
}

/// A reader whose decoder is chosen from the file's leading bytes, not its
/// extension.
fn reader(path: &Path) -> std::io::Result<image::ImageReader<BufReader<File>>> {
    image::ImageReader::open(path)?.with_guessed_format()
}

fn encode(img: &DynamicImage, params: &ParameterSet) -> std::result::Result<Vec<u8>, SaveError> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let config = config_for(params)?;

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| SaveError::Message(format!("libwebp encoding failed: {e:?}")))?;
    Ok(memory.to_vec())
}

fn config_for(params: &ParameterSet) -> std::result::Result<webp::WebPConfig, SaveError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| SaveError::Message("libwebp version mismatch".into()))?;

    let int = |key| params.get(key).and_then(ParamValue::as_int);
    let flag = |key| params.get(key).and_then(ParamValue::as_bool).unwrap_or(false);

    // Preset first: explicit parameters below override its tuning.
    if let Some(preset) = int(ParamKey::Preset).and_then(preset_name) {
        apply_preset(&mut config, preset);
    }
    if let Some(q) = int(ParamKey::Quality) {
        config.quality = q.clamp(0, 100) as f32;
    }
    config.lossless = i32::from(flag(ParamKey::Lossless));
    if let Some(level) = int(ParamKey::NearLossless) {
        config.near_lossless = level.clamp(0, 100) as i32;
    }
    if let Some(alpha) = int(ParamKey::AlphaQuality) {
        config.alpha_quality = alpha.clamp(0, 100) as i32;
    }
    if let Some(method) = int(ParamKey::ReductionEffort) {
        config.method = method.clamp(0, 6) as i32;
    }
    config.use_sharp_yuv = i32::from(flag(ParamKey::SmartSubsample));

    Ok(config)
}

/// libwebp's preset tuning (`WebPConfigPreset`).
fn apply_preset(config: &mut webp::WebPConfig, preset: &str) {
    match preset {
        "picture" => {
            config.sns_strength = 80;
            config.filter_sharpness = 4;
            config.filter_strength = 35;
            config.preprocessing &= !2;
        }
        "photo" => {
            config.sns_strength = 80;
            config.filter_sharpness = 3;
            config.filter_strength = 30;
            config.preprocessing |= 2;
        }
        "drawing" => {
            config.sns_strength = 25;
            config.filter_sharpness = 6;
            config.filter_strength = 10;
        }
        "icon" => {
            config.sns_strength = 0;
            config.filter_strength = 0;
            config.preprocessing &= !2;
        }
        "text" => {
            config.sns_strength = 0;
            config.filter_strength = 0;
            config.preprocessing &= !2;
            config.segments = 2;
        }
        _ => {}
    }
}
