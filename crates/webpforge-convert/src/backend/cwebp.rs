//! The `cwebp` encoder shipped with libwebp.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use image::ImageFormat;
use webpforge_common::config::ToolsConfig;
use webpforge_common::{Error, Result};

use super::{open_as_file, unexpected_handle, Backend, ImageHandle, SaveError};
use crate::capability::{CapabilityCache, CapabilityResult};
use crate::command::ToolCommand;
use crate::params::{preset_name, ParamKey, ParamValue, ParameterSet};
use crate::source::SourceDescriptor;
use crate::tools::ToolInfo;

/// Input formats cwebp decodes.
const INPUT_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Converts with the `cwebp` binary.
///
/// Metadata travels as the single `strip` flag, so a keep-some policy such as
/// `exif,icc` is rendered as `-metadata all`: whatever cwebp can copy is kept.
pub struct CwebpBackend {
    custom_path: Option<PathBuf>,
    timeout: Duration,
    tool: OnceLock<ToolInfo>,
    capability: CapabilityCache,
}

impl CwebpBackend {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            custom_path: config.cwebp_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            tool: OnceLock::new(),
            capability: CapabilityCache::new(),
        }
    }

    fn tool(&self) -> &ToolInfo {
        self.tool
            .get_or_init(|| ToolInfo::discover("cwebp", self.custom_path.as_deref(), "-version"))
    }

    /// Build the `cwebp` invocation for `params`.
    pub fn command(
        &self,
        program: PathBuf,
        source: &Path,
        output: &Path,
        params: &ParameterSet,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new(program);
        cmd.timeout(self.timeout);

        // cwebp applies -preset before anything else, so it has to come first.
        if let Some(nick) = params
            .get(ParamKey::Preset)
            .and_then(ParamValue::as_int)
            .and_then(preset_name)
        {
            cmd.arg(format!("-{}", self.native_name(ParamKey::Preset)))
                .arg(nick);
        }

        for (key, value) in params.iter() {
            let flag = format!("-{}", self.native_name(key));
            match (key, value) {
                (ParamKey::Preset, _) => {}
                (ParamKey::Strip, ParamValue::Bool(strip)) => {
                    cmd.arg(flag).arg(if strip { "none" } else { "all" });
                }
                (_, ParamValue::Bool(true)) => {
                    cmd.arg(flag);
                }
                (_, ParamValue::Bool(false)) => {}
                (_, ParamValue::Int(n)) => {
                    cmd.arg(flag).arg(n.to_string());
                }
            }
        }

        cmd.arg(source.to_string_lossy())
            .arg("-o")
            .arg(output.to_string_lossy());
        cmd
    }
}

impl Backend for CwebpBackend {
    fn name(&self) -> &'static str {
        "cwebp"
    }

    fn capability_cache(&self) -> &CapabilityCache {
        &self.capability
    }

    fn probe(&self) -> CapabilityResult {
        let tool = self.tool();
        CapabilityResult::from_requirements([
            (
                tool.path.is_some(),
                "cwebp binary is not available (install the webp package or set tools.cwebp_path).",
            ),
            (
                tool.available,
                "cwebp binary was found but `cwebp -version` failed.",
            ),
        ])
    }

    fn check_convertability(&self, source: &SourceDescriptor) -> Result<()> {
        match source.format() {
            Some(format) if INPUT_FORMATS.contains(&format) => Ok(()),
            _ => Err(Error::requirements(format!(
                "cwebp cannot read {} images",
                source.format_name()
            ))),
        }
    }

    fn version(&self) -> Option<String> {
        self.tool().version.clone()
    }

    fn native_name(&self, key: ParamKey) -> &'static str {
        match key {
            ParamKey::Quality => "q",
            ParamKey::Lossless => "lossless",
            ParamKey::Strip => "metadata",
            ParamKey::AlphaQuality => "alpha_q",
            ParamKey::Preset => "preset",
            ParamKey::NearLossless => "near_lossless",
            ParamKey::SmartSubsample => "sharp_yuv",
            ParamKey::ReductionEffort => "m",
        }
    }

    fn open(&self, source: &SourceDescriptor) -> Result<ImageHandle> {
        open_as_file(source)
    }

    fn save(
        &self,
        handle: &ImageHandle,
        output: &Path,
        params: &ParameterSet,
    ) -> std::result::Result<(), SaveError> {
        let ImageHandle::File(source) = handle else {
            return Err(unexpected_handle(self.name(), handle));
        };
        let Some(program) = self.tool().path.clone() else {
            return Err(SaveError::Message("cwebp binary is not available".into()));
        };

        let out = self
            .command(program, source, output, params)
            .execute()
            .map_err(|e| SaveError::Message(e.to_string()))?;

        if out.status.success() {
            Ok(())
        } else {
            Err(SaveError::Message(out.error_text()))
        }
    }
}
