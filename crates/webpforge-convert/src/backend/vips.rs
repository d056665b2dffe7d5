//! libvips through its `vips` command-line front end.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use webpforge_common::config::ToolsConfig;
use webpforge_common::Result;

use super::{open_as_file, unexpected_handle, Backend, ImageHandle, SaveError};
use crate::capability::{CapabilityCache, CapabilityResult};
use crate::command::ToolCommand;
use crate::params::{preset_name, ParamKey, ParamValue, ParameterSet};
use crate::source::SourceDescriptor;
use crate::tools::ToolInfo;

/// Converts with `vips webpsave`.
///
/// Older libvips releases reject newer webpsave options (`smart_subsample`,
/// `reduction_effort`, ...) with an "Unknown option" message; those are
/// pruned by the executor.
pub struct VipsBackend {
    custom_path: Option<PathBuf>,
    timeout: Duration,
    tool: OnceLock<ToolInfo>,
    capability: CapabilityCache,
}

impl VipsBackend {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            custom_path: config.vips_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            tool: OnceLock::new(),
            capability: CapabilityCache::new(),
        }
    }

    fn tool(&self) -> &ToolInfo {
        self.tool
            .get_or_init(|| ToolInfo::discover("vips", self.custom_path.as_deref(), "--version"))
    }

    /// Build the `vips webpsave` invocation for `params`.
    pub fn command(
        &self,
        program: PathBuf,
        source: &Path,
        output: &Path,
        params: &ParameterSet,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new(program);
        cmd.timeout(self.timeout);
        cmd.arg("webpsave")
            .arg(source.to_string_lossy())
            .arg(output.to_string_lossy());

        // libvips drives near-lossless strength through Q.
        let near_lossless = params.get(ParamKey::NearLossless).and_then(ParamValue::as_int);

        for (key, value) in params.iter() {
            let flag = format!("--{}", self.native_name(key).replace('_', "-"));
            match (key, value) {
                (ParamKey::Quality, ParamValue::Int(q)) => {
                    cmd.arg(format!("{flag}={}", near_lossless.unwrap_or(q)));
                }
                (ParamKey::NearLossless, _) => {
                    cmd.arg(flag);
                }
                (ParamKey::Preset, ParamValue::Int(ordinal)) => {
                    let nick = preset_name(ordinal).unwrap_or("default");
                    cmd.arg(format!("{flag}={nick}"));
                }
                (_, ParamValue::Bool(true)) => {
                    cmd.arg(flag);
                }
                (_, ParamValue::Bool(false)) => {}
                (_, ParamValue::Int(n)) => {
                    cmd.arg(format!("{flag}={n}"));
                }
            }
        }
        cmd
    }
}

impl Backend for VipsBackend {
    fn name(&self) -> &'static str {
        "vips"
    }

    fn capability_cache(&self) -> &CapabilityCache {
        &self.capability
    }

    fn probe(&self) -> CapabilityResult {
        let tool = self.tool();
        CapabilityResult::from_requirements([
            (
                tool.path.is_some(),
                "Required vips binary is not available (install libvips-tools or set tools.vips_path).",
            ),
            (
                tool.available,
                "vips binary was found, however something is not right: `vips --version` failed.",
            ),
        ])
    }

    fn check_convertability(&self, source: &SourceDescriptor) -> Result<()> {
        // jpeg and png are always built into libvips; other loaders are left
        // for vips itself to accept or reject.
        tracing::debug!(
            version = self.version().as_deref().unwrap_or("unknown"),
            format = %source.format_name(),
            "vips convertability"
        );
        Ok(())
    }

    fn version(&self) -> Option<String> {
        self.tool().version.clone()
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
            return Err(SaveError::Message("vips binary is not available".into()));
        };

        let output_text = self
            .command(program, source, output, params)
            .execute()
            .map_err(|e| SaveError::Message(e.to_string()))?;

        if output_text.status.success() {
            Ok(())
        } else {
            Err(SaveError::Message(output_text.error_text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> VipsBackend {
        VipsBackend::new(&ToolsConfig::default())
    }

    fn args_for(params: &ParameterSet) -> Vec<String> {
        backend()
            .command(
                PathBuf::from("vips"),
                Path::new("/in/cat.png"),
                Path::new("/out/cat.webp"),
                params,
            )
            .get_args()
            .to_vec()
    }

    #[test]
    fn renders_webpsave_arguments() {
        let params: ParameterSet = [
            (ParamKey::Quality, ParamValue::Int(80)),
            (ParamKey::Lossless, ParamValue::Bool(false)),
            (ParamKey::Strip, ParamValue::Bool(true)),
            (ParamKey::SmartSubsample, ParamValue::Bool(true)),
            (ParamKey::AlphaQuality, ParamValue::Int(90)),
            (ParamKey::Preset, ParamValue::Int(2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            args_for(&params),
            vec![
                "webpsave",
                "/in/cat.png",
                "/out/cat.webp",
                "--Q=80",
                "--strip",
                "--alpha-q=90",
                "--preset=photo",
                "--smart-subsample",
            ]
        );
    }

    #[test]
    fn near_lossless_overrides_q() {
        let params: ParameterSet = [
            (ParamKey::Quality, ParamValue::Int(80)),
            (ParamKey::Lossless, ParamValue::Bool(true)),
            (ParamKey::NearLossless, ParamValue::Int(60)),
        ]
        .into_iter()
        .collect();

        let args = args_for(&params);
        assert!(args.contains(&"--Q=60".to_string()));
        assert!(args.contains(&"--lossless".to_string()));
        assert!(args.contains(&"--near-lossless".to_string()));
    }

    #[test]
    fn maps_reported_names_back_to_keys() {
        let b = backend();
        assert_eq!(b.param_for_native_name("smart-subsample"), Some(ParamKey::SmartSubsample));
        assert_eq!(b.param_for_native_name("smart_subsample"), Some(ParamKey::SmartSubsample));
        assert_eq!(b.param_for_native_name("reduction-effort"), Some(ParamKey::ReductionEffort));
        assert_eq!(b.param_for_native_name("Q"), Some(ParamKey::Quality));
        assert_eq!(b.param_for_native_name("exact"), None);
    }

    #[test]
    fn missing_binary_is_not_operational() {
        let b = VipsBackend::new(&ToolsConfig {
            vips_path: Some(PathBuf::from("/nonexistent/vips")),
            ..Default::default()
        });
        // Only meaningful where vips is not installed.
        if which::which("vips").is_err() {
            assert!(!b.capability().is_operational());
            let err = b.check_operationality().unwrap_err();
            assert!(err.is_recoverable_by_fallback());
        }
    }

    #[test]
    fn decoded_handle_is_rejected() {
        let handle = ImageHandle::Decoded(image::DynamicImage::new_rgb8(1, 1));
        let err = backend()
            .save(&handle, Path::new("/tmp/x.webp"), &ParameterSet::default())
            .unwrap_err();
        assert!(err.to_string().contains("unexpected image handle"));
    }
}
