//! Remote conversion over HTTP.
//!
//! The source is uploaded as a multipart form together with the parameter set
//! (JSON, canonical names). A 2xx response body is the WebP file. Anything else
//! is a failure; a JSON error body may name the parameter it rejected:
//!
//! ```json
//! {"error": "unsupported parameter", "unsupported_parameter": "smart_subsample"}
//! ```

use std::path::Path;
use std::time::Duration;

use image::ImageFormat;
use reqwest::blocking::multipart;
use serde::Deserialize;
use webpforge_common::config::{CloudConfig, LimitsConfig};
use webpforge_common::{Error, Result};

use super::{open_as_file, unexpected_handle, Backend, ImageHandle, SaveError};
use crate::capability::{CapabilityCache, CapabilityResult};
use crate::limits;
use crate::params::ParameterSet;
use crate::source::SourceDescriptor;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    unsupported_parameter: Option<String>,
}

/// Uploads to a conversion service.
pub struct CloudBackend {
    url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    limits: LimitsConfig,
    capability: CapabilityCache,
}

impl CloudBackend {
    pub fn new(cloud: &CloudConfig, limits: &LimitsConfig) -> Self {
        Self {
            url: cloud.url.clone(),
            api_key: cloud.api_key.clone(),
            timeout: Duration::from_secs(cloud.timeout_secs),
            limits: limits.clone(),
            capability: CapabilityCache::new(),
        }
    }

    fn valid_url(&self) -> bool {
        self.url
            .as_deref()
            .and_then(|u| reqwest::Url::parse(u).ok())
            .is_some_and(|u| matches!(u.scheme(), "http" | "https"))
    }

    fn has_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Turn a non-2xx response body into a [`SaveError`].
    fn interpret_failure(&self, status: reqwest::StatusCode, body: &str) -> SaveError {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        if let Some(key) = parsed
            .unsupported_parameter
            .as_deref()
            .and_then(|name| self.param_for_native_name(name))
        {
            return SaveError::Unsupported(key);
        }

        let detail = parsed.error.unwrap_or_else(|| body.trim().to_string());
        SaveError::Message(format!("conversion service returned {status}: {detail}"))
    }

    fn upload(
        &self,
        source: &Path,
        output: &Path,
        params: &ParameterSet,
    ) -> std::result::Result<(), SaveError> {
        let (Some(url), Some(api_key)) = (self.url.as_deref(), self.api_key.as_deref()) else {
            return Err(SaveError::Message("cloud backend is not configured".into()));
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SaveError::Message(format!("failed to build HTTP client: {e}")))?;

        let data = std::fs::read(source)
            .map_err(|e| SaveError::Message(format!("failed to read {}: {e}", source.display())))?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "source".to_string());
        let parameters = serde_json::to_string(params)
            .map_err(|e| SaveError::Message(format!("failed to encode parameters: {e}")))?;

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(data).file_name(file_name))
            .text("parameters", parameters);

        tracing::debug!(url, "uploading source to conversion service");
        let response = client
            .post(url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .map_err(|e| SaveError::Message(format!("conversion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(self.interpret_failure(status, &body));
        }

        let bytes = response
            .bytes()
            .map_err(|e| SaveError::Message(format!("failed to read response body: {e}")))?;
        std::fs::write(output, &bytes)
            .map_err(|e| SaveError::Message(format!("failed to write {}: {e}", output.display())))
    }
}

impl Backend for CloudBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn capability_cache(&self) -> &CapabilityCache {
        &self.capability
    }

    fn probe(&self) -> CapabilityResult {
        CapabilityResult::from_requirements([
            (self.url.is_some(), "cloud.url is not configured"),
            (self.valid_url(), "cloud.url is not a valid http(s) URL"),
            (self.has_key(), "cloud.api_key is not configured"),
        ])
    }

    fn check_convertability(&self, source: &SourceDescriptor) -> Result<()> {
        match source.format() {
            Some(ImageFormat::Jpeg | ImageFormat::Png) => Ok(()),
            _ => Err(Error::requirements(format!(
                "the conversion service only accepts jpeg and png, got {}",
                source.format_name()
            ))),
        }
    }

    fn check_filesize_requirements(&self, source: &SourceDescriptor) -> Result<()> {
        limits::check_filesize_requirements(source, &self.limits)
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
        match handle {
            ImageHandle::File(source) => self.upload(source, output, params),
            other => Err(unexpected_handle(self.name(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamKey;
    use assert_matches::assert_matches;

    fn backend(url: Option<&str>, key: Option<&str>) -> CloudBackend {
        CloudBackend::new(
            &CloudConfig {
                url: url.map(String::from),
                api_key: key.map(String::from),
                ..Default::default()
            },
            &LimitsConfig::default(),
        )
    }

    #[test]
    fn unconfigured_is_not_operational() {
        let b = backend(None, None);
        assert_eq!(
            b.capability(),
            &CapabilityResult::NotOperational("cloud.url is not configured".into())
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        let b = backend(Some("ftp://convert.example.com"), Some("k"));
        assert!(!b.capability().is_operational());
        let b = backend(Some("not a url"), Some("k"));
        assert!(!b.capability().is_operational());
    }

    #[test]
    fn requires_api_key() {
        let b = backend(Some("https://convert.example.com/v1"), Some("  "));
        assert_eq!(
            b.capability(),
            &CapabilityResult::NotOperational("cloud.api_key is not configured".into())
        );
        let b = backend(Some("https://convert.example.com/v1"), Some("secret"));
        assert!(b.capability().is_operational());
    }

    #[test]
    fn structured_rejection_names_parameter() {
        let b = backend(None, None);
        let err = b.interpret_failure(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"unsupported parameter","unsupported_parameter":"alpha_q"}"#,
        );
        assert_eq!(err, SaveError::Unsupported(ParamKey::AlphaQuality));
    }

    #[test]
    fn other_failures_carry_the_body() {
        let b = backend(None, None);
        let err = b.interpret_failure(reqwest::StatusCode::SERVICE_UNAVAILABLE, "down for maintenance");
        assert_matches!(err, SaveError::Message(m) if m.contains("503") && m.contains("down for maintenance"));

        let err = b.interpret_failure(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"unsupported_parameter":"frobnicate"}"#,
        );
        assert_matches!(err, SaveError::Message(_));
    }

    #[test]
    fn oversized_source_is_rejected() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), vec![0u8; 4096]).unwrap();
        let source = SourceDescriptor::new(file.path().to_str().unwrap()).unwrap();

        let b = CloudBackend::new(
            &CloudConfig::default(),
            &LimitsConfig {
                upload_max_filesize: Some("2K".into()),
                post_max_size: None,
            },
        );
        let err = b.check_filesize_requirements(&source).unwrap_err();
        assert!(err.to_string().contains("upload_max_filesize"));
    }
}
