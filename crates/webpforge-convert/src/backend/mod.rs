//! The [`Backend`] trait and its implementations.
//!
//! | Backend | Feature | Requires |
//! |---------|---------|----------|
//! | [`NativeBackend`] | `native` | nothing at runtime (libwebp is linked in) |
//! | [`VipsBackend`] | - | the `vips` CLI |
//! | [`CwebpBackend`] | - | the `cwebp` CLI |
//! | [`CloudBackend`] | `cloud` | an endpoint URL and API key |

use std::path::{Path, PathBuf};

use image::DynamicImage;
use webpforge_common::{Error, Result};

use crate::capability::{CapabilityCache, CapabilityResult};
use crate::classify::normalize_name;
use crate::params::{BackendDefaults, ParamKey, ParameterSet};
use crate::source::SourceDescriptor;

#[cfg(feature = "cloud")]
mod cloud;
mod cwebp;
#[cfg(feature = "native")]
mod native;
mod vips;

#[cfg(feature = "cloud")]
pub use cloud::CloudBackend;
pub use cwebp::CwebpBackend;
#[cfg(feature = "native")]
pub use native::NativeBackend;
pub use vips::VipsBackend;

/// An opened source image, ready for a backend's save call.
///
/// Dropping the handle releases whatever it holds.
#[derive(Debug)]
pub enum ImageHandle {
    /// Pixels decoded in-process.
    Decoded(DynamicImage),
    /// A validated file handed to an external encoder as-is.
    File(PathBuf),
}

impl ImageHandle {
    /// Short name of the variant, for "unexpected handle" messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decoded(_) => "decoded image",
            Self::File(_) => "file",
        }
    }
}

/// A failed save call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// The backend knows exactly which parameter it cannot handle.
    #[error("unsupported parameter: {0}")]
    Unsupported(ParamKey),
    /// Free-text failure, classified by the executor.
    #[error("{0}")]
    Message(String),
}

/// One interchangeable WebP encoder.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait Backend: Send + Sync {
    /// Short identifier ("native", "vips", ...).
    fn name(&self) -> &'static str;

    /// Where this backend's probe result is kept.
    fn capability_cache(&self) -> &CapabilityCache;

    /// Check the backend's preconditions. Uncached; prefer
    /// [`Backend::capability`].
    fn probe(&self) -> CapabilityResult;

    /// The cached probe result, computed on first use.
    fn capability(&self) -> &CapabilityResult {
        self.capability_cache().get_or_probe(|| self.probe())
    }

    /// Fail with `SystemRequirementsNotMet` unless the backend can run.
    fn check_operationality(&self) -> Result<()> {
        self.capability().clone().into_result()
    }

    /// Fail with `SystemRequirementsNotMet` unless this particular source can
    /// be converted.
    fn check_convertability(&self, source: &SourceDescriptor) -> Result<()>;

    /// Size checks for backends that move the file elsewhere.
    fn check_filesize_requirements(&self, _source: &SourceDescriptor) -> Result<()> {
        Ok(())
    }

    /// Backend version, if known.
    fn version(&self) -> Option<String> {
        None
    }

    /// Values the backend uses when a parameter is absent.
    fn defaults(&self) -> BackendDefaults {
        BackendDefaults::default()
    }

    /// This backend's spelling of a parameter.
    fn native_name(&self, key: ParamKey) -> &'static str {
        key.name()
    }

    /// Map a parameter name as reported by the backend back to its key.
    fn param_for_native_name(&self, name: &str) -> Option<ParamKey> {
        let wanted = normalize_name(name);
        ParamKey::ALL
            .into_iter()
            .find(|k| normalize_name(self.native_name(*k)) == wanted)
    }

    /// Open the source for [`Backend::save`].
    fn open(&self, source: &SourceDescriptor) -> Result<ImageHandle>;

    /// Encode `handle` into `output` with `params`.
    fn save(
        &self,
        handle: &ImageHandle,
        output: &Path,
        params: &ParameterSet,
    ) -> std::result::Result<(), SaveError>;
}

/// Shared `open` for backends that pass the file path through.
pub(crate) fn open_as_file(source: &SourceDescriptor) -> Result<ImageHandle> {
    if !source.path().is_file() {
        return Err(Error::conversion(format!(
            "source disappeared before conversion: {}",
            source.path().display()
        )));
    }
    Ok(ImageHandle::File(source.path().to_path_buf()))
}

/// Shared "wrong handle" failure.
pub(crate) fn unexpected_handle(backend: &str, handle: &ImageHandle) -> SaveError {
    SaveError::Message(format!(
        "{backend}: unexpected image handle ({})",
        handle.kind()
    ))
}
