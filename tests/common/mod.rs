//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use webpforge_convert::{
    Backend, CapabilityCache, CapabilityResult, ImageHandle, ParameterSet, SaveError,
    SourceDescriptor,
};

/// Write a small RGB PNG and return its path.
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 16) as u8, (y * 16) as u8, 128]))
        .save(&path)
        .unwrap();
    path
}

/// Write a small JPEG encoded at `quality` and return its path.
pub fn write_jpeg(dir: &Path, name: &str, quality: u8) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 90]));
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&img)
        .unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

/// What the stub does on one save call.
#[derive(Clone)]
pub enum Step {
    /// Write these bytes to the output.
    Write(Vec<u8>),
    /// Fail with this error.
    Fail(SaveError),
}

/// A scripted backend that records every call.
///
/// Steps are consumed in order; once exhausted the last step repeats.
pub struct StubBackend {
    capability: CapabilityCache,
    operational: CapabilityResult,
    steps: Mutex<Vec<Step>>,
    last: Mutex<Option<Step>>,
    sizer: Option<fn(&ParameterSet) -> usize>,
    pub calls: Mutex<Vec<ParameterSet>>,
}

impl StubBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            capability: CapabilityCache::new(),
            operational: CapabilityResult::Operational,
            steps: Mutex::new(steps),
            last: Mutex::new(None),
            sizer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds, writing a small fake file.
    pub fn succeeding() -> Self {
        Self::new(vec![Step::Write(b"RIFF\0\0\0\0WEBPVP8 ".to_vec())])
    }

    /// Always succeeds, writing `size(params)` bytes.
    pub fn sized(size: fn(&ParameterSet) -> usize) -> Self {
        Self {
            sizer: Some(size),
            ..Self::succeeding()
        }
    }

    pub fn not_operational(reason: &str) -> Self {
        Self {
            operational: CapabilityResult::NotOperational(reason.to_string()),
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> Vec<ParameterSet> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if !steps.is_empty() {
            *last = Some(steps.remove(0));
        }
        last.clone().unwrap_or(Step::Write(Vec::new()))
    }
}

impl Backend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn capability_cache(&self) -> &CapabilityCache {
        &self.capability
    }

    fn probe(&self) -> CapabilityResult {
        self.operational.clone()
    }

    fn check_convertability(&self, _source: &SourceDescriptor) -> webpforge_common::Result<()> {
        Ok(())
    }

    fn version(&self) -> Option<String> {
        Some("stub 1.0".into())
    }

    fn open(&self, source: &SourceDescriptor) -> webpforge_common::Result<ImageHandle> {
        Ok(ImageHandle::File(source.path().to_path_buf()))
    }

    fn save(
        &self,
        _handle: &ImageHandle,
        output: &Path,
        params: &ParameterSet,
    ) -> Result<(), SaveError> {
        self.calls.lock().unwrap().push(params.clone());
        match self.next_step() {
            Step::Write(bytes) => {
                let bytes = match self.sizer {
                    Some(size) => vec![0u8; size(params)],
                    None => bytes,
                };
                std::fs::write(output, bytes).map_err(|e| SaveError::Message(e.to_string()))
            }
            Step::Fail(err) => Err(err),
        }
    }
}

/// Entries of `dir` whose names start with `prefix`.
pub fn entries_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(prefix))
                .unwrap_or(false)
        })
        .collect()
}
