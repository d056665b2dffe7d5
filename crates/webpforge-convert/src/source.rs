//! Validated conversion endpoints.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::ImageFormat;
use webpforge_common::{paths, Result};

/// A conversion source that passed path validation.
///
/// The file size is read lazily and cached; a failed stat is remembered as
/// "unknown" rather than retried.
#[derive(Debug)]
pub struct SourceDescriptor {
    path: PathBuf,
    size: OnceLock<Option<u64>>,
}

impl SourceDescriptor {
    /// Validate `path` as a source (safe, existing, not a directory).
    pub fn new(path: &str) -> Result<Self> {
        paths::validate_source(path)?;
        Ok(Self {
            path: PathBuf::from(path),
            size: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes, or `None` if it could not be read.
    pub fn size(&self) -> Option<u64> {
        *self
            .size
            .get_or_init(|| std::fs::metadata(&self.path).ok().map(|m| m.len()))
    }

    /// Detect the image format from the file's leading bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        image::ImageReader::open(&self.path)
            .ok()?
            .with_guessed_format()
            .ok()?
            .format()
    }

    /// Short lowercase name of the detected format, for messages.
    pub fn format_name(&self) -> String {
        self.format()
            .map(|f| format!("{f:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A conversion destination that passed path validation.
#[derive(Debug, Clone)]
pub struct DestinationDescriptor {
    path: PathBuf,
}

impl DestinationDescriptor {
    /// Validate `path` as a destination (safe, not an existing directory).
    pub fn new(path: &str) -> Result<Self> {
        paths::validate_destination(path)?;
        Ok(Self {
            path: PathBuf::from(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn size_is_read_lazily_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        fs::write(&file, vec![0u8; 1234]).unwrap();

        let source = SourceDescriptor::new(file.to_str().unwrap()).unwrap();
        assert_eq!(source.size(), Some(1234));

        fs::write(&file, vec![0u8; 10]).unwrap();
        assert_eq!(source.size(), Some(1234));
    }

    #[test]
    fn sniffs_png_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("no-extension");
        image::RgbImage::new(2, 2)
            .save_with_format(&file, ImageFormat::Png)
            .unwrap();

        let source = SourceDescriptor::new(file.to_str().unwrap()).unwrap();
        assert_eq!(source.format(), Some(ImageFormat::Png));
        assert_eq!(source.format_name(), "png");
    }

    #[test]
    fn unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, b"just text").unwrap();

        let source = SourceDescriptor::new(file.to_str().unwrap()).unwrap();
        assert_eq!(source.format(), None);
        assert_eq!(source.format_name(), "unknown");
    }

    #[test]
    fn rejects_unsafe_paths() {
        assert!(SourceDescriptor::new("phar://x.png").is_err());
        assert!(DestinationDescriptor::new("/tmp/../out.webp").is_err());
    }
}
