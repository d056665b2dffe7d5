//! Path safety checks that run before any filesystem or subprocess operation.
//!
//! Paths arrive as strings because the checks are textual. Only printable
//! ASCII is accepted: NUL can truncate a path further down the stack and
//! invisible Unicode can disguise a file name. `../`
//! escapes the intended directory, and a `scheme://` prefix would be
//! interpreted as a stream wrapper by some backends.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, InvalidInputKind, Result};

static STREAM_WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+://").expect("static regex"));

/// Check a path string for traversal, stream wrappers and non-printable
/// characters.
///
/// Checks run in a fixed order and stop at the first failure. `label` names
/// the field in the error ("source", "destination").
///
/// # Examples
///
/// ```
/// use webpforge_common::paths::validate;
///
/// assert!(validate("/var/www/images/cat.png", "source").is_ok());
/// assert!(validate("/var/www/../etc/passwd", "source").is_err());
/// assert!(validate("phar://evil.phar", "source").is_err());
/// ```
pub fn validate(path: &str, label: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_input(
            InvalidInputKind::Missing,
            label,
            format!("empty path for {label}"),
        ));
    }

    if !path.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        return Err(Error::invalid_input(
            InvalidInputKind::NonPrintable,
            label,
            format!("non-printable characters are not allowed in {label}"),
        ));
    }

    if path.contains("../") {
        return Err(Error::invalid_input(
            InvalidInputKind::Traversal,
            label,
            format!("directory traversal is not allowed in {label} path"),
        ));
    }

    if STREAM_WRAPPER.is_match(path) {
        return Err(Error::invalid_input(
            InvalidInputKind::StreamWrapper,
            label,
            format!("stream wrappers are not allowed in {label} path"),
        ));
    }

    Ok(())
}

/// [`validate`], then require that the path exists and is not a directory.
pub fn validate_exists(path: &str, label: &str) -> Result<()> {
    validate(path, label)?;

    let p = Path::new(path);
    if !p.exists() {
        return Err(Error::target_not_found(label, path));
    }
    if p.is_dir() {
        return Err(Error::invalid_input(
            InvalidInputKind::IsDirectory,
            label,
            format!("{label} is a directory"),
        ));
    }
    Ok(())
}

/// Validate a conversion source: safe, existing, and a regular file.
pub fn validate_source(path: &str) -> Result<()> {
    validate_exists(path, "source")
}

/// Validate a conversion destination.
///
/// The file itself need not exist yet, but the path must not name an
/// existing directory.
pub fn validate_destination(path: &str) -> Result<()> {
    validate(path, "destination")?;
    if Path::new(path).is_dir() {
        return Err(Error::invalid_input(
            InvalidInputKind::IsDirectory,
            "destination",
            "destination is a directory",
        ));
    }
    Ok(())
}

/// Validate both ends of a conversion, source first.
pub fn validate_source_and_destination(source: &str, destination: &str) -> Result<()> {
    validate_source(source)?;
    validate_destination(destination)
}
