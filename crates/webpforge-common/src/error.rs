//! Error taxonomy shared by every webpforge crate.
//!
//! Callers (and any fallback chain sitting above a single backend) branch on
//! the variant, never on the message text.

use std::fmt;

/// Which input check rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidInputKind {
    /// The value was empty.
    Missing,
    /// The value contained a character outside printable ASCII (NUL included).
    NonPrintable,
    /// The path contained a `../` sequence.
    Traversal,
    /// The path started with a `scheme://` prefix.
    StreamWrapper,
    /// The path points at an existing directory.
    IsDirectory,
    /// A conversion option had a value outside its domain.
    Option,
}

impl fmt::Display for InvalidInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::NonPrintable => write!(f, "non-printable"),
            Self::Traversal => write!(f, "traversal"),
            Self::StreamWrapper => write!(f, "stream-wrapper"),
            Self::IsDirectory => write!(f, "is-directory"),
            Self::Option => write!(f, "option"),
        }
    }
}

/// Common error type for webpforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-supplied path or option is malformed or unsafe. Never retried.
    #[error("Invalid input ({kind}) for {field}: {message}")]
    InvalidInput {
        /// Which check failed.
        kind: InvalidInputKind,
        /// The offending field, e.g. "source" or "preset".
        field: String,
        /// Human-readable description.
        message: String,
    },

    /// The source file does not exist.
    #[error("{field} file was not found: {path}")]
    TargetNotFound {
        /// The field that named the file.
        field: String,
        /// The path that was looked up.
        path: String,
    },

    /// The backend cannot run in this environment.
    #[error("System requirements not met: {0}")]
    SystemRequirementsNotMet(String),

    /// The backend accepted the preconditions but the encode itself failed.
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input(
        kind: InvalidInputKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new TargetNotFound error.
    pub fn target_not_found(field: impl Into<String>, path: impl Into<String>) -> Self {
        Self::TargetNotFound {
            field: field.into(),
            path: path.into(),
        }
    }

    /// Create a new SystemRequirementsNotMet error.
    pub fn requirements<S: Into<String>>(reason: S) -> Self {
        Self::SystemRequirementsNotMet(reason.into())
    }

    /// Create a new ConversionFailed error.
    pub fn conversion<S: Into<String>>(reason: S) -> Self {
        Self::ConversionFailed(reason.into())
    }

    /// The rejected-input kind, if this is an InvalidInput error.
    pub fn invalid_input_kind(&self) -> Option<InvalidInputKind> {
        match self {
            Self::InvalidInput { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether a dispatcher should move on to the next candidate backend.
    ///
    /// Only an unusable backend qualifies; bad input or a failed encode would
    /// fail the same way elsewhere.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, Self::SystemRequirementsNotMet(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_names_field_and_kind() {
        let err = Error::invalid_input(
            InvalidInputKind::Traversal,
            "source",
            "directory traversal is not allowed",
        );
        assert_eq!(
            err.to_string(),
            "Invalid input (traversal) for source: directory traversal is not allowed"
        );
        assert_eq!(err.invalid_input_kind(), Some(InvalidInputKind::Traversal));
    }

    #[test]
    fn target_not_found_display() {
        let err = Error::target_not_found("source", "/tmp/missing.png");
        assert_eq!(
            err.to_string(),
            "source file was not found: /tmp/missing.png"
        );
        assert_eq!(err.invalid_input_kind(), None);
    }

    #[test]
    fn only_requirements_errors_allow_fallback() {
        assert!(Error::requirements("vips binary not found").is_recoverable_by_fallback());
        assert!(!Error::conversion("encoder crashed").is_recoverable_by_fallback());
        assert!(!Error::target_not_found("source", "/x").is_recoverable_by_fallback());
        assert!(
            !Error::invalid_input(InvalidInputKind::Missing, "source", "empty")
                .is_recoverable_by_fallback()
        );
    }

    #[test]
    fn conversion_display_keeps_backend_message() {
        let err = Error::conversion("VipsForeignSaveWebp: unable to write");
        assert_eq!(
            err.to_string(),
            "Conversion failed: VipsForeignSaveWebp: unable to write"
        );
    }
}
