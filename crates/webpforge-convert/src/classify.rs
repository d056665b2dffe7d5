//! Classification of free-text backend errors.
//!
//! Backends that only report failures as text (subprocess stderr, an HTTP
//! body) go through [`classify_backend_error`]; the result is the one thing
//! the executor needs to know: is this "parameter X is not supported"?

use std::sync::LazyLock;

use regex::Regex;

/// What a backend error message means to the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// The backend does not know the named parameter, spelled as the backend
    /// spells it.
    UnsupportedParameter(String),
    Other,
}

static SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // libvips property lookup: "no property named `smart_subsample'"
        r#"no property named [`'"]?([A-Za-z0-9_-]+)"#,
        // GOption (vips CLI) and cwebp: "Unknown option --x", "Unknown option '-x'"
        r#"(?i)unknown option [`'"]?-{1,2}([A-Za-z0-9_-]+)"#,
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// Classify a backend error message.
///
/// ```
/// use webpforge_convert::classify::{classify_backend_error, ErrorClass};
///
/// assert_eq!(
///     classify_backend_error("VipsForeignSaveWebpFile: no property named `smart_subsample'"),
///     ErrorClass::UnsupportedParameter("smart_subsample".into()),
/// );
/// assert_eq!(classify_backend_error("out of memory"), ErrorClass::Other);
/// ```
pub fn classify_backend_error(text: &str) -> ErrorClass {
    SIGNATURES
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| ErrorClass::UnsupportedParameter(caps[1].to_string()))
        .unwrap_or(ErrorClass::Other)
}

/// Fold a backend spelling into a comparable form ("smart-subsample",
/// "smart_subsample" and "SMART_SUBSAMPLE" are the same name). `Q` keeps its
/// case because vips distinguishes it.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim_start_matches('-').replace('-', "_");
    if name == "Q" {
        name
    } else {
        name.to_ascii_lowercase()
    }
}
