//! Shorthand byte sizes ("2M", "512K", "1G").
//!
//! Units are the letters `b k m g t p e z y`, each a successive power of
//! 1024, case-insensitive. The number is truncated before scaling, so "1.9K"
//! is 1024 bytes.

use std::sync::LazyLock;

use regex::Regex;

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)([bkmgtpezy]?)\s*$").expect("static regex")
});

const UNITS: &str = "bkmgtpezy";

/// A size string that does not follow the shorthand grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse {0:?} as a shorthand byte size")]
pub struct SizeParseError(pub String);

/// Parse a shorthand size into a byte count.
///
/// The result is a float because the larger units overflow `u64`; do not
/// compare high values for equality.
///
/// # Examples
///
/// ```
/// use webpforge_common::size::parse_shorthand_size;
///
/// assert_eq!(parse_shorthand_size("2M").unwrap(), 2_097_152.0);
/// assert_eq!(parse_shorthand_size("512").unwrap(), 512.0);
/// assert_eq!(parse_shorthand_size("1.9K").unwrap(), 1024.0);
/// assert!(parse_shorthand_size("abc").is_err());
/// ```
pub fn parse_shorthand_size(input: &str) -> Result<f64, SizeParseError> {
    let caps = SHORTHAND
        .captures(input)
        .ok_or_else(|| SizeParseError(input.to_string()))?;

    let digits: f64 = caps[1]
        .parse()
        .map_err(|_| SizeParseError(input.to_string()))?;
    let digits = digits.floor();

    let unit = caps[2].to_ascii_lowercase();
    if unit.is_empty() {
        return Ok(digits);
    }

    let power = UNITS
        .find(unit.as_str())
        .ok_or_else(|| SizeParseError(input.to_string()))?;
    Ok(digits * 1024f64.powi(power as i32))
}
