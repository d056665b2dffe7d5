//! Webpforge-Common: shared types and checks.
//!
//! This crate provides the pieces every webpforge crate agrees on:
//!
//! - **Error Handling**: the [`Error`] taxonomy and result alias
//! - **Path Safety**: [`paths::validate`] and friends, run before any I/O
//! - **Size Parsing**: shorthand byte sizes such as `"2M"`
//! - **Options**: the backend-agnostic [`ConversionOptions`]
//! - **Configuration**: serde types for the config file
//!
//! # Examples
//!
//! ```
//! use webpforge_common::paths::validate;
//! use webpforge_common::size::parse_shorthand_size;
//! use webpforge_common::{ConversionOptions, Quality};
//!
//! assert!(validate("/srv/images/cat.png", "source").is_ok());
//! assert_eq!(parse_shorthand_size("1K").unwrap(), 1024.0);
//! assert_eq!(ConversionOptions::default().quality, Quality::Auto);
//! ```

pub mod config;
pub mod error;
pub mod options;
pub mod paths;
pub mod size;

pub use error::{Error, InvalidInputKind, Result};
pub use options::*;
