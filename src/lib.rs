//! Webpforge - image to WebP conversion
//!
//! This library crate exposes the binary's configuration loading for
//! integration testing; conversion lives in `webpforge-convert`.

pub mod config;
