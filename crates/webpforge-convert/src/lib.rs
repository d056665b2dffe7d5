//! # webpforge-convert
//!
//! WebP conversion through interchangeable backends.
//!
//! This crate provides:
//! - A [`Backend`] trait with native (libwebp), vips, cwebp and cloud
//!   implementations
//! - Cached capability probes per backend
//! - Upload size ceilings for remote backends
//! - Parameter construction from [`webpforge_common::ConversionOptions`]
//! - An adaptive executor that drops parameters a backend rejects and retries
//!
//! ## Features
//!
//! - `native` (default) - In-process encoding with the `webp` crate
//! - `cloud` (default) - Remote conversion over HTTP with `reqwest`
//! - `all` - Enable all features
//!
//! ## Example
//!
//! ```no_run
//! use webpforge_common::{config::Config, ConversionOptions};
//! use webpforge_convert::{convert, BackendRegistry};
//!
//! let registry = BackendRegistry::from_config(&Config::default());
//! let backend = registry.require("vips")?;
//! let report = convert(backend, "cat.jpg", "cat.webp", &ConversionOptions::default())?;
//! println!("{} bytes, pruned {:?}", report.destination_size, report.pruned);
//! # Ok::<(), webpforge_common::Error>(())
//! ```

pub mod backend;
pub mod capability;
pub mod classify;
pub mod command;
mod convert;
pub mod executor;
pub mod limits;
pub mod params;
pub mod quality;
pub mod registry;
pub mod source;
pub mod tools;
pub mod workspace;

// Re-exports
pub use backend::{Backend, ImageHandle, SaveError};
pub use capability::{CapabilityCache, CapabilityResult};
pub use command::{ToolCommand, ToolOutput};
pub use convert::{convert, ConversionReport};
pub use executor::{AdaptiveExecutor, ExecutionOutcome};
pub use params::{BackendDefaults, ParamKey, ParamValue, ParameterSet};
pub use registry::{BackendRegistry, BackendStatus};
pub use source::{DestinationDescriptor, SourceDescriptor};
pub use tools::ToolInfo;
pub use workspace::Workspace;
