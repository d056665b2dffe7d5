//! The set of backends a process can convert with.
//!
//! A [`BackendRegistry`] is built once from configuration and owns one
//! instance of every compiled-in backend, so each backend's capability probe
//! runs at most once per process.

use serde::Serialize;
use webpforge_common::config::Config;
use webpforge_common::{Error, InvalidInputKind, Result};

#[cfg(feature = "cloud")]
use crate::backend::CloudBackend;
#[cfg(feature = "native")]
use crate::backend::NativeBackend;
use crate::backend::{Backend, CwebpBackend, VipsBackend};
use crate::capability::CapabilityResult;

/// Operational status of one backend, as reported by
/// [`BackendRegistry::check_all`].
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: &'static str,
    #[serde(flatten)]
    pub capability: CapabilityResult,
    pub version: Option<String>,
}

/// All backends, in preference order.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Build every compiled-in backend from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut backends: Vec<Box<dyn Backend>> = Vec::new();

        #[cfg(feature = "native")]
        backends.push(Box::new(NativeBackend::new()));
        backends.push(Box::new(VipsBackend::new(&config.tools)));
        backends.push(Box::new(CwebpBackend::new(&config.tools)));
        #[cfg(feature = "cloud")]
        backends.push(Box::new(CloudBackend::new(&config.cloud, &config.limits)));

        Self { backends }
    }

    /// A registry holding exactly `backends`.
    pub fn with_backends(backends: Vec<Box<dyn Backend>>) -> Self {
        Self { backends }
    }

    /// Names of all registered backends.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// Look up a backend by name, failing with `InvalidInput` if unknown.
    pub fn require(&self, name: &str) -> Result<&dyn Backend> {
        self.get(name).ok_or_else(|| {
            Error::invalid_input(
                InvalidInputKind::Option,
                "backend",
                format!(
                    "unknown backend {name:?} (available: {})",
                    self.names().join(", ")
                ),
            )
        })
    }

    /// Probe every backend.
    pub fn check_all(&self) -> Vec<BackendStatus> {
        self.backends
            .iter()
            .map(|b| BackendStatus {
                name: b.name(),
                capability: b.capability().clone(),
                version: b.version(),
            })
            .collect()
    }
}
