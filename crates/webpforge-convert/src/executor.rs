//! The adaptive retry loop.
//!
//! A call is attempted with the full parameter set. If the backend rejects a
//! parameter it does not know, that parameter is dropped and the call is
//! attempted again; any other failure is terminal.
//!
//! ```text
//! Ready -> Attempting -> Success
//!              |  ^
//!              v  |
//!            Retrying         (unsupported parameter that is present)
//!              |
//!              v
//!        TerminalFailure      (anything else)
//! ```

use serde::Serialize;
use webpforge_common::{Error, Result};

use crate::backend::SaveError;
use crate::classify::{classify_backend_error, normalize_name, ErrorClass};
use crate::params::{ParamKey, ParameterSet};

/// Result of a successful adaptive call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    /// The parameters the successful attempt used.
    pub params: ParameterSet,
    /// Parameters removed along the way, in removal order.
    pub pruned: Vec<ParamKey>,
    /// Number of calls made, including the successful one.
    pub attempts: usize,
}

type Resolver<'a> = Box<dyn Fn(&str) -> Option<ParamKey> + 'a>;

/// Runs one backend call with parameter pruning.
pub struct AdaptiveExecutor<'a> {
    backend: &'a str,
    version: Option<String>,
    resolve: Resolver<'a>,
}

impl<'a> AdaptiveExecutor<'a> {
    /// Executor for `backend`, resolving reported names against the canonical
    /// parameter spelling.
    pub fn new(backend: &'a str) -> Self {
        Self {
            backend,
            version: None,
            resolve: Box::new(|name| {
                let wanted = normalize_name(name);
                ParamKey::ALL
                    .into_iter()
                    .find(|k| normalize_name(k.name()) == wanted)
            }),
        }
    }

    /// Backend version, mentioned when a parameter is dropped.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Map the backend's spelling of a parameter back to a [`ParamKey`].
    pub fn with_resolver(mut self, resolve: impl Fn(&str) -> Option<ParamKey> + 'a) -> Self {
        self.resolve = Box::new(resolve);
        self
    }

    /// Call `attempt` until it succeeds, pruning unsupported parameters.
    ///
    /// Every retry removes one parameter, so the loop ends after at most
    /// `params.len()` retries; the explicit ceiling guards against a backend
    /// that misreports.
    pub fn run<F>(&self, mut params: ParameterSet, mut attempt: F) -> Result<ExecutionOutcome>
    where
        F: FnMut(&ParameterSet) -> std::result::Result<(), SaveError>,
    {
        let max_attempts = params.len() + 1;
        let mut pruned = Vec::new();
        let mut attempts = 0;

        loop {
            attempts += 1;
            tracing::debug!(
                backend = self.backend,
                attempt = attempts,
                params = ?params,
                "attempting conversion"
            );

            let err = match attempt(&params) {
                Ok(()) => {
                    return Ok(ExecutionOutcome {
                        params,
                        pruned,
                        attempts,
                    })
                }
                Err(err) => err,
            };

            let Some(key) = self.unsupported_key(&err) else {
                return Err(Error::conversion(err.to_string()));
            };

            if params.remove(key).is_none() {
                // The backend keeps rejecting something we no longer send.
                return Err(Error::conversion(err.to_string()));
            }

            tracing::warn!(
                backend = self.backend,
                version = self.version.as_deref().unwrap_or("unknown"),
                parameter = %key,
                "backend does not support parameter; retrying without it"
            );
            pruned.push(key);

            if attempts >= max_attempts {
                return Err(Error::conversion(format!(
                    "{}: gave up after {attempts} attempts: {err}",
                    self.backend
                )));
            }
        }
    }

    fn unsupported_key(&self, err: &SaveError) -> Option<ParamKey> {
        match err {
            SaveError::Unsupported(key) => Some(*key),
            SaveError::Message(text) => match classify_backend_error(text) {
                ErrorClass::UnsupportedParameter(name) => (self.resolve)(&name),
                ErrorClass::Other => None,
            },
        }
    }
}
