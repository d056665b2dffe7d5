//! Backend operationality results and their write-once cache.

use std::sync::OnceLock;

use serde::Serialize;
use webpforge_common::{Error, Result};

/// Outcome of a backend's precondition check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CapabilityResult {
    Operational,
    NotOperational(String),
}

impl CapabilityResult {
    /// Build a result from a list of `(requirement met, reason if not)` pairs,
    /// stopping at the first unmet requirement.
    ///
    /// ```
    /// use webpforge_convert::CapabilityResult;
    ///
    /// let result = CapabilityResult::from_requirements([
    ///     (true, "binary not found"),
    ///     (false, "binary does not run"),
    /// ]);
    /// assert_eq!(result, CapabilityResult::NotOperational("binary does not run".into()));
    /// ```
    pub fn from_requirements<'a>(checks: impl IntoIterator<Item = (bool, &'a str)>) -> Self {
        checks
            .into_iter()
            .find(|(met, _)| !met)
            .map(|(_, reason)| Self::NotOperational(reason.to_string()))
            .unwrap_or(Self::Operational)
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Operational)
    }

    /// Convert into the error callers branch on.
    ///
    /// Only ever produces [`Error::SystemRequirementsNotMet`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Operational => Ok(()),
            Self::NotOperational(reason) => Err(Error::SystemRequirementsNotMet(reason)),
        }
    }
}

/// Holds a backend's [`CapabilityResult`] once it has been computed.
///
/// The probe runs outside any lock. Concurrent first callers may each run it,
/// but only the first finished value is published and every reader sees that
/// one complete value afterwards.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    cell: OnceLock<CapabilityResult>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result, running `probe` if none is published yet.
    pub fn get_or_probe(&self, probe: impl FnOnce() -> CapabilityResult) -> &CapabilityResult {
        if let Some(result) = self.cell.get() {
            return result;
        }
        let computed = probe();
        // Losing the race is fine: the winner's value is equally valid.
        let _ = self.cell.set(computed);
        self.cell.get().unwrap_or_else(|| unreachable!("cell was just set"))
    }

    /// The published result, if any.
    pub fn get(&self) -> Option<&CapabilityResult> {
        self.cell.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn probe_runs_once() {
        let cache = CapabilityCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache.get_or_probe(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                CapabilityResult::Operational
            });
            assert!(result.is_operational());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_result_is_never_replaced() {
        let cache = CapabilityCache::new();
        cache.get_or_probe(|| CapabilityResult::NotOperational("missing".into()));
        let second = cache.get_or_probe(|| CapabilityResult::Operational);
        assert_eq!(second, &CapabilityResult::NotOperational("missing".into()));
    }

    #[test]
    fn concurrent_readers_see_one_value() {
        let cache = Arc::new(CapabilityCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get_or_probe(|| CapabilityResult::NotOperational(format!("probe {i}")))
                        .clone()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.get(), Some(&results[0]));
    }

    #[test]
    fn into_result_maps_to_requirements_error() {
        let err = CapabilityResult::NotOperational("no vips".into())
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::SystemRequirementsNotMet(ref r) if r == "no vips"));
        assert!(CapabilityResult::Operational.into_result().is_ok());
    }

    #[test]
    fn from_requirements_all_met() {
        let result = CapabilityResult::from_requirements([(true, "a"), (true, "b")]);
        assert_eq!(result, CapabilityResult::Operational);
    }
}
