//! The conversion driver: one source, one backend, one destination.

use std::path::{Path, PathBuf};

use serde::Serialize;
use webpforge_common::{paths, ConversionOptions, Encoding, Error, Result};

use crate::backend::{Backend, ImageHandle};
use crate::executor::{AdaptiveExecutor, ExecutionOutcome};
use crate::params::{self, ParamKey, ParameterSet};
use crate::quality::resolve_quality;
use crate::source::{DestinationDescriptor, SourceDescriptor};
use crate::workspace::Workspace;

/// What a successful conversion did.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub backend: &'static str,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub source_size: Option<u64>,
    pub destination_size: u64,
    /// The encoding that produced the kept output (never `auto`).
    pub encoding: Encoding,
    pub quality: u8,
    /// Parameters of the successful call.
    pub parameters: ParameterSet,
    /// Parameters the backend rejected and that were dropped.
    pub pruned: Vec<ParamKey>,
    /// Backend calls made across all passes.
    pub attempts: usize,
}

struct Candidate {
    encoding: Encoding,
    path: PathBuf,
    size: u64,
    outcome: ExecutionOutcome,
}

/// Convert `source` to WebP at `destination` with `backend`.
///
/// Steps, each of which can fail the conversion:
/// 1. validate both paths
/// 2. backend operationality, then convertability and size ceilings
/// 3. resolve quality and build the parameters of every pass
/// 4. create the destination directory and a workspace beside it
/// 5. run the adaptive executor per pass
/// 6. move the kept output into place
///
/// Nothing is created on disk until steps 1 to 3 have passed.
///
/// An existing destination is replaced only once a new file has been produced.
pub fn convert(
    backend: &dyn Backend,
    source: &str,
    destination: &str,
    options: &ConversionOptions,
) -> Result<ConversionReport> {
    paths::validate_source_and_destination(source, destination)?;
    let source = SourceDescriptor::new(source)?;
    let destination = DestinationDescriptor::new(destination)?;
    let options = options.clone().validated();

    backend.check_operationality()?;
    backend.check_convertability(&source)?;
    backend.check_filesize_requirements(&source)?;

    let quality = resolve_quality(&options, &source);
    let defaults = backend.defaults();
    let passes = match options.encoding {
        Encoding::Lossy => vec![Encoding::Lossy],
        Encoding::Lossless => vec![Encoding::Lossless],
        Encoding::Auto => vec![Encoding::Lossy, Encoding::Lossless],
    };

    // Build every pass up front so bad options fail before any encoding.
    let pass_params = passes
        .into_iter()
        .map(|encoding| {
            params::build(&options, &defaults, encoding == Encoding::Lossless, quality)
                .map(|p| (encoding, p))
        })
        .collect::<Result<Vec<_>>>()?;

    let workspace = Workspace::new(destination.path())?;
    let handle = backend.open(&source)?;
    let executor = AdaptiveExecutor::new(backend.name())
        .with_version(backend.version())
        .with_resolver(|name| backend.param_for_native_name(name));

    let mut best: Option<Candidate> = None;
    let mut attempts = 0;
    for (encoding, params) in pass_params {
        let candidate = run_pass(backend, &executor, &handle, &workspace, encoding, params)?;
        attempts += candidate.outcome.attempts;
        tracing::debug!(
            backend = backend.name(),
            encoding = ?candidate.encoding,
            size = candidate.size,
            "pass finished"
        );
        if best.as_ref().map_or(true, |b| candidate.size < b.size) {
            best = Some(candidate);
        }
    }
    drop(handle);

    let best = best.ok_or_else(|| Error::conversion("no encoding pass was run"))?;
    let final_path = workspace.finalize(&best.path)?;

    tracing::info!(
        backend = backend.name(),
        source = %source.path().display(),
        destination = %final_path.display(),
        size = best.size,
        "converted"
    );

    Ok(ConversionReport {
        backend: backend.name(),
        source: source.path().to_path_buf(),
        destination: final_path,
        source_size: source.size(),
        destination_size: best.size,
        encoding: best.encoding,
        quality,
        parameters: best.outcome.params,
        pruned: best.outcome.pruned,
        attempts,
    })
}

fn run_pass(
    backend: &dyn Backend,
    executor: &AdaptiveExecutor<'_>,
    handle: &ImageHandle,
    workspace: &Workspace,
    encoding: Encoding,
    params: ParameterSet,
) -> Result<Candidate> {
    let path = workspace.temp_file(match encoding {
        Encoding::Lossless => "lossless.webp",
        _ => "lossy.webp",
    });

    let outcome = executor.run(params, |p| backend.save(handle, &path, p))?;
    let size = output_size(&path)?;

    Ok(Candidate {
        encoding,
        path,
        size,
        outcome,
    })
}

fn output_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path).map(|m| m.len()).map_err(|e| {
        Error::conversion(format!(
            "backend reported success but {} is unreadable: {e}",
            path.display()
        ))
    })
}
