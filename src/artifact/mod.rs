//! Artifact resolution and canonicalization.
//!
//! The toolchain does not promise a stable output filename: depending on
//! the project's top-level wrapper it drops one of a small set of known
//! names into the output directory. Resolution scans that fixed candidate
//! list in priority order and takes the first name that exists - never the
//! most recently modified file, so a stale output from another run cannot
//! win a race.
//!
//! The resolved file is then copied (not moved) to a variant-qualified
//! canonical name in the same directory. A later build of a different
//! variant in the same output directory can no longer be confused with
//! stale output from a prior variant, and the toolchain's own output stays
//! untouched.

pub mod package;

use std::fs;
use std::path::{Path, PathBuf};

use crate::board::{Board, Variant, BITSTREAM_CANDIDATES, RAW_EXT};
use crate::error::{BuildError, Result};

/// Format of a build artifact on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Raw toolchain output (`<variant>.bit`)
    RawBitstream,
    /// Device-loadable container (`<variant>.bit.bin`)
    PackagedBinary,
}

/// A resolved build output. Created after a successful invocation and
/// never mutated; packaging produces a new artifact alongside it.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub board: Board,
    pub variant: Variant,
    pub format: ArtifactFormat,
}

/// Canonical variant-qualified filename for the raw bitstream.
pub fn canonical_name(variant: Variant) -> String {
    format!("{}.{}", variant, RAW_EXT)
}

/// Candidate filenames for a variant, in priority order. The canonical
/// name comes first: a directory already holding it resolves to it
/// unchanged.
fn candidates(variant: Variant) -> Vec<String> {
    let mut names = vec![canonical_name(variant)];
    names.extend(BITSTREAM_CANDIDATES.iter().map(|s| s.to_string()));
    names
}

/// Locate the toolchain's output in `output_dir`: the first candidate that
/// exists, in priority order.
pub fn resolve(output_dir: &Path, variant: Variant) -> Result<PathBuf> {
    for name in candidates(variant) {
        let path = output_dir.join(&name);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(BuildError::artifact(format!(
        "no bitstream found in {} (looked for {})",
        output_dir.display(),
        candidates(variant).join(", ")
    )))
}

/// Copy the resolved file to its canonical variant-qualified name in the
/// same directory. Idempotent: an unchanged source produces byte-identical
/// canonical output, and the original is never deleted.
pub fn canonicalize(resolved: &Path, variant: Variant) -> Result<PathBuf> {
    let dir = resolved
        .parent()
        .ok_or_else(|| BuildError::artifact(format!("{} has no parent", resolved.display())))?;
    let canonical = dir.join(canonical_name(variant));
    if canonical == *resolved {
        return Ok(canonical);
    }
    fs::copy(resolved, &canonical)?;
    Ok(canonical)
}

/// Resolve and canonicalize in one step.
pub fn resolve_canonical(output_dir: &Path, board: Board, variant: Variant) -> Result<BuildArtifact> {
    let resolved = resolve(output_dir, variant)?;
    let canonical = canonicalize(&resolved, variant)?;
    if canonical != resolved {
        println!(
            "Resolved {} -> {}",
            resolved.file_name().unwrap_or_default().to_string_lossy(),
            canonical.file_name().unwrap_or_default().to_string_lossy()
        );
    }
    Ok(BuildArtifact {
        path: canonical,
        board,
        variant,
        format: ArtifactFormat::RawBitstream,
    })
}

/// Best-effort sanity check of a finished artifact. Failures are reported
/// as warnings by the caller, never as an abort.
pub fn verify(artifact: &BuildArtifact) -> Result<()> {
    let meta = fs::metadata(&artifact.path).map_err(|e| {
        BuildError::verification(format!("{} not readable: {}", artifact.path.display(), e))
    })?;
    if meta.len() == 0 {
        return Err(BuildError::verification(format!(
            "{} is empty",
            artifact.path.display()
        )));
    }
    Ok(())
}
