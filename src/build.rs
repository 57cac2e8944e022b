//! Full build pipeline.
//!
//! Strictly sequential: preflight, toolchain invocation through the
//! selected backend, artifact resolution, packaging. The toolchain call is
//! one opaque blocking step; its internal parallelism is its own business.

use crate::artifact::{self, package, ArtifactFormat, BuildArtifact};
use crate::backend;
use crate::error::Result;
use crate::preflight;
use crate::request::BuildRequest;
use crate::toolchain;
use crate::workspace::Workspace;
use crate::Timer;

/// Run one build request end to end. Returns the final deployable
/// artifact: the packaged form where produced, the raw bitstream
/// otherwise.
pub fn run(ws: &Workspace, request: &BuildRequest) -> Result<BuildArtifact> {
    let chosen = backend::select(request);
    println!(
        "=== Building {} {} gateware ({} backend) ===\n",
        request.board, request.variant, chosen.name()
    );

    // 1. All checks before any work: a mistyped path must not cost a
    //    multi-minute round-trip.
    preflight::run(ws, request)?;
    println!();

    // 2. Invoke the toolchain through the backend.
    let t = Timer::start("Toolchain");
    toolchain::invoke(ws, request, chosen.as_ref())?;
    t.finish();

    // 3. Locate the output and establish its canonical name.
    let output_dir = ws.build_dir(request.board);
    let raw = artifact::resolve_canonical(&output_dir, request.board, request.variant)?;

    // 4. Package for the target OS generation.
    let finished = package::convert(request, &raw)?;

    // Best-effort state checks; a failure is worth a warning, not an abort.
    if let Err(e) = artifact::verify(&raw) {
        println!("[WARN] {}", e);
    }
    if finished.format == ArtifactFormat::PackagedBinary {
        if let Err(e) = artifact::verify(&finished) {
            println!("[WARN] {}", e);
        }
    }

    println!("\n=== Build complete ===");
    println!("  Raw:      {}", raw.path.display());
    if finished.format == ArtifactFormat::PackagedBinary {
        println!("  Packaged: {}", finished.path.display());
    }

    Ok(finished)
}
