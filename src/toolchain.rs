//! Toolchain invocation.
//!
//! The toolchain is driven by a short generated Tcl script that selects the
//! board and variant, then hands off to the shared build procedure the
//! workspace carries. The script is written at the workspace root - inside
//! the synchronized subtree, so its path survives translation to container
//! and remote roots - under a unique temporary name, and removed on every
//! exit path once the invocation returns.

use std::io::Write;

use tempfile::{Builder, NamedTempFile};

use crate::backend::Backend;
use crate::error::{BuildError, Result};
use crate::request::BuildRequest;
use crate::workspace::Workspace;

/// Contents of the generated driver script.
///
/// The script resolves the workspace root from its own location, so the
/// same text works unchanged under every backend root.
fn driver_script(request: &BuildRequest) -> String {
    let mut lines = vec![
        "# generated by bitforge; removed after the build".to_string(),
        "set ws_root [file dirname [file normalize [info script]]]".to_string(),
        format!("set board {}", request.board),
        format!("set part {}", request.board.part()),
        format!("set variant {}", request.variant),
        format!("set jobs {}", request.jobs),
        format!("set gen_cores {}", if request.gen_cores { 1 } else { 0 }),
    ];
    if request.force {
        lines.push("set force_project 1".to_string());
    }
    lines.push("source [file join $ws_root scripts/build_bitstream.tcl]".to_string());
    lines.join("\n") + "\n"
}

/// Write the driver script into the workspace root. The returned guard
/// deletes the file when dropped, whichever way the invocation ends.
fn write_driver_script(ws: &Workspace, request: &BuildRequest) -> Result<NamedTempFile> {
    let mut file = Builder::new()
        .prefix("bitforge-")
        .suffix(".tcl")
        .tempfile_in(ws.root())
        .map_err(BuildError::Io)?;
    file.write_all(driver_script(request).as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Run one build request through the selected backend: stage the context,
/// launch the toolchain against the generated script, and bring outputs
/// back into the local output directory.
pub fn invoke(ws: &Workspace, request: &BuildRequest, backend: &dyn Backend) -> Result<()> {
    let script = write_driver_script(ws, request)?;
    let build_dir = ws.build_dir(request.board);

    let result = backend
        .prepare(ws)
        .and_then(|_| backend.invoke(ws, script.path(), &build_dir))
        .and_then(|_| backend.collect(ws, &build_dir));

    // `script` drops here: the temp file is removed on success, toolchain
    // failure, and every invocation-layer error alike.
    result
}
