//! Local backend - a toolchain install on this machine.
//!
//! The simplest context: no path translation (the backend root is the
//! workspace root), no staging, no artifact retrieval. The toolchain is
//! launched directly with its working directory set to the board's build
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::{check_toolchain_exit, Backend};
use crate::error::{BuildError, Result};
use crate::process::Cmd;
use crate::workspace::Workspace;

pub struct LocalBackend {
    toolchain: PathBuf,
}

impl LocalBackend {
    pub fn new(toolchain: PathBuf) -> Self {
        Self { toolchain }
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn invoke(&self, _ws: &Workspace, script: &Path, build_dir: &Path) -> Result<()> {
        fs::create_dir_all(build_dir)?;

        println!("Running {} (local)...", self.toolchain.display());
        let code = Cmd::new(&self.toolchain)
            .args(["-mode", "batch", "-nolog", "-nojournal", "-source"])
            .arg_path(script)
            .cwd(build_dir)
            .stream()
            .map_err(|e| {
                BuildError::toolchain(format!(
                    "failed to launch {}: {}",
                    self.toolchain.display(),
                    e
                ))
            })?;
        check_toolchain_exit("toolchain", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use tempfile::tempdir;

    #[test]
    fn test_invoke_creates_build_dir_and_maps_exit() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let build_dir = ws.build_dir(Board::Z10);

        // /bin/true ignores the script arguments and exits 0
        let backend = LocalBackend::new(PathBuf::from("/bin/true"));
        backend
            .invoke(&ws, Path::new("/nonexistent.tcl"), &build_dir)
            .unwrap();
        assert!(build_dir.is_dir());

        let backend = LocalBackend::new(PathBuf::from("/bin/false"));
        let err = backend
            .invoke(&ws, Path::new("/nonexistent.tcl"), &build_dir)
            .unwrap_err();
        assert!(matches!(err, BuildError::Toolchain(_)));
    }
}
