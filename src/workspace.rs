//! Workspace paths and backend path translation.
//!
//! The workspace is the local gateware source tree. Every path in the
//! pipeline is expressed relative to its root, which is what makes the
//! backend abstraction work: a container sees the same tree under its mount
//! point, a remote host under its mirror directory. Translation recomputes
//! a workspace path against another root and must preserve the suffix
//! exactly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::board::Board;
use crate::error::{BuildError, Result};

/// The local gateware source tree.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace at `root`. The directory must exist; the stored
    /// root is absolute so it can be handed to a container bind mount
    /// as-is.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = fs::canonicalize(&root).map_err(|e| {
            BuildError::config(format!("workspace root {} not usable: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Board configuration script.
    pub fn board_config(&self, board: Board) -> PathBuf {
        self.root.join("boards").join(board.as_str()).join("board.tcl")
    }

    /// Shared build-procedure scripts on the toolchain's Tcl surface.
    pub fn project_script(&self) -> PathBuf {
        self.root.join("scripts/project.tcl")
    }

    pub fn build_script(&self) -> PathBuf {
        self.root.join("scripts/build_bitstream.tcl")
    }

    /// Custom core-generation script and its source directory. Only
    /// required when core generation was requested.
    pub fn cores_script(&self) -> PathBuf {
        self.root.join("scripts/gen_cores.tcl")
    }

    pub fn cores_dir(&self) -> PathBuf {
        self.root.join("cores")
    }

    /// Per-board output directory. The toolchain works and drops its
    /// bitstream here.
    pub fn build_dir(&self, board: Board) -> PathBuf {
        self.root.join("build").join(board.as_str())
    }

    /// Recompute a workspace path against another backend root, keeping
    /// the suffix relative to the workspace root intact.
    pub fn translate(&self, path: &Path, backend_root: &Path) -> Result<PathBuf> {
        let suffix = path.strip_prefix(&self.root).map_err(|_| {
            BuildError::config(format!(
                "path {} is not under the workspace root {}",
                path.display(),
                self.root.display()
            ))
        })?;
        Ok(backend_root.join(suffix))
    }

    /// Remove prior build output. With a board, only that board's output
    /// directory; without, the whole build tree.
    pub fn clean(&self, board: Option<Board>) -> Result<()> {
        let target = match board {
            Some(board) => self.build_dir(board),
            None => self.root.join("build"),
        };
        if target.exists() {
            println!("Removing {}...", target.display());
            fs::remove_dir_all(&target)?;
        } else {
            println!("[SKIP] Nothing to clean at {}", target.display());
        }
        Ok(())
    }
}

/// Quote a path for interpolation into a remotely executed command line.
/// Single quotes survive every whitespace and glob character the remote
/// shell would otherwise interpret.
pub fn shell_quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_translate_preserves_suffix() {
        let (_dir, ws) = workspace();
        let roots = [
            PathBuf::from("/workspace"),
            PathBuf::from("bitforge-work"),
            PathBuf::from("/srv/builds/gw"),
        ];
        let paths = [
            ws.root().join("build/z20"),
            ws.root().join("scripts/project.tcl"),
            ws.board_config(Board::Z10),
        ];
        for root in &roots {
            for path in &paths {
                let translated = ws.translate(path, root).unwrap();
                assert!(translated.starts_with(root));
                let suffix = path.strip_prefix(ws.root()).unwrap();
                assert!(translated.ends_with(suffix));
            }
        }
    }

    #[test]
    fn test_translate_rejects_paths_outside_root() {
        let (_dir, ws) = workspace();
        let err = ws
            .translate(Path::new("/etc/passwd"), Path::new("/workspace"))
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn test_build_dir_is_per_board() {
        let (_dir, ws) = workspace();
        assert!(ws.build_dir(Board::Z20).ends_with("build/z20"));
        assert_ne!(ws.build_dir(Board::Z10), ws.build_dir(Board::Zu5));
    }

    #[test]
    fn test_shell_quote_spaces() {
        let quoted = shell_quote(Path::new("/srv/build dir/top.bit"));
        assert_eq!(quoted, "'/srv/build dir/top.bit'");
    }

    #[test]
    fn test_shell_quote_embedded_quote() {
        let quoted = shell_quote(Path::new("it's.tcl"));
        assert_eq!(quoted, r"'it'\''s.tcl'");
    }

    #[test]
    fn test_clean_removes_board_output() {
        let (_dir, ws) = workspace();
        let build = ws.build_dir(Board::Z20);
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("standard.bit"), b"x").unwrap();

        ws.clean(Some(Board::Z20)).unwrap();
        assert!(!build.exists());

        // cleaning again is not an error
        ws.clean(Some(Board::Z20)).unwrap();
    }
}
