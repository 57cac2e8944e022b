//! Container backend - an ephemeral Docker container.
//!
//! The workspace is bind-mounted at a fixed mount point, so the container
//! shares the local filesystem and no artifact retrieval is needed. The
//! toolchain is expected on the image's PATH. An optional platform pin
//! covers toolchain images that only exist for one architecture.

use std::fs;
use std::path::Path;

use super::{check_toolchain_exit, Backend};
use crate::error::{BuildError, Result};
use crate::process::{exists, Cmd};
use crate::request::ContainerConfig;
use crate::workspace::Workspace;

/// Fixed in-container location of the workspace bind mount.
pub const MOUNT_POINT: &str = "/workspace";

pub struct ContainerBackend {
    cfg: ContainerConfig,
}

impl ContainerBackend {
    pub fn new(cfg: ContainerConfig) -> Self {
        Self { cfg }
    }

    /// Arguments to `docker`, with workspace paths already translated to
    /// the mount point. Split out for testing.
    fn run_args(&self, ws: &Workspace, script: &Path, build_dir: &Path) -> Result<Vec<String>> {
        let mount_root = Path::new(MOUNT_POINT);
        let in_script = ws.translate(script, mount_root)?;
        let in_build_dir = ws.translate(build_dir, mount_root)?;

        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", ws.root().display(), MOUNT_POINT),
            "-w".to_string(),
            in_build_dir.display().to_string(),
        ];
        if let Some(platform) = &self.cfg.platform {
            args.push("--platform".to_string());
            args.push(platform.clone());
        }
        args.push(self.cfg.image.clone());
        args.extend(
            ["vivado", "-mode", "batch", "-nolog", "-nojournal", "-source"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(in_script.display().to_string());
        Ok(args)
    }
}

impl Backend for ContainerBackend {
    fn name(&self) -> &'static str {
        "container"
    }

    fn prepare(&self, _ws: &Workspace) -> Result<()> {
        if !exists("docker") {
            return Err(BuildError::connectivity(
                "docker not found on PATH; the container backend needs a working docker install",
            ));
        }
        Ok(())
    }

    fn invoke(&self, ws: &Workspace, script: &Path, build_dir: &Path) -> Result<()> {
        // the bind mount shares the filesystem, so the build directory is
        // created on the local side
        fs::create_dir_all(build_dir)?;

        let args = self.run_args(ws, script, build_dir)?;
        println!("Running toolchain in container {}...", self.cfg.image);
        let code = Cmd::new("docker")
            .args(&args)
            .stream()
            .map_err(|e| BuildError::connectivity(format!("failed to launch docker: {}", e)))?;
        check_toolchain_exit("containerized toolchain", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use tempfile::tempdir;

    fn backend(platform: Option<&str>) -> ContainerBackend {
        ContainerBackend::new(ContainerConfig {
            image: "bitforge/vivado:2020.1".into(),
            platform: platform.map(String::from),
        })
    }

    #[test]
    fn test_run_args_translate_paths_to_mount_point() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let script = ws.root().join("bitforge-abc123.tcl");
        let build_dir = ws.build_dir(Board::Z20);

        let args = backend(None).run_args(&ws, &script, &build_dir).unwrap();
        let joined = args.join(" ");
        assert!(joined.contains(&format!("{}:{}", ws.root().display(), MOUNT_POINT)));
        assert!(args.contains(&"/workspace/build/z20".to_string()));
        assert!(args.contains(&"/workspace/bitforge-abc123.tcl".to_string()));
        assert!(joined.contains("--rm"));
        assert!(!joined.contains("--platform"));
    }

    #[test]
    fn test_run_args_platform_pin() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let script = ws.root().join("s.tcl");
        let build_dir = ws.build_dir(Board::Z10);

        let args = backend(Some("linux/amd64"))
            .run_args(&ws, &script, &build_dir)
            .unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("--platform linux/amd64"));
        // platform pin comes before the image name
        let platform_pos = args.iter().position(|a| a == "--platform").unwrap();
        let image_pos = args.iter().position(|a| a == "bitforge/vivado:2020.1").unwrap();
        assert!(platform_pos < image_pos);
    }

    #[test]
    fn test_run_args_reject_script_outside_workspace() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let err = backend(None)
            .run_args(&ws, Path::new("/tmp/elsewhere.tcl"), &ws.build_dir(Board::Z10))
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}
