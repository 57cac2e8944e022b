//! Remote backend - a toolchain on another host, reached over SSH.
//!
//! Lifecycle per request:
//!
//! 1. connectivity probe (`ssh ... true`) - fails fast with a
//!    ConnectivityError before anything is mirrored
//! 2. sync-in: one-way incremental mirror of the workspace into the remote
//!    root, rsync preferred, full recursive scp copy as fallback
//! 3. invocation over an SSH login shell, so the remote profile's
//!    toolchain environment setup is loaded
//! 4. sync-out: targeted pull of bitstream artifacts only, never the whole
//!    remote tree
//!
//! The exclude list keeps prior build outputs and tool caches out of the
//! mirror; the mirror must honor it exactly.

use std::fs;
use std::path::{Component, Path};

use super::Backend;
use crate::board::{is_transient_tool_file, SYNC_EXCLUDE_DIRS};
use crate::error::{BuildError, Result};
use crate::process::{exists, Cmd};
use crate::request::RemoteConfig;
use crate::workspace::{shell_quote, Workspace};

/// SSH exit status for transport-level failures, as opposed to the exit
/// status of the remote command.
const SSH_TRANSPORT_FAILURE: i32 = 255;

pub struct RemoteBackend {
    cfg: RemoteConfig,
}

impl RemoteBackend {
    pub fn new(cfg: RemoteConfig) -> Self {
        Self { cfg }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.cfg.user, self.cfg.host)
    }

    fn ssh_base(&self) -> Cmd {
        Cmd::new("ssh")
            .args(["-o", "BatchMode=yes", "-o", "ConnectTimeout=10"])
            .arg("-p")
            .arg(self.cfg.port.to_string())
            .arg(self.destination())
    }

    /// Cheap reachability probe. Runs before any workspace mutation.
    fn probe(&self) -> Result<()> {
        println!("Probing {}...", self.destination());
        let result = self.ssh_base().arg("true").run().map_err(|e| {
            BuildError::connectivity(format!("failed to launch ssh: {}", e))
        })?;
        if !result.success() {
            return Err(BuildError::connectivity(format!(
                "{} is unreachable: {}",
                self.destination(),
                result.stderr_tail()
            )));
        }
        Ok(())
    }

    /// Mirror the workspace into the remote root.
    fn sync_in(&self, ws: &Workspace) -> Result<()> {
        let remote_dir = shell_quote(&self.cfg.root_dir);

        // the mirror directory must exist before either transfer tool runs
        let result = self
            .ssh_base()
            .arg(format!("mkdir -p {}", remote_dir))
            .run()
            .map_err(|e| BuildError::connectivity(format!("failed to launch ssh: {}", e)))?;
        if !result.success() {
            return Err(BuildError::connectivity(format!(
                "could not create {} on {}: {}",
                self.cfg.root_dir.display(),
                self.destination(),
                result.stderr_tail()
            )));
        }

        if exists("rsync") {
            println!("Syncing workspace to {} (rsync)...", self.destination());
            let result = Cmd::new("rsync")
                .args(rsync_in_args(ws, &self.cfg))
                .run()
                .map_err(|e| BuildError::connectivity(format!("failed to launch rsync: {}", e)))?;
            if !result.success() {
                return Err(BuildError::connectivity(format!(
                    "rsync to {} failed: {}",
                    self.destination(),
                    result.stderr_tail()
                )));
            }
            return Ok(());
        }

        if exists("scp") {
            println!("Syncing workspace to {} (scp, full copy)...", self.destination());
            return self.scp_full_copy(ws);
        }

        Err(BuildError::connectivity(
            "neither rsync nor scp is available for the workspace mirror",
        ))
    }

    /// Fallback full recursive copy. Excluded subtrees are filtered at the
    /// top level, which is where all of them live in practice.
    fn scp_full_copy(&self, ws: &Workspace) -> Result<()> {
        let port = self.cfg.port.to_string();
        for entry in fs::read_dir(ws.root())? {
            let entry = entry?;
            let rel = entry.file_name();
            if is_excluded(Path::new(&rel)) {
                continue;
            }
            let result = Cmd::new("scp")
                .args(["-rpq", "-P"])
                .arg(&port)
                .arg_path(&entry.path())
                .arg(format!(
                    "{}:{}/",
                    self.destination(),
                    self.cfg.root_dir.display()
                ))
                .run()
                .map_err(|e| BuildError::connectivity(format!("failed to launch scp: {}", e)))?;
            if !result.success() {
                return Err(BuildError::connectivity(format!(
                    "scp of {} failed: {}",
                    entry.path().display(),
                    result.stderr_tail()
                )));
            }
        }
        Ok(())
    }
}

impl Backend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn prepare(&self, ws: &Workspace) -> Result<()> {
        self.probe()?;
        self.sync_in(ws)
    }

    fn invoke(&self, ws: &Workspace, script: &Path, build_dir: &Path) -> Result<()> {
        let command = remote_invoke_command(ws, &self.cfg, script, build_dir)?;

        println!("Running {} on {}...", self.cfg.toolchain, self.destination());
        let code = self
            .ssh_base()
            .arg(command)
            .stream()
            .map_err(|e| BuildError::connectivity(format!("failed to launch ssh: {}", e)))?;
        match code {
            Some(0) => Ok(()),
            Some(SSH_TRANSPORT_FAILURE) => Err(BuildError::connectivity(format!(
                "ssh connection to {} failed during invocation",
                self.destination()
            ))),
            Some(n) => Err(BuildError::toolchain(format!(
                "remote toolchain exited with status {}",
                n
            ))),
            None => Err(BuildError::toolchain("remote toolchain was killed by a signal")),
        }
    }

    /// Pull back bitstream artifacts only; the rest of the remote tree
    /// stays where it is.
    fn collect(&self, ws: &Workspace, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir)?;
        let remote_output = ws.translate(output_dir, &self.cfg.root_dir)?;

        if exists("rsync") {
            println!("Fetching artifacts from {}...", self.destination());
            let result = Cmd::new("rsync")
                .args(["-az", "-e"])
                .arg(format!("ssh -p {}", self.cfg.port))
                .args(["--include=*.bit", "--include=*.bit.bin", "--exclude=*"])
                .arg(format!(
                    "{}:{}/",
                    self.destination(),
                    remote_output.display()
                ))
                .arg(format!("{}/", output_dir.display()))
                .run()
                .map_err(|e| BuildError::connectivity(format!("failed to launch rsync: {}", e)))?;
            if !result.success() {
                return Err(BuildError::connectivity(format!(
                    "artifact fetch from {} failed: {}",
                    self.destination(),
                    result.stderr_tail()
                )));
            }
            return Ok(());
        }

        if exists("scp") {
            println!("Fetching artifacts from {} (scp)...", self.destination());
            let port = self.cfg.port.to_string();
            // glob expands on the remote side; a pattern with no matches is
            // tolerated and left for the resolver to report
            for pattern in ["*.bit", "*.bit.bin"] {
                let _ = Cmd::new("scp")
                    .args(["-pq", "-P"])
                    .arg(&port)
                    .arg(format!(
                        "{}:{}/{}",
                        self.destination(),
                        remote_output.display(),
                        pattern
                    ))
                    .arg(format!("{}/", output_dir.display()))
                    .run();
            }
            return Ok(());
        }

        Err(BuildError::connectivity(
            "neither rsync nor scp is available to fetch artifacts",
        ))
    }
}

/// Whether a workspace-relative path is kept out of the mirror. Matches
/// excluded directory names at any depth, plus the toolchain's transient
/// journal/log files.
pub fn is_excluded(rel: &Path) -> bool {
    for component in rel.components() {
        if let Component::Normal(name) = component {
            let name = name.to_string_lossy();
            if SYNC_EXCLUDE_DIRS.iter().any(|d| *d == name) {
                return true;
            }
            if is_transient_tool_file(&name) {
                return true;
            }
        }
    }
    false
}

/// rsync arguments for the workspace mirror. Split out for testing.
fn rsync_in_args(ws: &Workspace, cfg: &RemoteConfig) -> Vec<String> {
    let mut args = vec![
        "-az".to_string(),
        "--delete".to_string(),
        "-e".to_string(),
        format!("ssh -p {}", cfg.port),
    ];
    for dir in SYNC_EXCLUDE_DIRS {
        args.push(format!("--exclude={}", dir));
    }
    args.push("--exclude=vivado*.jou".to_string());
    args.push("--exclude=vivado*.log".to_string());
    args.push(format!("{}/", ws.root().display()));
    args.push(format!("{}@{}:{}/", cfg.user, cfg.host, cfg.root_dir.display()));
    args
}

/// The command executed on the remote host: change into the translated
/// build directory (creating it first) and run the toolchain under a login
/// shell so the remote environment setup is loaded. Paths are quoted for
/// the remote shell.
fn remote_invoke_command(
    ws: &Workspace,
    cfg: &RemoteConfig,
    script: &Path,
    build_dir: &Path,
) -> Result<String> {
    let remote_script = ws.translate(script, &cfg.root_dir)?;
    let remote_build_dir = ws.translate(build_dir, &cfg.root_dir)?;

    let inner = format!(
        "mkdir -p {dir} && cd {dir} && {tool} -mode batch -nolog -nojournal -source {script}",
        dir = shell_quote(&remote_build_dir),
        tool = cfg.toolchain,
        script = shell_quote(&remote_script),
    );
    Ok(format!("bash -lc {}", shell_quote(Path::new(&inner))))
}
