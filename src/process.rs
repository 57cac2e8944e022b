//! External command execution.
//!
//! Thin builder over `std::process::Command` used everywhere an external
//! tool is launched. Short probes (`ssh ... true`, `df`) capture their
//! output with [`Cmd::run`]; the multi-minute toolchain call streams to the
//! console with [`Cmd::stream`] so the operator sees progress.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CmdResult {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last few lines of stderr, for error messages.
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().rev().take(5).collect();
        lines.into_iter().rev().collect::<Vec<_>>().join("\n")
    }
}

/// Command builder.
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// The command line as displayed in error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion, capturing stdout and stderr.
    pub fn run(self) -> io::Result<CmdResult> {
        let output = self.command().output()?;
        Ok(CmdResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run to completion with stdio inherited from this process.
    /// Returns the exit code; `None` when killed by a signal.
    pub fn stream(self) -> io::Result<Option<i32>> {
        let status = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.code())
    }
}

/// Find a program on PATH. Returns the full path to the first executable
/// match.
pub fn which(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Check whether a program is available on PATH.
pub fn exists(program: &str) -> bool {
    which(program).is_some()
}

/// A file that exists and carries an execute bit.
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_existing() {
        // ls exists on any Unix system
        assert!(which("ls").is_some());
        assert!(exists("ls"));
    }

    #[test]
    fn test_which_nonexistent() {
        assert!(which("definitely_not_a_real_command_12345").is_none());
    }

    #[test]
    fn test_run_captures_output() {
        let result = Cmd::new("echo").arg("hello").run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn test_run_nonzero_exit() {
        let result = Cmd::new("false").run().unwrap();
        assert!(!result.success());
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn test_display_joins_args() {
        let cmd = Cmd::new("rsync").args(["-az", "--delete"]).arg("src/");
        assert_eq!(cmd.display(), "rsync -az --delete src/");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let result = CmdResult {
            code: Some(1),
            stdout: String::new(),
            stderr: (1..=8).map(|i| format!("line{}\n", i)).collect(),
        };
        let tail = result.stderr_tail();
        assert!(tail.contains("line8"));
        assert!(!tail.contains("line1"));
    }
}
