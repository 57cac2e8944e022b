//! Preflight checks for build prerequisites.
//!
//! A bitstream build takes many minutes; the checks here run before any
//! expensive work is committed. Every missing path is collected into one
//! report so an operator who mistyped several paths fixes them in a single
//! round-trip instead of one per build attempt.
//!
//! # Checks performed
//!
//! - Board configuration script for the selected board
//! - Shared project and build-procedure scripts
//! - Core-generation script and source directory, when requested

use std::path::PathBuf;

use crate::error::{BuildError, Result};
use crate::request::BuildRequest;
use crate::workspace::Workspace;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Comprehensive preflight report.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
    /// Paths whose absence caused a failing check, with their purpose.
    missing: Vec<(PathBuf, &'static str)>,
}

impl PreflightReport {
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn errors(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Print a summary of the preflight checks.
    pub fn print_summary(&self) {
        for check in &self.checks {
            let status = if check.passed { "[OK]" } else { "[FAIL]" };
            println!("{} {}: {}", status, check.name, check.message);
            if let Some(suggestion) = &check.suggestion {
                println!("     Suggestion: {}", suggestion);
            }
        }
        if self.is_ok() {
            println!(
                "All preflight checks passed ({}/{})",
                self.passed_count(),
                self.total_count()
            );
        } else {
            println!(
                "Preflight checks failed: {} of {} passed",
                self.passed_count(),
                self.total_count()
            );
        }
    }

    /// Turn the report into an error listing every missing path, or `Ok`
    /// when everything is present.
    pub fn into_result(self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(BuildError::preflight(&self.missing))
        }
    }
}

/// Required paths for a request: `(path, purpose, fix suggestion)`.
fn required_paths(
    ws: &Workspace,
    request: &BuildRequest,
) -> Vec<(PathBuf, &'static str, &'static str)> {
    let mut paths = vec![
        (
            ws.board_config(request.board),
            "board configuration",
            "add a board.tcl under boards/<board>/",
        ),
        (
            ws.project_script(),
            "shared project script",
            "the workspace must carry scripts/project.tcl",
        ),
        (
            ws.build_script(),
            "shared build procedure",
            "the workspace must carry scripts/build_bitstream.tcl",
        ),
    ];
    if request.gen_cores {
        paths.push((
            ws.cores_script(),
            "core-generation script",
            "scripts/gen_cores.tcl is required with --cores",
        ));
        paths.push((
            ws.cores_dir(),
            "core sources",
            "the cores/ directory is required with --cores",
        ));
    }
    paths
}

/// Run all preflight checks for a request.
pub fn check(ws: &Workspace, request: &BuildRequest) -> PreflightReport {
    let mut report = PreflightReport::default();

    for (path, purpose, suggestion) in required_paths(ws, request) {
        if path.exists() {
            report
                .checks
                .push(CheckResult::pass(purpose, format!("found {}", path.display())));
        } else {
            report.checks.push(CheckResult::fail(
                purpose,
                format!("missing {}", path.display()),
                suggestion,
            ));
            report.missing.push((path, purpose));
        }
    }

    report
}

/// Convenience wrapper: check, print the summary, and fail with the full
/// batch of missing paths if any check failed.
pub fn run(ws: &Workspace, request: &BuildRequest) -> Result<()> {
    let report = check(ws, request);
    report.print_summary();
    report.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Variant};
    use crate::request::{BackendChoice, ContainerConfig};
    use std::fs;
    use tempfile::tempdir;

    fn request(board: Board, gen_cores: bool) -> BuildRequest {
        BuildRequest {
            board,
            variant: Variant::Standard,
            jobs: 4,
            force: false,
            gen_cores,
            os_gen: board.default_os_generation(),
            backend: BackendChoice::Container(ContainerConfig {
                image: "img".into(),
                platform: None,
            }),
        }
    }

    fn populate(ws: &Workspace, board: Board) {
        fs::create_dir_all(ws.board_config(board).parent().unwrap()).unwrap();
        fs::write(ws.board_config(board), "# board").unwrap();
        fs::create_dir_all(ws.project_script().parent().unwrap()).unwrap();
        fs::write(ws.project_script(), "# project").unwrap();
        fs::write(ws.build_script(), "# build").unwrap();
    }

    #[test]
    fn test_all_present_passes() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        populate(&ws, Board::Z20);

        let report = check(&ws, &request(Board::Z20, false));
        assert!(report.is_ok());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_reports_every_missing_path_not_just_first() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        // empty workspace: board config + two scripts + cores script + cores dir
        let report = check(&ws, &request(Board::Z10, true));
        assert_eq!(report.errors().len(), 5);

        let err = report.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("5 required path(s) missing"));
        assert!(msg.contains("boards/z10/board.tcl"));
        assert!(msg.contains("scripts/project.tcl"));
        assert!(msg.contains("scripts/build_bitstream.tcl"));
        assert!(msg.contains("scripts/gen_cores.tcl"));
        assert!(msg.contains("cores"));
    }

    #[test]
    fn test_cores_paths_only_checked_when_requested() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        populate(&ws, Board::Z20);

        // no cores requested: cores script absence is fine
        assert!(check(&ws, &request(Board::Z20, false)).is_ok());
        // requested: both cores paths reported missing
        let report = check(&ws, &request(Board::Z20, true));
        assert_eq!(report.errors().len(), 2);
    }
}
