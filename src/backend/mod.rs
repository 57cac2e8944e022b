//! Build backends.
//!
//! A backend is the execution context the toolchain runs in. The same
//! logical build request dispatches to one of three contexts:
//!
//! - [`local`] - a toolchain install on this machine
//! - [`container`] - an ephemeral Docker container with the workspace
//!   bind-mounted
//! - [`remote`] - a toolchain on another host reached over SSH, with the
//!   workspace mirrored there first and artifacts pulled back after
//!
//! Each backend sees the workspace under a different root; all paths the
//! toolchain needs are translated from the local workspace root to the
//! backend's root before interpolation.

pub mod container;
pub mod local;
pub mod remote;

pub use container::ContainerBackend;
pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::path::Path;

use crate::error::Result;
use crate::request::{BackendChoice, BuildRequest};
use crate::workspace::Workspace;

/// An execution context for the toolchain.
///
/// `script` and `build_dir` are always local workspace paths; backends
/// that run elsewhere translate them against their own root.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Validate reachability and stage the workspace. Runs before the
    /// toolchain is launched; connectivity failures surface here, before
    /// anything is mutated.
    fn prepare(&self, _ws: &Workspace) -> Result<()> {
        Ok(())
    }

    /// Run the generated driver script through the toolchain, blocking
    /// until it exits.
    fn invoke(&self, ws: &Workspace, script: &Path, build_dir: &Path) -> Result<()>;

    /// Bring build outputs back into the local output directory. A no-op
    /// for backends that already share the local filesystem.
    fn collect(&self, _ws: &Workspace, _output_dir: &Path) -> Result<()> {
        Ok(())
    }
}

/// Instantiate the backend selected by a validated request.
pub fn select(request: &BuildRequest) -> Box<dyn Backend> {
    match &request.backend {
        BackendChoice::Local { toolchain } => Box::new(LocalBackend::new(toolchain.clone())),
        BackendChoice::Container(cfg) => Box::new(ContainerBackend::new(cfg.clone())),
        BackendChoice::Remote(cfg) => Box::new(RemoteBackend::new(cfg.clone())),
    }
}

/// Map a streamed toolchain exit code to a result.
pub(crate) fn check_toolchain_exit(context: &str, code: Option<i32>) -> Result<()> {
    use crate::error::BuildError;
    match code {
        Some(0) => Ok(()),
        Some(n) => Err(BuildError::toolchain(format!(
            "{} exited with status {}",
            context, n
        ))),
        None => Err(BuildError::toolchain(format!(
            "{} was killed by a signal",
            context
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    #[test]
    fn test_check_toolchain_exit() {
        assert!(check_toolchain_exit("vivado", Some(0)).is_ok());
        assert!(matches!(
            check_toolchain_exit("vivado", Some(2)),
            Err(BuildError::Toolchain(_))
        ));
        assert!(matches!(
            check_toolchain_exit("vivado", None),
            Err(BuildError::Toolchain(_))
        ));
    }

    #[test]
    fn test_select_matches_request_backend() {
        use crate::board::{Board, Variant};
        use crate::request::ContainerConfig;

        let request = BuildRequest {
            board: Board::Z20,
            variant: Variant::Standard,
            jobs: 2,
            force: false,
            gen_cores: false,
            os_gen: Board::Z20.default_os_generation(),
            backend: BackendChoice::Container(ContainerConfig {
                image: "img".into(),
                platform: None,
            }),
        };
        assert_eq!(select(&request).name(), "container");
    }
}
