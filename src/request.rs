//! Build request construction and backend selection.
//!
//! Raw CLI flags and their environment-variable equivalents are merged into
//! one immutable [`BuildRequest`] that is threaded explicitly through every
//! component. Selection rules:
//!
//! - Container and Remote are mutually exclusive.
//! - Neither selected defaults to Local, which requires a resolvable
//!   toolchain binary: explicit override, then PATH, then the board's
//!   well-known install location.

use std::env;
use std::path::PathBuf;

use crate::board::{
    Board, OsGeneration, Variant, DEFAULT_REMOTE_DIR, DEFAULT_REMOTE_PORT, ENV_IMAGE, ENV_OS_GEN,
    ENV_PLATFORM, ENV_REMOTE_DIR, ENV_REMOTE_HOST, ENV_REMOTE_PORT, ENV_REMOTE_TOOLCHAIN,
    ENV_REMOTE_USER, ENV_TOOLCHAIN,
};
use crate::error::{BuildError, Result};
use crate::process::{is_executable, which};

/// Container backend configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub image: String,
    /// Optional platform pin, e.g. `linux/amd64` when the toolchain image
    /// has no native build for the host architecture.
    pub platform: Option<String>,
}

/// Remote backend configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub user: String,
    pub port: u16,
    /// Workspace mirror directory on the remote host. A relative path is
    /// resolved against the login home directory.
    pub root_dir: PathBuf,
    /// Toolchain command on the remote host. Resolved by the remote login
    /// shell, so a bare command name picks up the remote PATH.
    pub toolchain: String,
}

/// Execution context for the toolchain. Created once per request, owns no
/// state beyond its configuration.
#[derive(Debug, Clone)]
pub enum BackendChoice {
    Local { toolchain: PathBuf },
    Container(ContainerConfig),
    Remote(RemoteConfig),
}

impl BackendChoice {
    pub fn name(&self) -> &'static str {
        match self {
            BackendChoice::Local { .. } => "local",
            BackendChoice::Container(_) => "container",
            BackendChoice::Remote(_) => "remote",
        }
    }
}

/// Raw request flags as they arrive from the CLI, before environment
/// merging and validation.
#[derive(Debug, Default, Clone)]
pub struct RawRequest {
    pub board: Option<Board>,
    pub variant: Variant,
    pub jobs: u32,
    pub force: bool,
    pub gen_cores: bool,
    pub os_gen: Option<OsGeneration>,
    pub toolchain: Option<PathBuf>,
    pub image: Option<String>,
    pub platform: Option<String>,
    pub remote_host: Option<String>,
    pub remote_user: Option<String>,
    pub remote_port: Option<u16>,
    pub remote_dir: Option<PathBuf>,
    pub remote_toolchain: Option<String>,
}

/// One validated, immutable build request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub board: Board,
    pub variant: Variant,
    pub jobs: u32,
    pub force: bool,
    pub gen_cores: bool,
    pub os_gen: OsGeneration,
    pub backend: BackendChoice,
}

impl BuildRequest {
    /// Merge CLI flags with environment equivalents (flags win) and
    /// validate the result.
    pub fn resolve(raw: RawRequest) -> Result<Self> {
        Self::resolve_with(raw, &|var| env::var(var).ok())
    }

    /// Resolution against an explicit environment lookup. Separated so
    /// tests can exercise precedence without mutating process state.
    fn resolve_with(raw: RawRequest, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let board = raw
            .board
            .ok_or_else(|| BuildError::config("no board selected (use --board)"))?;

        if raw.jobs == 0 {
            return Err(BuildError::config("--jobs must be a positive integer"));
        }

        let image = raw.image.or_else(|| env(ENV_IMAGE));
        let remote_host = raw.remote_host.or_else(|| env(ENV_REMOTE_HOST));

        if image.is_some() && remote_host.is_some() {
            return Err(BuildError::config(
                "container and remote backends are mutually exclusive \
                 (both an image and a remote host were given)",
            ));
        }

        let backend = if let Some(image) = image {
            BackendChoice::Container(ContainerConfig {
                image,
                platform: raw.platform.or_else(|| env(ENV_PLATFORM)),
            })
        } else if let Some(host) = remote_host {
            let port = match raw.remote_port {
                Some(port) => port,
                None => match env(ENV_REMOTE_PORT) {
                    Some(s) => s.parse().map_err(|_| {
                        BuildError::config(format!("{} is not a valid port: {}", ENV_REMOTE_PORT, s))
                    })?,
                    None => DEFAULT_REMOTE_PORT,
                },
            };
            let user = raw
                .remote_user
                .or_else(|| env(ENV_REMOTE_USER))
                .or_else(|| env("USER"))
                .ok_or_else(|| {
                    BuildError::config("no remote user given and $USER is unset (use --remote-user)")
                })?;
            let root_dir = raw
                .remote_dir
                .or_else(|| env(ENV_REMOTE_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REMOTE_DIR));
            let toolchain = raw
                .remote_toolchain
                .or_else(|| env(ENV_REMOTE_TOOLCHAIN))
                .unwrap_or_else(|| "vivado".to_string());
            BackendChoice::Remote(RemoteConfig {
                host,
                user,
                port,
                root_dir,
                toolchain,
            })
        } else {
            let explicit = raw
                .toolchain
                .or_else(|| env(ENV_TOOLCHAIN).map(PathBuf::from));
            BackendChoice::Local {
                toolchain: resolve_toolchain(explicit, board)?,
            }
        };

        let os_gen = match raw.os_gen {
            Some(gen) => gen,
            None => match env(ENV_OS_GEN) {
                Some(s) => s.parse().map_err(BuildError::Config)?,
                None => board.default_os_generation(),
            },
        };

        Ok(Self {
            board,
            variant: raw.variant,
            jobs: raw.jobs,
            force: raw.force,
            gen_cores: raw.gen_cores,
            os_gen,
            backend,
        })
    }

    /// The locally resolved toolchain path, when the local backend is
    /// active. Used for sibling discovery of the packaging tool.
    pub fn local_toolchain(&self) -> Option<&PathBuf> {
        match &self.backend {
            BackendChoice::Local { toolchain } => Some(toolchain),
            _ => None,
        }
    }
}

/// Resolve the local toolchain binary: explicit override, then PATH, then
/// the board's well-known install location.
pub fn resolve_toolchain(explicit: Option<PathBuf>, board: Board) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if is_executable(&path) {
            return Ok(path);
        }
        return Err(BuildError::config(format!(
            "toolchain override {} is not an executable file",
            path.display()
        )));
    }

    if let Some(path) = which("vivado") {
        return Ok(path);
    }

    let well_known = board.default_toolchain();
    if is_executable(&well_known) {
        return Ok(well_known);
    }

    Err(BuildError::config(format!(
        "no usable toolchain found for {}: not on PATH and {} does not exist.\n\
         Install Vivado, pass --toolchain, or select a container/remote backend.",
        board,
        well_known.display()
    )))
}
