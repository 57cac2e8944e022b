//! bitforge CLI.
//!
//! Builds gateware for Zynq-based instruments with the external Vivado
//! toolchain, against a local install, a Docker container, or a remote
//! build host.
//!
//! # Usage
//!
//! ```bash
//! # Build the standard variant for the z20 with a local toolchain
//! bitforge build --board z20
//!
//! # Build in a container, pinned to amd64
//! bitforge build --board z20 --image ghcr.io/bitforge-dev/vivado:2020.1 --platform linux/amd64
//!
//! # Build on a remote host
//! bitforge build --board zu5 --remote-host fpga-rig --remote-user builder
//!
//! # Remove prior build output
//! bitforge clean --board z20
//!
//! # Show toolchain and artifact state
//! bitforge status
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::fs;
use std::path::PathBuf;

use bitforge::artifact::{canonical_name, package::packaged_path};
use bitforge::board::{Board, OsGeneration, Variant, ALL_BOARDS, DEFAULT_JOBS};
use bitforge::process::which;
use bitforge::request::{BuildRequest, RawRequest};
use bitforge::workspace::Workspace;

#[derive(Parser)]
#[command(name = "bitforge")]
#[command(author, version, about = "Gateware builder for Zynq instruments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a bitstream and package it for the target OS generation
    Build(BuildOpts),

    /// Remove prior build output instead of building
    Clean {
        /// Board whose output to remove; all boards when omitted
        #[arg(long)]
        board: Option<Board>,

        /// Workspace root (defaults to the current directory)
        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// Show toolchain resolution and build artifact state
    Status {
        /// Workspace root (defaults to the current directory)
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BuildOpts {
    /// Target board
    #[arg(long)]
    board: Board,

    /// Build variant
    #[arg(long, default_value_t = Variant::Standard)]
    variant: Variant,

    /// Parallelism hint passed to the toolchain
    #[arg(long, default_value_t = DEFAULT_JOBS)]
    jobs: u32,

    /// Overwrite existing generated project state
    #[arg(long)]
    force: bool,

    /// Generate custom cores before the bitstream build
    #[arg(long)]
    cores: bool,

    /// Target OS generation (defaults per board; env: BITFORGE_OS_GEN)
    #[arg(long)]
    os_gen: Option<OsGeneration>,

    /// Local toolchain binary override (env: BITFORGE_TOOLCHAIN)
    #[arg(long)]
    toolchain: Option<PathBuf>,

    /// Toolchain container image; selects the container backend
    /// (env: BITFORGE_IMAGE)
    #[arg(long)]
    image: Option<String>,

    /// Container platform pin, e.g. linux/amd64 (env: BITFORGE_PLATFORM)
    #[arg(long)]
    platform: Option<String>,

    /// Remote build host; selects the remote backend
    /// (env: BITFORGE_REMOTE_HOST)
    #[arg(long)]
    remote_host: Option<String>,

    /// Remote login user (env: BITFORGE_REMOTE_USER)
    #[arg(long)]
    remote_user: Option<String>,

    /// Remote SSH port (env: BITFORGE_REMOTE_PORT)
    #[arg(long)]
    remote_port: Option<u16>,

    /// Remote workspace mirror directory (env: BITFORGE_REMOTE_DIR)
    #[arg(long)]
    remote_dir: Option<PathBuf>,

    /// Toolchain command on the remote host (env: BITFORGE_REMOTE_TOOLCHAIN)
    #[arg(long)]
    remote_toolchain: Option<String>,

    /// Workspace root (defaults to the current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(opts) => cmd_build(opts),
        Commands::Clean { board, workspace } => cmd_clean(board, workspace),
        Commands::Status { workspace } => cmd_status(workspace),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open_workspace(root: Option<PathBuf>) -> Result<Workspace> {
    let root = match root {
        Some(root) => root,
        None => env::current_dir()?,
    };
    Ok(Workspace::open(root)?)
}

fn cmd_build(opts: BuildOpts) -> Result<()> {
    let ws = open_workspace(opts.workspace)?;

    let request = BuildRequest::resolve(RawRequest {
        board: Some(opts.board),
        variant: opts.variant,
        jobs: opts.jobs,
        force: opts.force,
        gen_cores: opts.cores,
        os_gen: opts.os_gen,
        toolchain: opts.toolchain,
        image: opts.image,
        platform: opts.platform,
        remote_host: opts.remote_host,
        remote_user: opts.remote_user,
        remote_port: opts.remote_port,
        remote_dir: opts.remote_dir,
        remote_toolchain: opts.remote_toolchain,
    })?;

    bitforge::build::run(&ws, &request)?;
    Ok(())
}

fn cmd_clean(board: Option<Board>, workspace: Option<PathBuf>) -> Result<()> {
    let ws = open_workspace(workspace)?;
    ws.clean(board)?;
    Ok(())
}

fn cmd_status(workspace: Option<PathBuf>) -> Result<()> {
    let ws = open_workspace(workspace)?;

    println!("bitforge Status");
    println!("===============");
    println!();
    println!("Workspace: {}", ws.root().display());
    println!();

    println!("Toolchain:");
    match which("vivado") {
        Some(path) => println!("  vivado:   FOUND at {}", path.display()),
        None => println!("  vivado:   NOT ON PATH (pass --toolchain or use a container/remote backend)"),
    }
    match which("bootgen") {
        Some(path) => println!("  bootgen:  FOUND at {}", path.display()),
        None => println!("  bootgen:  NOT ON PATH (needed to package for mainline images)"),
    }
    println!();

    println!("Shared scripts:");
    for script in [ws.project_script(), ws.build_script()] {
        let status = if script.exists() { "FOUND" } else { "MISSING" };
        println!("  {:<9} {}", status, script.display());
    }
    println!();

    for board in ALL_BOARDS {
        println!("Board {} ({}):", board, board.part());
        let config = ws.board_config(*board);
        if config.exists() {
            println!("  Config:   FOUND at {}", config.display());
        } else {
            println!("  Config:   NOT FOUND");
        }

        let output_dir = ws.build_dir(*board);
        let mut built = false;
        for variant in [Variant::Standard, Variant::Streaming, Variant::Logic] {
            let raw = output_dir.join(canonical_name(variant));
            if raw.exists() {
                let size = fs::metadata(&raw).map(|m| m.len() / 1024).unwrap_or(0);
                let packaged = if packaged_path(&raw).exists() {
                    " (+ packaged)"
                } else {
                    ""
                };
                println!("  {:<9} BUILT ({} KB){}", variant.to_string() + ":", size, packaged);
                built = true;
            }
        }
        if !built {
            println!("  Variants: NOT BUILT");
        }
        println!();
    }

    Ok(())
}
