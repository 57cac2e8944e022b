//! Board and build-variant definitions.
//!
//! All board-specific constants live here: Vivado part strings, default
//! toolchain install locations, the bootgen architecture flag, and the
//! filenames the toolchain is known to produce. The rest of the crate never
//! hardcodes a board name.

use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Board {
    /// Zynq-7010 instrument
    Z10,
    /// Zynq-7020 instrument
    Z20,
    /// Zynq UltraScale+ ZU5EV instrument
    Zu5,
}

impl Board {
    pub fn as_str(&self) -> &'static str {
        match self {
            Board::Z10 => "z10",
            Board::Z20 => "z20",
            Board::Zu5 => "zu5",
        }
    }

    /// Vivado part string passed to the project scripts.
    pub fn part(&self) -> &'static str {
        match self {
            Board::Z10 => "xc7z010clg400-1",
            Board::Z20 => "xc7z020clg400-1",
            Board::Zu5 => "xczu5ev-sfvc784-1-e",
        }
    }

    /// Architecture flag for bootgen.
    pub fn bootgen_arch(&self) -> &'static str {
        match self {
            Board::Z10 | Board::Z20 => "zynq",
            Board::Zu5 => "zynqmp",
        }
    }

    /// Well-known Vivado install location for this board's supported
    /// toolchain version. Used as the last resolution tier when no
    /// explicit path is given and nothing is on PATH.
    pub fn default_toolchain(&self) -> PathBuf {
        match self {
            Board::Z10 | Board::Z20 => PathBuf::from("/opt/Xilinx/Vivado/2020.1/bin/vivado"),
            Board::Zu5 => PathBuf::from("/opt/Xilinx/Vivado/2022.2/bin/vivado"),
        }
    }

    /// OS generation shipped on this board by default. The Z10 still runs
    /// the legacy image with the xdevcfg loader; newer boards use the
    /// in-kernel FPGA manager and need the packaged format.
    pub fn default_os_generation(&self) -> OsGeneration {
        match self {
            Board::Z10 => OsGeneration::Legacy,
            Board::Z20 | Board::Zu5 => OsGeneration::Mainline,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Board {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "z10" => Ok(Board::Z10),
            "z20" => Ok(Board::Z20),
            "zu5" => Ok(Board::Zu5),
            other => Err(format!("unknown board '{}' (expected z10, z20, or zu5)", other)),
        }
    }
}

/// All boards, in the order they are reported by `status`.
pub const ALL_BOARDS: &[Board] = &[Board::Z10, Board::Z20, Board::Zu5];

/// Build variants of the gateware project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Variant {
    /// Default acquisition gateware
    #[default]
    Standard,
    /// Continuous-streaming gateware
    Streaming,
    /// Logic-analyzer gateware
    Logic,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::Streaming => "streaming",
            Variant::Logic => "logic",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Variant::Standard),
            "streaming" => Ok(Variant::Streaming),
            "logic" => Ok(Variant::Logic),
            other => Err(format!(
                "unknown variant '{}' (expected standard, streaming, or logic)",
                other
            )),
        }
    }
}

/// Target OS generation on the device. Decides whether the raw bitstream is
/// directly loadable or must be packaged for the in-kernel FPGA manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OsGeneration {
    /// xdevcfg loader, raw `.bit` directly usable
    Legacy,
    /// in-kernel FPGA manager, packaged `.bit.bin` required
    Mainline,
}

impl OsGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsGeneration::Legacy => "legacy",
            OsGeneration::Mainline => "mainline",
        }
    }

    /// Whether the packaged container format is mandatory for this
    /// generation.
    pub fn requires_packaging(&self) -> bool {
        matches!(self, OsGeneration::Mainline)
    }
}

impl fmt::Display for OsGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OsGeneration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(OsGeneration::Legacy),
            "mainline" => Ok(OsGeneration::Mainline),
            other => Err(format!(
                "unknown OS generation '{}' (expected legacy or mainline)",
                other
            )),
        }
    }
}

/// Extension of the raw toolchain output.
pub const RAW_EXT: &str = "bit";

/// Filenames the toolchain is known to produce in the output directory,
/// in priority order. The resolver checks the canonical variant-qualified
/// name first, then these. Order encodes priority, never recency.
pub const BITSTREAM_CANDIDATES: &[&str] = &["system_wrapper.bit", "system_top.bit", "top.bit"];

/// Subtrees never mirrored to a remote build host. Prior build outputs and
/// tool caches dominate workspace volume; the mirror must match this list
/// exactly.
pub const SYNC_EXCLUDE_DIRS: &[&str] = &["build", ".Xil", ".cache", ".git", "target"];

/// Default parallelism hint handed to the toolchain.
pub const DEFAULT_JOBS: u32 = 4;

/// Default SSH port for the remote backend.
pub const DEFAULT_REMOTE_PORT: u16 = 22;

/// Default workspace mirror location on the remote host, relative to the
/// login home directory.
pub const DEFAULT_REMOTE_DIR: &str = "bitforge-work";

/// Environment variable overrides. CLI flags take precedence.
pub const ENV_TOOLCHAIN: &str = "BITFORGE_TOOLCHAIN";
pub const ENV_IMAGE: &str = "BITFORGE_IMAGE";
pub const ENV_PLATFORM: &str = "BITFORGE_PLATFORM";
pub const ENV_REMOTE_HOST: &str = "BITFORGE_REMOTE_HOST";
pub const ENV_REMOTE_USER: &str = "BITFORGE_REMOTE_USER";
pub const ENV_REMOTE_PORT: &str = "BITFORGE_REMOTE_PORT";
pub const ENV_REMOTE_DIR: &str = "BITFORGE_REMOTE_DIR";
pub const ENV_REMOTE_TOOLCHAIN: &str = "BITFORGE_REMOTE_TOOLCHAIN";
pub const ENV_OS_GEN: &str = "BITFORGE_OS_GEN";

/// Transient journal/log files the toolchain scatters next to its working
/// directory. Matched by name anywhere in the tree.
pub fn is_transient_tool_file(name: &str) -> bool {
    name.starts_with("vivado") && (name.ends_with(".jou") || name.ends_with(".log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_roundtrip() {
        for board in ALL_BOARDS {
            assert_eq!(<Board as FromStr>::from_str(board.as_str()).unwrap(), *board);
        }
        assert!(<Board as FromStr>::from_str("z99").is_err());
    }

    #[test]
    fn test_bootgen_arch() {
        assert_eq!(Board::Z10.bootgen_arch(), "zynq");
        assert_eq!(Board::Z20.bootgen_arch(), "zynq");
        assert_eq!(Board::Zu5.bootgen_arch(), "zynqmp");
    }

    #[test]
    fn test_default_os_generation() {
        assert_eq!(Board::Z10.default_os_generation(), OsGeneration::Legacy);
        assert!(Board::Z20.default_os_generation().requires_packaging());
        assert!(Board::Zu5.default_os_generation().requires_packaging());
    }

    #[test]
    fn test_candidates_are_fixed_and_ordered() {
        assert_eq!(
            BITSTREAM_CANDIDATES,
            &["system_wrapper.bit", "system_top.bit", "top.bit"]
        );
    }

    #[test]
    fn test_transient_tool_files() {
        assert!(is_transient_tool_file("vivado.jou"));
        assert!(is_transient_tool_file("vivado_2041.log"));
        assert!(!is_transient_tool_file("build.log"));
        assert!(!is_transient_tool_file("vivado.tcl"));
    }
}
