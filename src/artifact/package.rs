//! Packaging into the device-loadable container format.
//!
//! Mainline device images load the bitstream through the in-kernel FPGA
//! manager, which only accepts the packaged `.bit.bin` form; legacy images
//! load the raw `.bit` directly. Packaging runs bootgen against a small
//! transient descriptor naming the single input bitstream. The descriptor
//! is removed whichever way the invocation ends; the packaged file lands
//! next to the raw one so downstream deployment tooling can pick either.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::artifact::{ArtifactFormat, BuildArtifact};
use crate::board::OsGeneration;
use crate::error::{BuildError, Result};
use crate::process::{which, Cmd};
use crate::request::BuildRequest;

/// Descriptor content handed to bootgen: a single-image block naming the
/// input bitstream.
fn descriptor(bitstream: &Path) -> String {
    format!("all:\n{{\n    {}\n}}\n", bitstream.display())
}

/// Locate bootgen: PATH first, then next to the resolved toolchain binary
/// (stock installs ship both in the same bin directory), then the version
/// directories of the conventional install root. Best-effort; unusual
/// installs may still need bootgen on PATH.
pub fn find_bootgen(toolchain: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = which("bootgen") {
        return Some(path);
    }

    if let Some(toolchain) = toolchain {
        if let Some(bin_dir) = toolchain.parent() {
            let sibling = bin_dir.join("bootgen");
            if crate::process::is_executable(&sibling) {
                return Some(sibling);
            }
        }
    }

    let install_root = Path::new("/opt/Xilinx/Vivado");
    if let Ok(entries) = std::fs::read_dir(install_root) {
        let mut versions: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path().join("bin/bootgen"))
            .filter(|p| crate::process::is_executable(p))
            .collect();
        // newest install wins
        versions.sort();
        return versions.pop();
    }

    None
}

/// Convert a raw bitstream into the packaged container format.
///
/// Mandatory for mainline OS generations: a missing packaging tool is an
/// error. Optional for legacy generations: the tool being absent is a
/// no-op and the original artifact is returned.
pub fn convert(request: &BuildRequest, artifact: &BuildArtifact) -> Result<BuildArtifact> {
    let bootgen = find_bootgen(request.local_toolchain().map(|p| p.as_path()));
    convert_with(artifact, bootgen.as_deref(), request.os_gen)
}

/// Conversion against an explicitly located packaging tool. Split from
/// [`convert`] so the skip/fail policy is testable without a bootgen
/// install.
fn convert_with(
    artifact: &BuildArtifact,
    bootgen: Option<&Path>,
    os_gen: OsGeneration,
) -> Result<BuildArtifact> {
    let bootgen = match bootgen {
        Some(path) => path,
        None if os_gen.requires_packaging() => {
            return Err(BuildError::artifact(format!(
                "bootgen not found, and the {} OS generation requires the packaged format.\n\
                 Install the toolchain's bootgen or put it on PATH.",
                os_gen
            )));
        }
        None => {
            println!("[SKIP] bootgen not found; raw bitstream is usable on {} images", os_gen);
            return Ok(artifact.clone());
        }
    };

    let dir = artifact.path.parent().ok_or_else(|| {
        BuildError::artifact(format!("{} has no parent", artifact.path.display()))
    })?;
    let packaged = packaged_path(&artifact.path);

    // transient descriptor, removed on drop regardless of the outcome
    let mut bif = Builder::new()
        .prefix("bitforge-")
        .suffix(".bif")
        .tempfile_in(dir)
        .map_err(BuildError::Io)?;
    bif.write_all(descriptor(&artifact.path).as_bytes())?;
    bif.flush()?;

    println!("Packaging {} with bootgen...", artifact.path.display());
    let result = Cmd::new(bootgen)
        .args(["-image"])
        .arg_path(bif.path())
        .args(["-arch", artifact.board.bootgen_arch()])
        .args(["-process_bitstream", "bin", "-w"])
        .run()
        .map_err(|e| BuildError::artifact(format!("failed to launch bootgen: {}", e)))?;
    if !result.success() {
        return Err(BuildError::artifact(format!(
            "bootgen failed: {}",
            result.stderr_tail()
        )));
    }
    if !packaged.is_file() {
        return Err(BuildError::artifact(format!(
            "bootgen reported success but {} was not produced",
            packaged.display()
        )));
    }

    Ok(BuildArtifact {
        path: packaged,
        board: artifact.board,
        variant: artifact.variant,
        format: ArtifactFormat::PackagedBinary,
    })
}

/// bootgen's bin-processed output lands next to the input with an extra
/// `.bin` suffix: `standard.bit` -> `standard.bit.bin`.
pub fn packaged_path(bitstream: &Path) -> PathBuf {
    let mut name = bitstream.as_os_str().to_os_string();
    name.push(".bin");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Variant};
    use std::fs;
    use tempfile::tempdir;

    fn artifact(dir: &Path) -> BuildArtifact {
        let path = dir.join("standard.bit");
        fs::write(&path, b"bitstream").unwrap();
        BuildArtifact {
            path,
            board: Board::Z20,
            variant: Variant::Standard,
            format: ArtifactFormat::RawBitstream,
        }
    }

    #[test]
    fn test_packaged_path_naming() {
        assert_eq!(
            packaged_path(Path::new("/out/standard.bit")),
            PathBuf::from("/out/standard.bit.bin")
        );
    }

    #[test]
    fn test_descriptor_names_single_input() {
        let text = descriptor(Path::new("/out/streaming.bit"));
        assert!(text.starts_with("all:\n{\n"));
        assert!(text.contains("/out/streaming.bit\n"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_missing_tool_is_error_when_mandatory() {
        let dir = tempdir().unwrap();
        let artifact = artifact(dir.path());
        let err = convert_with(&artifact, None, OsGeneration::Mainline).unwrap_err();
        assert!(matches!(err, BuildError::Artifact(_)));
        assert!(err.to_string().contains("bootgen not found"));
    }

    #[test]
    fn test_missing_tool_is_noop_when_optional() {
        let dir = tempdir().unwrap();
        let artifact = artifact(dir.path());
        let out = convert_with(&artifact, None, OsGeneration::Legacy).unwrap();
        // the original artifact comes back untouched
        assert_eq!(out.path, artifact.path);
        assert_eq!(out.format, ArtifactFormat::RawBitstream);
        assert!(!packaged_path(&artifact.path).exists());
    }

    #[test]
    fn test_conversion_produces_sibling_and_removes_descriptor() {
        let dir = tempdir().unwrap();
        let artifact = artifact(dir.path());

        // stand-in packer: copies its would-be output into place and
        // exits 0, like bootgen's -process_bitstream bin mode
        let fake = dir.path().join("fake-bootgen.sh");
        fs::write(
            &fake,
            "#!/bin/sh\ncp \"$(dirname \"$0\")/standard.bit\" \"$(dirname \"$0\")/standard.bit.bin\"\n",
        )
        .unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let out = convert_with(&artifact, Some(&fake), OsGeneration::Mainline).unwrap();
        assert_eq!(out.path, dir.path().join("standard.bit.bin"));
        assert_eq!(out.format, ArtifactFormat::PackagedBinary);
        // raw and packaged forms sit side by side
        assert!(artifact.path.exists());
        // the transient descriptor is gone
        let bifs: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "bif"))
            .collect();
        assert!(bifs.is_empty());
    }

    #[test]
    fn test_failing_tool_surfaces_artifact_error() {
        let dir = tempdir().unwrap();
        let artifact = artifact(dir.path());
        let err =
            convert_with(&artifact, Some(Path::new("/bin/false")), OsGeneration::Mainline)
                .unwrap_err();
        assert!(matches!(err, BuildError::Artifact(_)));
    }
}
