//! Pack command - build an installable distro archive from parts.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use tzdistro::distro::{SUPPORTED_FORMAT_MAJOR_VERSION, SUPPORTED_FORMAT_MINOR_VERSION};
use tzdistro::{DistroBuilder, DistroVersion};

use crate::error::CliError;

/// Arguments for the pack command.
#[derive(Debug, Args)]
pub struct PackArgs {
    /// IANA rules version carried by the distro, e.g. 2024a
    #[arg(long, value_name = "VERSION")]
    pub rules_version: String,

    /// Packaging revision within the rules version
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub revision: u16,

    /// Path to the compiled time zone rules file
    #[arg(long, value_name = "FILE")]
    pub tzdata: PathBuf,

    /// Path to the ICU time zone data file
    #[arg(long, value_name = "FILE")]
    pub icu_data: PathBuf,

    /// Where to write the packed distro
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Run the pack command.
pub fn run(args: PackArgs) -> Result<(), CliError> {
    let version = DistroVersion::new(
        SUPPORTED_FORMAT_MAJOR_VERSION,
        SUPPORTED_FORMAT_MINOR_VERSION,
        &args.rules_version,
        args.revision,
    )
    .map_err(|e| CliError::Pack(e.to_string()))?;

    let distro = DistroBuilder::new()
        .with_version(version)
        .with_tzdata(read_part(&args.tzdata)?)
        .with_icu_data(read_part(&args.icu_data)?)
        .build()
        .map_err(|e| CliError::Pack(e.to_string()))?;

    fs::write(&args.output, distro.as_bytes()).map_err(|e| {
        CliError::Pack(format!("failed to write {}: {}", args.output.display(), e))
    })?;
    println!(
        "Packed {} ({} bytes)",
        args.output.display(),
        distro.len()
    );
    Ok(())
}

fn read_part(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path)
        .map_err(|e| CliError::Pack(format!("failed to read {}: {}", path.display(), e)))
}
