//! Install command - install a distro archive.

use std::fs;
use std::path::Path;

use tzdistro::{DistroArchive, DistroInstaller, InstallOutcome};

use crate::error::CliError;

/// Run the install command.
///
/// The returned outcome drives the process exit code, so a rejected
/// distro is `Ok` here and non-zero only at the process boundary.
pub fn run(installer: &DistroInstaller, distro_file: &Path) -> Result<InstallOutcome, CliError> {
    let bytes = fs::read(distro_file).map_err(|e| {
        CliError::Install(format!("failed to read {}: {}", distro_file.display(), e))
    })?;
    println!(
        "Installing {} ({} bytes)",
        distro_file.display(),
        bytes.len()
    );

    let outcome = installer
        .install_with_outcome(&DistroArchive::new(bytes))
        .map_err(|e| CliError::Install(e.to_string()))?;

    if outcome.is_success() {
        match installer.installed_distro() {
            Ok(installed) => match installed.version() {
                Some(version) => println!("Installed distro {}", version),
                None => println!("Install complete"),
            },
            Err(_) => println!("Install complete"),
        }
    } else {
        println!("Distro rejected: {} (code {})", outcome, outcome.code());
    }
    Ok(outcome)
}
