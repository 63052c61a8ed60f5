//! Uninstall command - remove the installed distro.

use tzdistro::DistroInstaller;

use crate::error::CliError;

/// Run the uninstall command.
pub fn run(installer: &DistroInstaller) -> Result<(), CliError> {
    let removed = installer
        .uninstall()
        .map_err(|e| CliError::Uninstall(e.to_string()))?;
    if removed {
        println!("Distro removed; system baseline rules are active");
    } else {
        println!("No distro installed; nothing to do");
    }
    Ok(())
}
