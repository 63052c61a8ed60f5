//! Status command - report the baseline and installed distro state.

use tzdistro::installer::SWAP_JOURNAL_FILE_NAME;
use tzdistro::{DistroInstaller, InstalledDistro};

use crate::error::CliError;

/// Run the status command.
pub fn run(installer: &DistroInstaller) -> Result<(), CliError> {
    let system_rules = installer
        .system_rules_version()
        .map_err(|e| CliError::Status(e.to_string()))?;
    println!("System baseline rules: {}", system_rules);

    let installed = installer
        .installed_distro()
        .map_err(|e| CliError::Status(e.to_string()))?;
    match installed {
        InstalledDistro::Absent => {
            println!("Installed distro:      none (baseline active)");
        }
        InstalledDistro::Valid(version) => {
            println!("Installed distro:      {}", version);
            println!("Active rules:          {}", version.rules_version);
        }
        InstalledDistro::Corrupt(reason) => {
            println!("Installed distro:      corrupt ({})", reason);
        }
    }

    if installer
        .install_root()
        .join(SWAP_JOURNAL_FILE_NAME)
        .exists()
    {
        println!("Note: an interrupted install was detected; the next install or uninstall will repair it");
    }
    Ok(())
}
