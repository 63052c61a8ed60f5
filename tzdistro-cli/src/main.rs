//! TzDistro CLI - manage time zone rule distros on a device.
//!
//! Wires the `tzdistro` library to clap subcommands. Install rejections
//! map to the installer's outcome codes so callers can script against
//! them; environmental failures exit with a distinct code.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;

use tzdistro::DistroInstaller;

use crate::error::CliError;

/// Location of the immutable baseline rules on the device image.
const DEFAULT_SYSTEM_TZDATA: &str = "/system/usr/share/zoneinfo/tzdata";

/// Directory the installer owns for its distro slots.
const DEFAULT_INSTALL_ROOT: &str = "/data/misc/zoneinfo";

/// Exit code for environmental failures, distinct from outcome codes 0-4.
const ERROR_EXIT_CODE: i32 = 10;

/// TzDistro - safe installer for time zone rule distros
#[derive(Debug, Parser)]
#[command(name = "tzdistro")]
#[command(author = "TzDistro Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install and manage time zone rule distros", long_about = None)]
struct Cli {
    /// Path to the read-only system baseline rules file
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_SYSTEM_TZDATA)]
    system_tzdata: PathBuf,

    /// Directory holding the installed distro slots
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_INSTALL_ROOT)]
    install_root: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the system baseline and the installed distro state
    Status,
    /// Install a distro archive
    Install {
        /// Path to the distro archive file
        distro_file: PathBuf,
    },
    /// Remove the installed distro, reactivating the system baseline
    Uninstall,
    /// Pack distro parts into an installable archive
    Pack(commands::pack::PackArgs),
}

fn main() {
    let cli = Cli::parse();
    tzdistro::logging::init(if cli.verbose { "debug" } else { "info" });

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(ERROR_EXIT_CODE);
        }
    }
}

fn run(cli: Cli) -> Result<i32, CliError> {
    let installer = DistroInstaller::new(&cli.system_tzdata, &cli.install_root);
    debug!(
        system = %cli.system_tzdata.display(),
        root = %cli.install_root.display(),
        "Installer configured"
    );

    match cli.command {
        Command::Status => {
            commands::status::run(&installer)?;
            Ok(0)
        }
        Command::Install { distro_file } => {
            let outcome = commands::install::run(&installer, &distro_file)?;
            Ok(i32::from(outcome.code()))
        }
        Command::Uninstall => {
            commands::uninstall::run(&installer)?;
            Ok(0)
        }
        Command::Pack(args) => {
            commands::pack::run(args)?;
            Ok(0)
        }
    }
}
