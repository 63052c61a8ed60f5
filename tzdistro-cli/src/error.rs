//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the command-line user.
///
/// Install rejections are not errors; they are reported through the
/// process exit code. These variants cover everything else that can go
/// wrong while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The install command failed for an environmental reason.
    #[error("install failed: {0}")]
    Install(String),

    /// The uninstall command failed.
    #[error("uninstall failed: {0}")]
    Uninstall(String),

    /// The status query failed.
    #[error("status query failed: {0}")]
    Status(String),

    /// Packing a distro archive failed.
    #[error("pack failed: {0}")]
    Pack(String),
}
