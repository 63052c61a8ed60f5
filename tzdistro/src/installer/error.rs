//! Error types for the distro installer.

use std::io;
use std::path::PathBuf;

/// Result type for installer operations.
pub type InstallerResult<T> = Result<T, InstallerError>;

/// Hard failures raised by installer operations.
///
/// These cover environmental problems: unreadable files, failed renames,
/// a broken system baseline. A well-formed distro that merely fails an
/// acceptance check is not an error; those are reported as
/// [`InstallOutcome`](super::InstallOutcome) values instead.
#[derive(Debug)]
pub enum InstallerError {
    /// Failed to read a file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to delete a file or directory.
    DeleteFailed { path: PathBuf, source: io::Error },

    /// Failed to rename a directory.
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// Failed to open up permissions on the staged distro.
    SetPermissionsFailed { path: PathBuf, source: io::Error },

    /// The system baseline rules file does not exist.
    SystemRulesMissing { path: PathBuf },

    /// The system baseline rules file is present but not usable.
    SystemRulesInvalid { path: PathBuf, reason: String },
}

impl std::fmt::Display for InstallerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::DeleteFailed { path, source } => {
                write!(f, "failed to delete {}: {}", path.display(), source)
            }
            Self::RenameFailed { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} to {}: {}",
                    from.display(),
                    to.display(),
                    source
                )
            }
            Self::SetPermissionsFailed { path, source } => {
                write!(
                    f,
                    "failed to make {} world readable: {}",
                    path.display(),
                    source
                )
            }
            Self::SystemRulesMissing { path } => {
                write!(f, "system rules file {} does not exist", path.display())
            }
            Self::SystemRulesInvalid { path, reason } => {
                write!(
                    f,
                    "system rules file {} is not usable: {}",
                    path.display(),
                    reason
                )
            }
        }
    }
}

impl std::error::Error for InstallerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::DeleteFailed { source, .. } => Some(source),
            Self::RenameFailed { source, .. } => Some(source),
            Self::SetPermissionsFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallerError::SystemRulesMissing {
            path: PathBuf::from("/system/usr/share/zoneinfo/tzdata"),
        };
        assert_eq!(
            err.to_string(),
            "system rules file /system/usr/share/zoneinfo/tzdata does not exist"
        );
    }

    #[test]
    fn test_rename_failed_display() {
        let err = InstallerError::RenameFailed {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/b"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/a"));
        assert!(err.to_string().contains("/b"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_source_chain() {
        let err = InstallerError::ReadFailed {
            path: PathBuf::from("/x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(std::error::Error::source(&err).is_some());

        let err = InstallerError::SystemRulesMissing {
            path: PathBuf::from("/x"),
        };
        assert!(std::error::Error::source(&err).is_none());
    }
}
