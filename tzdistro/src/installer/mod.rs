//! Crash-safe installation of time zone distros.
//!
//! The installer owns a directory layout of sibling directories under a
//! single *installer root*, next to a read-only system baseline file:
//!
//! ```text
//! <system tzdata file>     immutable baseline rules shipped with the image
//! <install root>/
//!   current/               live installed distro, if any
//!   working/               staging area while a distro is checked
//!   old/                   previous distro, mid-promotion only
//!   .swap-journal          marker while a promotion is in flight
//! ```
//!
//! # Install lifecycle
//!
//! [`DistroInstaller::install_with_outcome`] unpacks the payload into
//! `working/` and walks a fixed sequence of acceptance checks: version file
//! shape, format compatibility, required files, rules-version ordering
//! against the system baseline, then deep validation of the staged rules
//! data. A distro failing a check is reported as a non-success
//! [`InstallOutcome`]; only environmental failures become errors.
//!
//! Promotion is two directory renames bracketed by the swap journal:
//! `current/` moves to `old/`, `working/` moves to `current/`. A crash
//! between the renames is detected on the next mutating call, which
//! restores `old/` as `current/` before doing anything else. Readers of
//! `current/` never observe a half-written distro.
//!
//! The installer mutates nothing outside its root. It is built for one
//! caller at a time; concurrent calls against the same root are not
//! supported.

mod error;
mod fs;
mod journal;

pub use error::{InstallerError, InstallerResult};
pub use fs::{FileOps, StdFileOps};
pub use journal::{JournalRecord, SwapJournal, SWAP_JOURNAL_FILE_NAME};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::distro::{
    DistroArchive, DistroError, DistroVersion, DISTRO_VERSION_FILE_LENGTH,
    DISTRO_VERSION_FILE_NAME, ICU_DATA_FILE_NAME, TZDATA_FILE_NAME,
};
use crate::tzdata::{RulesData, TzDataError};

/// Name of the live distro directory under the installer root.
pub const CURRENT_DIR_NAME: &str = "current";

/// Name of the staging directory distros are unpacked into.
pub const WORKING_DIR_NAME: &str = "working";

/// Name of the directory the live distro moves to during promotion.
pub const OLD_DIR_NAME: &str = "old";

/// The result of an install attempt.
///
/// Every non-success outcome leaves the previously installed distro (or its
/// absence) untouched. [`InstallOutcome::code`] gives the stable numeric
/// code reported to update components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The distro was accepted and is now live.
    Installed,

    /// The payload was missing required files or had a malformed version
    /// file.
    BadDistroStructure,

    /// The distro format version is not readable by this device.
    BadFormatVersion,

    /// The distro's rules are older than the system baseline.
    RulesTooOld,

    /// The staged rules data failed validation.
    ValidationFailed,
}

impl InstallOutcome {
    /// Stable numeric code for this outcome.
    pub fn code(&self) -> u8 {
        match self {
            Self::Installed => 0,
            Self::BadDistroStructure => 1,
            Self::BadFormatVersion => 2,
            Self::RulesTooOld => 3,
            Self::ValidationFailed => 4,
        }
    }

    /// Check whether the distro was installed.
    pub fn is_success(&self) -> bool {
        *self == Self::Installed
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Installed => "installed",
            Self::BadDistroStructure => "bad distro structure",
            Self::BadFormatVersion => "incompatible distro format version",
            Self::RulesTooOld => "distro rules older than system baseline",
            Self::ValidationFailed => "staged rules data failed validation",
        };
        write!(f, "{}", text)
    }
}

/// What is installed in the `current/` slot.
///
/// `Corrupt` means the slot exists but its version cannot be determined;
/// callers typically react by uninstalling so the device falls back to the
/// system baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstalledDistro {
    /// No distro is installed.
    Absent,

    /// A distro is installed and identifies itself with this version.
    Valid(DistroVersion),

    /// A distro directory exists but its version file is missing or
    /// unreadable.
    Corrupt(String),
}

impl InstalledDistro {
    /// The installed version, if one is readable.
    pub fn version(&self) -> Option<&DistroVersion> {
        match self {
            Self::Valid(version) => Some(version),
            _ => None,
        }
    }

    /// Check whether no distro is installed.
    pub fn is_absent(&self) -> bool {
        *self == Self::Absent
    }
}

/// Installs, replaces and removes time zone distros under one root.
///
/// The installer is parameterized over [`FileOps`] so tests can fault any
/// single filesystem step; production code uses [`DistroInstaller::new`],
/// which runs on [`StdFileOps`].
///
/// # Example
///
/// ```no_run
/// use tzdistro::installer::DistroInstaller;
///
/// let installer = DistroInstaller::new(
///     "/system/usr/share/zoneinfo/tzdata",
///     "/data/misc/zoneinfo",
/// );
/// let installed = installer.installed_distro()?;
/// println!("installed: {:?}", installed);
/// # Ok::<(), tzdistro::installer::InstallerError>(())
/// ```
#[derive(Debug)]
pub struct DistroInstaller<F: FileOps = StdFileOps> {
    system_tzdata_file: PathBuf,
    install_root: PathBuf,
    current_dir: PathBuf,
    working_dir: PathBuf,
    old_dir: PathBuf,
    journal: SwapJournal,
    file_ops: F,
}

impl DistroInstaller<StdFileOps> {
    /// Create an installer using the real filesystem.
    pub fn new(system_tzdata_file: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self::with_file_ops(system_tzdata_file, install_root, StdFileOps)
    }
}

impl<F: FileOps> DistroInstaller<F> {
    /// Create an installer with injected filesystem operations.
    pub fn with_file_ops(
        system_tzdata_file: impl Into<PathBuf>,
        install_root: impl Into<PathBuf>,
        file_ops: F,
    ) -> Self {
        let install_root = install_root.into();
        Self {
            system_tzdata_file: system_tzdata_file.into(),
            current_dir: install_root.join(CURRENT_DIR_NAME),
            working_dir: install_root.join(WORKING_DIR_NAME),
            old_dir: install_root.join(OLD_DIR_NAME),
            journal: SwapJournal::for_root(&install_root),
            install_root,
            file_ops,
        }
    }

    /// The root directory holding the distro slots.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// The read-only system baseline rules file.
    pub fn system_tzdata_file(&self) -> &Path {
        &self.system_tzdata_file
    }

    /// The directory holding the live distro when one is installed.
    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// The staging directory. Only populated mid-install.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The previous distro's directory. Only populated mid-promotion.
    pub fn old_dir(&self) -> &Path {
        &self.old_dir
    }

    /// Install a distro, reporting success as a boolean.
    ///
    /// Shorthand for [`DistroInstaller::install_with_outcome`] when the
    /// caller does not care why a distro was rejected.
    pub fn install(&self, distro: &DistroArchive) -> InstallerResult<bool> {
        Ok(self.install_with_outcome(distro)?.is_success())
    }

    /// Install a distro, reporting the detailed outcome.
    ///
    /// The distro is unpacked into the staging directory and checked before
    /// anything visible changes. On success the staged distro atomically
    /// replaces the live one. On any non-success outcome or error the
    /// previously installed distro is preserved, and staging leftovers are
    /// cleaned up best-effort.
    pub fn install_with_outcome(&self, distro: &DistroArchive) -> InstallerResult<InstallOutcome> {
        info!(
            root = %self.install_root.display(),
            payload_bytes = distro.len(),
            "Starting distro install"
        );
        self.recover_interrupted_swap()?;

        // Staging leftovers from an earlier failed call would make the
        // promotion renames ambiguous, so failing to clear them is a hard
        // error.
        self.delete_hard(&self.old_dir)?;
        self.delete_hard(&self.working_dir)?;

        let mut guard = CleanupGuard::new(self);

        // Archive damage is the payload's fault and rejected; only disk
        // failures while writing entries become hard errors.
        let entries = match distro.extract_to(&self.working_dir) {
            Ok(entries) => entries,
            Err(DistroError::Io { path, source }) => {
                return Err(InstallerError::WriteFailed { path, source });
            }
            Err(e) => {
                info!(error = %e, "Distro rejected: malformed archive");
                return Ok(InstallOutcome::BadDistroStructure);
            }
        };
        debug!(entries, dir = %self.working_dir.display(), "Unpacked distro into staging");

        let distro_version = match self.read_staged_version()? {
            Ok(version) => version,
            Err(reason) => {
                info!(reason = %reason, "Distro rejected: bad version file");
                return Ok(InstallOutcome::BadDistroStructure);
            }
        };
        debug!(version = %distro_version, "Read staged distro version");

        if !distro_version.is_compatible() {
            info!(version = %distro_version, "Distro rejected: incompatible format version");
            return Ok(InstallOutcome::BadFormatVersion);
        }

        for name in [TZDATA_FILE_NAME, ICU_DATA_FILE_NAME] {
            let path = self.working_dir.join(name);
            if !self.file_ops.exists(&path) {
                info!(file = %path.display(), "Distro rejected: required file missing");
                return Ok(InstallOutcome::BadDistroStructure);
            }
        }

        let system_rules = self.system_rules_version()?;
        if distro_version.rules_version.as_str() < system_rules.as_str() {
            info!(
                distro_rules = %distro_version.rules_version,
                system_rules = %system_rules,
                "Distro rejected: rules older than system baseline"
            );
            return Ok(InstallOutcome::RulesTooOld);
        }
        debug!(
            distro_rules = %distro_version.rules_version,
            system_rules = %system_rules,
            "Rules version check passed"
        );

        let staged_tzdata = self.working_dir.join(TZDATA_FILE_NAME);
        if let Err(e) = RulesData::load(&staged_tzdata).and_then(|rules| rules.validate()) {
            info!(error = %e, "Distro rejected: staged rules data failed validation");
            return Ok(InstallOutcome::ValidationFailed);
        }
        debug!("Staged rules data validated");

        self.promote_staged(&mut guard)?;
        info!(version = %distro_version, "Distro installed");
        Ok(InstallOutcome::Installed)
    }

    /// Remove the installed distro so the device falls back to the system
    /// baseline.
    ///
    /// Returns `false` when there was nothing to uninstall. Removal reuses
    /// the `old/` slot: the live directory is renamed aside first, so even
    /// an interrupted uninstall never leaves a partially deleted distro in
    /// place.
    pub fn uninstall(&self) -> InstallerResult<bool> {
        info!(root = %self.install_root.display(), "Starting distro uninstall");
        self.recover_interrupted_swap()?;

        self.delete_hard(&self.old_dir)?;

        if !self.file_ops.exists(&self.current_dir) {
            debug!("No distro installed; nothing to uninstall");
            return Ok(false);
        }

        self.file_ops
            .rename(&self.current_dir, &self.old_dir)
            .map_err(|e| InstallerError::RenameFailed {
                from: self.current_dir.clone(),
                to: self.old_dir.clone(),
                source: e,
            })?;
        self.delete_best_effort(&self.old_dir);
        info!("Distro uninstalled");
        Ok(true)
    }

    /// Report what is installed in the `current/` slot.
    ///
    /// A read-only query: it performs no recovery and no cleanup, so it is
    /// safe to call while another component may be mid-install.
    pub fn installed_distro(&self) -> InstallerResult<InstalledDistro> {
        if !self.file_ops.exists(&self.current_dir) {
            return Ok(InstalledDistro::Absent);
        }
        let version_file = self.current_dir.join(DISTRO_VERSION_FILE_NAME);
        let bytes = match self
            .file_ops
            .read_fixed_length(&version_file, DISTRO_VERSION_FILE_LENGTH)
        {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(InstalledDistro::Corrupt(
                    "distro version file missing".to_string(),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(InstalledDistro::Corrupt(
                    "distro version file truncated".to_string(),
                ));
            }
            Err(e) => {
                return Err(InstallerError::ReadFailed {
                    path: version_file,
                    source: e,
                });
            }
        };
        match DistroVersion::from_bytes(&bytes) {
            Ok(version) => Ok(InstalledDistro::Valid(version)),
            Err(e) => Ok(InstalledDistro::Corrupt(e.to_string())),
        }
    }

    /// Read the rules version of the system baseline file, e.g. `2016a`.
    ///
    /// The baseline is part of the device image; its absence is an
    /// environment failure, not an acceptable state.
    pub fn system_rules_version(&self) -> InstallerResult<String> {
        if !self.file_ops.exists(&self.system_tzdata_file) {
            return Err(InstallerError::SystemRulesMissing {
                path: self.system_tzdata_file.clone(),
            });
        }
        RulesData::version_of(&self.system_tzdata_file).map_err(|e| match e {
            TzDataError::ReadFailed { path, source } => {
                InstallerError::ReadFailed { path, source }
            }
            other => InstallerError::SystemRulesInvalid {
                path: self.system_tzdata_file.clone(),
                reason: other.to_string(),
            },
        })
    }

    /// Check for an interrupted promotion and put the root back into a
    /// consistent state.
    ///
    /// Runs at the start of every mutating operation. A journal with no
    /// live distro means the crash hit between the two promotion renames;
    /// the moved-aside directory is still the real data and is restored. A
    /// journal alongside a live distro is stale and simply cleared.
    fn recover_interrupted_swap(&self) -> InstallerResult<()> {
        if !self.journal.exists(&self.file_ops) {
            return Ok(());
        }
        let record = self.journal.read();
        warn!(
            journal = %self.journal.path().display(),
            started_at = ?record.as_ref().map(|r| r.started_at),
            "Found swap journal from an interrupted promotion"
        );

        if !self.file_ops.exists(&self.current_dir) {
            if self.file_ops.exists(&self.old_dir) {
                info!(
                    from = %self.old_dir.display(),
                    to = %self.current_dir.display(),
                    "Restoring previous distro after interrupted promotion"
                );
                self.file_ops
                    .rename(&self.old_dir, &self.current_dir)
                    .map_err(|e| InstallerError::RenameFailed {
                        from: self.old_dir.clone(),
                        to: self.current_dir.clone(),
                        source: e,
                    })?;
            } else {
                warn!("Swap journal present but no distro to restore");
            }
        }

        self.journal
            .finish(&self.file_ops)
            .map_err(|e| InstallerError::DeleteFailed {
                path: self.journal.path().to_path_buf(),
                source: e,
            })
    }

    /// Atomically replace the live distro with the staged one.
    fn promote_staged(&self, guard: &mut CleanupGuard<'_, F>) -> InstallerResult<()> {
        self.file_ops
            .make_world_readable(&self.working_dir)
            .map_err(|e| InstallerError::SetPermissionsFailed {
                path: self.working_dir.clone(),
                source: e,
            })?;

        // From here until the journal is cleared, the moved-aside previous
        // distro must survive any exit for recovery to restore it.
        guard.swap_in_flight = true;
        self.journal
            .begin(&self.file_ops)
            .map_err(|e| InstallerError::WriteFailed {
                path: self.journal.path().to_path_buf(),
                source: e,
            })?;

        if self.file_ops.exists(&self.current_dir) {
            self.file_ops
                .rename(&self.current_dir, &self.old_dir)
                .map_err(|e| InstallerError::RenameFailed {
                    from: self.current_dir.clone(),
                    to: self.old_dir.clone(),
                    source: e,
                })?;
        }
        self.file_ops
            .rename(&self.working_dir, &self.current_dir)
            .map_err(|e| InstallerError::RenameFailed {
                from: self.working_dir.clone(),
                to: self.current_dir.clone(),
                source: e,
            })?;

        // The swap is complete. A journal that cannot be removed now is
        // merely stale; the next mutating call clears it.
        if let Err(e) = self.journal.finish(&self.file_ops) {
            warn!(
                journal = %self.journal.path().display(),
                error = %e,
                "Failed to clear swap journal after successful promotion"
            );
        }
        guard.swap_in_flight = false;
        Ok(())
    }

    fn read_staged_version(&self) -> InstallerResult<Result<DistroVersion, String>> {
        let version_file = self.working_dir.join(DISTRO_VERSION_FILE_NAME);
        let bytes = match self
            .file_ops
            .read_fixed_length(&version_file, DISTRO_VERSION_FILE_LENGTH)
        {
            Ok(bytes) => bytes,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::UnexpectedEof) => {
                return Ok(Err(format!("{}: {}", version_file.display(), e)));
            }
            Err(e) => {
                return Err(InstallerError::ReadFailed {
                    path: version_file,
                    source: e,
                });
            }
        };
        match DistroVersion::from_bytes(&bytes) {
            Ok(version) => Ok(Ok(version)),
            Err(e) => Ok(Err(e.to_string())),
        }
    }

    fn delete_hard(&self, path: &Path) -> InstallerResult<()> {
        self.file_ops
            .delete_recursive(path)
            .map_err(|e| InstallerError::DeleteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn delete_best_effort(&self, path: &Path) {
        if let Err(e) = self.file_ops.delete_recursive(path) {
            warn!(path = %path.display(), error = %e, "Best-effort cleanup failed");
        }
    }
}

/// Cleans up staging directories on every exit from an install attempt.
///
/// While a swap is in flight the `old/` directory is the only copy of the
/// previous distro, so cleanup must leave it (and the journal) alone for
/// recovery; otherwise both staging slots are cleared.
struct CleanupGuard<'a, F: FileOps> {
    installer: &'a DistroInstaller<F>,
    swap_in_flight: bool,
}

impl<'a, F: FileOps> CleanupGuard<'a, F> {
    fn new(installer: &'a DistroInstaller<F>) -> Self {
        Self {
            installer,
            swap_in_flight: false,
        }
    }
}

impl<F: FileOps> Drop for CleanupGuard<'_, F> {
    fn drop(&mut self) {
        if !self.swap_in_flight {
            self.installer.delete_best_effort(&self.installer.old_dir);
        }
        self.installer
            .delete_best_effort(&self.installer.working_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::DistroBuilder;
    use std::fs;
    use tempfile::TempDir;

    fn version() -> DistroVersion {
        DistroVersion::new(1, 1, "2016a", 1).unwrap()
    }

    /// Installer rooted inside a temp directory, system file uncreated.
    fn installer(temp: &TempDir) -> DistroInstaller {
        DistroInstaller::new(temp.path().join("tzdata"), temp.path().join("zoneinfo"))
    }

    fn create_current(installer: &DistroInstaller, version_bytes: &[u8]) {
        let current = installer.install_root().join(CURRENT_DIR_NAME);
        fs::create_dir_all(&current).unwrap();
        fs::write(current.join(DISTRO_VERSION_FILE_NAME), version_bytes).unwrap();
    }

    fn create_journal(installer: &DistroInstaller) {
        fs::create_dir_all(installer.install_root()).unwrap();
        fs::write(installer.install_root().join(SWAP_JOURNAL_FILE_NAME), "x").unwrap();
    }

    #[test]
    fn test_install_outcome_codes() {
        assert_eq!(InstallOutcome::Installed.code(), 0);
        assert_eq!(InstallOutcome::BadDistroStructure.code(), 1);
        assert_eq!(InstallOutcome::BadFormatVersion.code(), 2);
        assert_eq!(InstallOutcome::RulesTooOld.code(), 3);
        assert_eq!(InstallOutcome::ValidationFailed.code(), 4);

        assert!(InstallOutcome::Installed.is_success());
        assert!(!InstallOutcome::RulesTooOld.is_success());
    }

    #[test]
    fn test_installed_distro_helpers() {
        let valid = InstalledDistro::Valid(version());
        assert_eq!(valid.version(), Some(&version()));
        assert!(!valid.is_absent());

        assert_eq!(InstalledDistro::Absent.version(), None);
        assert!(InstalledDistro::Absent.is_absent());
        assert_eq!(InstalledDistro::Corrupt("x".to_string()).version(), None);
    }

    #[test]
    fn test_installed_distro_absent() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        assert_eq!(installer.installed_distro().unwrap(), InstalledDistro::Absent);
    }

    #[test]
    fn test_installed_distro_valid() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"001.002|2016c|003");

        let installed = installer.installed_distro().unwrap();
        assert_eq!(
            installed.version().unwrap(),
            &DistroVersion::new(1, 2, "2016c", 3).unwrap()
        );
    }

    #[test]
    fn test_installed_distro_corrupt_when_version_file_missing() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        fs::create_dir_all(installer.install_root().join(CURRENT_DIR_NAME)).unwrap();

        assert!(matches!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Corrupt(_)
        ));
    }

    #[test]
    fn test_installed_distro_corrupt_when_version_file_truncated() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"001.0");

        assert!(matches!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Corrupt(_)
        ));
    }

    #[test]
    fn test_installed_distro_corrupt_when_version_file_malformed() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"not a version!!!!");

        assert!(matches!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Corrupt(_)
        ));
    }

    #[test]
    fn test_installed_distro_is_side_effect_free() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_journal(&installer);
        let old = installer.install_root().join(OLD_DIR_NAME);
        fs::create_dir_all(&old).unwrap();

        assert_eq!(installer.installed_distro().unwrap(), InstalledDistro::Absent);

        // Read-only queries leave recovery to the next mutating call.
        assert!(installer
            .install_root()
            .join(SWAP_JOURNAL_FILE_NAME)
            .exists());
        assert!(old.exists());
    }

    #[test]
    fn test_uninstall_nothing_installed() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        assert!(!installer.uninstall().unwrap());
    }

    #[test]
    fn test_uninstall_removes_current() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"001.001|2016a|001");

        assert!(installer.uninstall().unwrap());

        assert!(!installer.install_root().join(CURRENT_DIR_NAME).exists());
        assert!(!installer.install_root().join(OLD_DIR_NAME).exists());
        assert_eq!(installer.installed_distro().unwrap(), InstalledDistro::Absent);
    }

    #[test]
    fn test_uninstall_clears_stale_old_dir() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let old = installer.install_root().join(OLD_DIR_NAME);
        fs::create_dir_all(&old).unwrap();

        assert!(!installer.uninstall().unwrap());
        assert!(!old.exists());
    }

    #[test]
    fn test_install_empty_distro_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new().build_partial().unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();

        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
        assert!(!installer.install_root().join(WORKING_DIR_NAME).exists());
        assert_eq!(installer.installed_distro().unwrap(), InstalledDistro::Absent);
    }

    #[test]
    fn test_install_malformed_version_file_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_entry(DISTRO_VERSION_FILE_NAME, b"not a version!!!!".to_vec())
            .with_tzdata(b"tz".to_vec())
            .with_icu_data(b"icu".to_vec())
            .build_partial()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();
        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
    }

    #[test]
    fn test_install_incompatible_major_version_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_version(DistroVersion::new(2, 1, "2016a", 1).unwrap())
            .with_tzdata(b"tz".to_vec())
            .with_icu_data(b"icu".to_vec())
            .build()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();
        assert_eq!(outcome, InstallOutcome::BadFormatVersion);
    }

    #[test]
    fn test_install_older_minor_version_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_version(DistroVersion::new(1, 0, "2016a", 1).unwrap())
            .with_tzdata(b"tz".to_vec())
            .with_icu_data(b"icu".to_vec())
            .build()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();
        assert_eq!(outcome, InstallOutcome::BadFormatVersion);
    }

    #[test]
    fn test_install_missing_tzdata_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_version(version())
            .with_icu_data(b"icu".to_vec())
            .build_partial()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();
        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
    }

    #[test]
    fn test_install_missing_icu_data_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_version(version())
            .with_tzdata(b"tz".to_vec())
            .build_partial()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();
        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
    }

    #[test]
    fn test_install_rejection_preserves_current() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"001.001|2016a|001");
        let distro = DistroBuilder::new()
            .with_version(DistroVersion::new(2, 1, "2020a", 1).unwrap())
            .with_tzdata(b"tz".to_vec())
            .with_icu_data(b"icu".to_vec())
            .build()
            .unwrap();

        let outcome = installer.install_with_outcome(&distro).unwrap();

        assert_eq!(outcome, InstallOutcome::BadFormatVersion);
        assert_eq!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Valid(version())
        );
    }

    #[test]
    fn test_install_missing_system_baseline_is_error() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let distro = DistroBuilder::new()
            .with_version(version())
            .with_tzdata(b"tz".to_vec())
            .with_icu_data(b"icu".to_vec())
            .build()
            .unwrap();

        let err = installer.install_with_outcome(&distro).unwrap_err();

        assert!(matches!(err, InstallerError::SystemRulesMissing { .. }));
        // The hard error still cleans up the staging directory.
        assert!(!installer.install_root().join(WORKING_DIR_NAME).exists());
    }

    #[test]
    fn test_install_recovers_interrupted_promotion() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        // Crash state: journal present, current missing, previous distro
        // stranded in old/.
        create_journal(&installer);
        let old = installer.install_root().join(OLD_DIR_NAME);
        fs::create_dir_all(&old).unwrap();
        fs::write(old.join(DISTRO_VERSION_FILE_NAME), b"001.001|2016a|001").unwrap();

        let distro = DistroBuilder::new().build_partial().unwrap();
        let outcome = installer.install_with_outcome(&distro).unwrap();

        // The empty payload is still rejected, but recovery first put the
        // stranded distro back.
        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
        assert_eq!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Valid(version())
        );
        assert!(!installer
            .install_root()
            .join(SWAP_JOURNAL_FILE_NAME)
            .exists());
        assert!(!old.exists());
    }

    #[test]
    fn test_install_clears_stale_journal_when_current_is_live() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_current(&installer, b"001.001|2016a|001");
        create_journal(&installer);

        let distro = DistroBuilder::new().build_partial().unwrap();
        let outcome = installer.install_with_outcome(&distro).unwrap();

        assert_eq!(outcome, InstallOutcome::BadDistroStructure);
        assert!(!installer
            .install_root()
            .join(SWAP_JOURNAL_FILE_NAME)
            .exists());
        assert_eq!(
            installer.installed_distro().unwrap(),
            InstalledDistro::Valid(version())
        );
    }

    #[test]
    fn test_uninstall_recovers_interrupted_promotion() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        create_journal(&installer);
        let old = installer.install_root().join(OLD_DIR_NAME);
        fs::create_dir_all(&old).unwrap();
        fs::write(old.join(DISTRO_VERSION_FILE_NAME), b"001.001|2016a|001").unwrap();

        // The restored distro is what gets uninstalled.
        assert!(installer.uninstall().unwrap());
        assert_eq!(installer.installed_distro().unwrap(), InstalledDistro::Absent);
        assert!(!installer
            .install_root()
            .join(SWAP_JOURNAL_FILE_NAME)
            .exists());
    }

    #[test]
    fn test_system_rules_version_missing_file() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        let err = installer.system_rules_version().unwrap_err();
        assert!(matches!(err, InstallerError::SystemRulesMissing { .. }));
    }

    #[test]
    fn test_installer_paths() {
        let installer = DistroInstaller::new("/system/tzdata", "/data/zoneinfo");

        assert_eq!(installer.system_tzdata_file(), Path::new("/system/tzdata"));
        assert_eq!(installer.install_root(), Path::new("/data/zoneinfo"));
    }
}
