//! Swap journal marking an in-flight directory promotion.
//!
//! Promotion of a staged distro is two renames: the live directory moves
//! aside, then the staged directory moves into its place. A crash between
//! the two leaves the device with no live distro. The journal file brackets
//! that window: it is written immediately before the first rename and
//! removed immediately after the second. Finding one on a later run means a
//! promotion was interrupted and the moved-aside directory, if present, is
//! still the real live data.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::fs::FileOps;

/// Journal filename inside the installer root.
pub const SWAP_JOURNAL_FILE_NAME: &str = ".swap-journal";

/// Journal header line.
const JOURNAL_HEADER: &str = "TZDISTRO SWAP JOURNAL";

/// Current journal format version.
const JOURNAL_FORMAT_VERSION: &str = "1";

/// Marker file bracketing the promotion rename pair.
#[derive(Debug, Clone)]
pub struct SwapJournal {
    path: PathBuf,
}

/// Parsed journal contents, used for diagnostics.
#[derive(Debug, Clone)]
pub struct JournalRecord {
    /// Journal format version.
    pub format_version: String,

    /// When the interrupted promotion started.
    pub started_at: DateTime<Utc>,
}

impl SwapJournal {
    /// The journal location for an installer root.
    pub fn for_root(install_root: &Path) -> Self {
        Self {
            path: install_root.join(SWAP_JOURNAL_FILE_NAME),
        }
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a journal is present.
    pub fn exists(&self, ops: &impl FileOps) -> bool {
        ops.exists(&self.path)
    }

    /// Write the journal. Called immediately before the first promotion
    /// rename; once this returns, recovery treats the swap as in flight.
    pub fn begin(&self, ops: &impl FileOps) -> io::Result<()> {
        let content = format!(
            "{}\n{}\n{}\n",
            JOURNAL_HEADER,
            JOURNAL_FORMAT_VERSION,
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        ops.write_file(&self.path, content.as_bytes())
    }

    /// Remove the journal after the promotion renames have both completed.
    pub fn finish(&self, ops: &impl FileOps) -> io::Result<()> {
        ops.remove_file(&self.path)
    }

    /// Parse the journal contents for log output.
    ///
    /// Recovery decisions rest solely on the journal's existence; the
    /// contents are informational, so this reads the filesystem directly
    /// and any unreadable or malformed journal simply yields `None`.
    pub fn read(&self) -> Option<JournalRecord> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let mut lines = content.lines();
        if lines.next()?.trim() != JOURNAL_HEADER {
            return None;
        }
        let format_version = lines.next()?.trim().to_string();
        let started_at = DateTime::parse_from_rfc3339(lines.next()?.trim())
            .ok()?
            .with_timezone(&Utc);
        Some(JournalRecord {
            format_version,
            started_at,
        })
    }
}
