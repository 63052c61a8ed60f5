//! Compiled time zone rules ("tzdata") parsing and validation.
//!
//! The platform ships compiled rules as a single `tzdata` file:
//!
//! ```text
//! header:  "tzdata" version[5] '\0'                      (12 bytes)
//!          index_offset:u32be data_offset:u32be final_offset:u32be
//! index:   52-byte records between index_offset and data_offset,
//!          each: zone id[40] (NUL padded), entry offset:u32be,
//!          entry length:u32be, legacy raw GMT offset:u32be
//! data:    concatenated TZif blobs between data_offset and final_offset
//! ```
//!
//! Entry offsets are relative to the data section. Zone ids must be sorted
//! so readers can binary search the index.
//!
//! [`RulesData::load`] checks the header and index shape and keeps the file
//! in memory; [`RulesData::validate`] additionally locates every indexed
//! zone and checks its TZif header. The installer runs both against an
//! unpacked distro before promoting it, so a distro that would leave the
//! device without working rules is rejected up front.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Convenience alias for rules data operations.
pub type TzDataResult<T> = Result<T, TzDataError>;

/// Magic string at the start of every rules file.
const TZDATA_MAGIC: &[u8] = b"tzdata";

/// Length of the version header: magic, five version characters, NUL.
const VERSION_HEADER_LENGTH: usize = 12;

/// Length of the full fixed header including the three section offsets.
const HEADER_LENGTH: usize = VERSION_HEADER_LENGTH + 12;

/// Length of one zone index record.
const INDEX_ENTRY_LENGTH: usize = 52;

/// Length of the NUL-padded zone id field inside an index record.
const ZONE_ID_LENGTH: usize = 40;

/// Smallest possible TZif blob: magic, version, reserved bytes and counts.
const TZIF_HEADER_LENGTH: u32 = 44;

/// Errors raised while reading or validating compiled rules data.
#[derive(Debug)]
pub enum TzDataError {
    /// Failed to read the rules file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file does not start with the rules data magic.
    BadMagic { path: PathBuf },

    /// The fixed header is truncated or internally inconsistent.
    MalformedHeader { path: PathBuf, reason: String },

    /// The zone index is structurally invalid.
    MalformedIndex { path: PathBuf, reason: String },

    /// An indexed zone's rule data is missing or unreadable.
    BadZoneData { id: String, reason: String },
}

impl std::fmt::Display for TzDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::BadMagic { path } => {
                write!(f, "{} is not a tzdata file", path.display())
            }
            Self::MalformedHeader { path, reason } => {
                write!(f, "malformed tzdata header in {}: {}", path.display(), reason)
            }
            Self::MalformedIndex { path, reason } => {
                write!(f, "malformed zone index in {}: {}", path.display(), reason)
            }
            Self::BadZoneData { id, reason } => {
                write!(f, "bad rule data for zone {}: {}", id, reason)
            }
        }
    }
}

impl std::error::Error for TzDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One parsed record from the zone index.
#[derive(Debug, Clone)]
struct ZoneIndexEntry {
    id: String,
    /// Offset of the zone's TZif blob, relative to the data section.
    offset: u32,
    /// Length of the zone's TZif blob.
    length: u32,
}

/// A compiled rules file held in memory.
///
/// Loading performs the structural checks that make the index usable:
/// magic, header offsets and index records. [`RulesData::validate`] goes
/// further and checks the rule data of every indexed zone.
pub struct RulesData {
    path: PathBuf,
    bytes: Vec<u8>,
    rules_version: String,
    data_offset: u32,
    final_offset: u32,
    index: Vec<ZoneIndexEntry>,
}

impl RulesData {
    /// Load and structurally check a rules file.
    pub fn load(path: impl Into<PathBuf>) -> TzDataResult<Self> {
        let path = path.into();
        let bytes = std::fs::read(&path).map_err(|e| TzDataError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;

        if bytes.len() < HEADER_LENGTH {
            return Err(TzDataError::MalformedHeader {
                path,
                reason: format!("file is {} bytes, header needs {}", bytes.len(), HEADER_LENGTH),
            });
        }
        let rules_version = parse_version_header(&path, &bytes)?;

        let index_offset = read_be_u32(&bytes, VERSION_HEADER_LENGTH);
        let data_offset = read_be_u32(&bytes, VERSION_HEADER_LENGTH + 4);
        let final_offset = read_be_u32(&bytes, VERSION_HEADER_LENGTH + 8);

        let malformed = |reason: String| TzDataError::MalformedHeader {
            path: path.clone(),
            reason,
        };
        if (index_offset as usize) < HEADER_LENGTH {
            return Err(malformed(format!(
                "index offset {} overlaps the header",
                index_offset
            )));
        }
        if index_offset >= data_offset || data_offset > final_offset {
            return Err(malformed(format!(
                "section offsets not ascending: index {}, data {}, final {}",
                index_offset, data_offset, final_offset
            )));
        }
        if (final_offset as usize) > bytes.len() {
            return Err(malformed(format!(
                "final offset {} beyond end of file ({} bytes)",
                final_offset,
                bytes.len()
            )));
        }
        let index_length = (data_offset - index_offset) as usize;
        if index_length % INDEX_ENTRY_LENGTH != 0 {
            return Err(malformed(format!(
                "index length {} is not a multiple of {}",
                index_length, INDEX_ENTRY_LENGTH
            )));
        }

        let index = parse_index(&path, &bytes, index_offset as usize, data_offset as usize)?;
        debug!(
            path = %path.display(),
            rules_version = %rules_version,
            zones = index.len(),
            "Loaded tzdata"
        );

        Ok(Self {
            path,
            bytes,
            rules_version,
            data_offset,
            final_offset,
            index,
        })
    }

    /// Read just the rules version from a file, e.g. `2016a`.
    ///
    /// Only the 12-byte version header is read, so this is cheap enough to
    /// call on every query against the system baseline file.
    pub fn version_of(path: &Path) -> TzDataResult<String> {
        let mut file = File::open(path).map_err(|e| TzDataError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut header = [0u8; VERSION_HEADER_LENGTH];
        file.read_exact(&mut header)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => TzDataError::MalformedHeader {
                    path: path.to_path_buf(),
                    reason: "file too short for the version header".to_string(),
                },
                _ => TzDataError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                },
            })?;
        parse_version_header(path, &header)
    }

    /// The rules version recorded in the header, e.g. `2016a`.
    pub fn rules_version(&self) -> &str {
        &self.rules_version
    }

    /// Number of zones in the index.
    pub fn zone_count(&self) -> usize {
        self.index.len()
    }

    /// Iterate over the indexed zone ids in index order.
    pub fn zone_ids(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(|entry| entry.id.as_str())
    }

    /// Check the rule data of every indexed zone.
    ///
    /// Each entry must lie inside the data section and start with a sane
    /// TZif header whose counted v1 data block fits inside the entry.
    pub fn validate(&self) -> TzDataResult<()> {
        for entry in &self.index {
            self.validate_entry(entry)?;
        }
        debug!(
            path = %self.path.display(),
            zones = self.index.len(),
            "Validated tzdata zone entries"
        );
        Ok(())
    }

    fn validate_entry(&self, entry: &ZoneIndexEntry) -> TzDataResult<()> {
        let bad = |reason: String| TzDataError::BadZoneData {
            id: entry.id.clone(),
            reason,
        };

        let start = self.data_offset as u64 + entry.offset as u64;
        let end = start + entry.length as u64;
        if end > self.final_offset as u64 {
            return Err(bad(format!(
                "entry at {}..{} runs past the data section end {}",
                start, end, self.final_offset
            )));
        }
        if entry.length < TZIF_HEADER_LENGTH {
            return Err(bad(format!(
                "entry is {} bytes, smaller than a TZif header",
                entry.length
            )));
        }

        let blob = &self.bytes[start as usize..end as usize];
        if &blob[0..4] != b"TZif" {
            return Err(bad("missing TZif magic".to_string()));
        }
        let tzif_version = blob[4];
        if !matches!(tzif_version, 0 | b'2' | b'3' | b'4') {
            return Err(bad(format!("unknown TZif version byte {:#04x}", tzif_version)));
        }

        let isutcnt = read_be_u32(blob, 20) as u64;
        let isstdcnt = read_be_u32(blob, 24) as u64;
        let leapcnt = read_be_u32(blob, 28) as u64;
        let timecnt = read_be_u32(blob, 32) as u64;
        let typecnt = read_be_u32(blob, 36) as u64;
        let charcnt = read_be_u32(blob, 40) as u64;

        if typecnt == 0 {
            return Err(bad("zero zone offset types".to_string()));
        }
        if charcnt == 0 {
            return Err(bad("zero designation characters".to_string()));
        }
        if isutcnt != 0 && isutcnt != typecnt {
            return Err(bad(format!(
                "UT indicator count {} does not match type count {}",
                isutcnt, typecnt
            )));
        }
        if isstdcnt != 0 && isstdcnt != typecnt {
            return Err(bad(format!(
                "standard indicator count {} does not match type count {}",
                isstdcnt, typecnt
            )));
        }

        // Transition times (4) plus type indexes (1) per transition, six
        // bytes per type record, designation chars, eight bytes per leap
        // second record, one byte per indicator.
        let v1_block = timecnt * 5 + typecnt * 6 + charcnt + leapcnt * 8 + isstdcnt + isutcnt;
        if TZIF_HEADER_LENGTH as u64 + v1_block > entry.length as u64 {
            return Err(bad(format!(
                "counted data block ({} bytes) exceeds entry length {}",
                v1_block, entry.length
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for RulesData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesData")
            .field("path", &self.path)
            .field("rules_version", &self.rules_version)
            .field("zones", &self.index.len())
            .finish()
    }
}

/// Parse the 12-byte version header shared by [`RulesData::load`] and
/// [`RulesData::version_of`]. `bytes` must hold at least the header.
fn parse_version_header(path: &Path, bytes: &[u8]) -> TzDataResult<String> {
    if &bytes[0..TZDATA_MAGIC.len()] != TZDATA_MAGIC {
        return Err(TzDataError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    if bytes[VERSION_HEADER_LENGTH - 1] != 0 {
        return Err(TzDataError::MalformedHeader {
            path: path.to_path_buf(),
            reason: "version field is not NUL terminated".to_string(),
        });
    }
    let version_bytes = &bytes[TZDATA_MAGIC.len()..VERSION_HEADER_LENGTH - 1];
    if !version_bytes.iter().all(|b| b.is_ascii_graphic()) {
        return Err(TzDataError::MalformedHeader {
            path: path.to_path_buf(),
            reason: "version field contains non-printable bytes".to_string(),
        });
    }
    // Checked ASCII above, so the conversion cannot fail.
    Ok(String::from_utf8_lossy(version_bytes).into_owned())
}

fn parse_index(
    path: &Path,
    bytes: &[u8],
    index_offset: usize,
    data_offset: usize,
) -> TzDataResult<Vec<ZoneIndexEntry>> {
    let malformed = |reason: String| TzDataError::MalformedIndex {
        path: path.to_path_buf(),
        reason,
    };

    let mut index: Vec<ZoneIndexEntry> =
        Vec::with_capacity((data_offset - index_offset) / INDEX_ENTRY_LENGTH);
    let mut at = index_offset;
    while at < data_offset {
        let record = &bytes[at..at + INDEX_ENTRY_LENGTH];
        let id_field = &record[0..ZONE_ID_LENGTH];
        let id_end = id_field
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed(format!("zone id at offset {} is not NUL padded", at)))?;
        if id_end == 0 {
            return Err(malformed(format!("empty zone id at offset {}", at)));
        }
        let id_bytes = &id_field[0..id_end];
        if !id_bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(malformed(format!(
                "zone id at offset {} contains non-printable bytes",
                at
            )));
        }
        let id = String::from_utf8_lossy(id_bytes).into_owned();

        if let Some(previous) = index.last() {
            if previous.id.as_bytes() >= id.as_bytes() {
                return Err(malformed(format!(
                    "zone ids not strictly ascending: {:?} then {:?}",
                    previous.id, id
                )));
            }
        }

        index.push(ZoneIndexEntry {
            id,
            offset: read_be_u32(record, ZONE_ID_LENGTH),
            length: read_be_u32(record, ZONE_ID_LENGTH + 4),
        });
        at += INDEX_ENTRY_LENGTH;
    }
    Ok(index)
}

/// Read a big-endian u32. Callers must have bounds-checked `at + 4`.
fn read_be_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_be_bytes(word)
}
