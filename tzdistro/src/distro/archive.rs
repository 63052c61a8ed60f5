//! Distro archive reading and extraction.
//!
//! Distros travel as a single gzip-compressed byte stream framing a flat
//! list of named entries:
//!
//! ```text
//! archive := gzip( entry* )
//! entry   := name_len:u16be  name:[u8; name_len]
//!            data_len:u32be  data:[u8; data_len]
//! ```
//!
//! Entry names use `/` as the separator and are validated before any file is
//! created, so a hostile archive cannot write outside the extraction
//! directory. Extraction streams entry data in fixed-size chunks; a claimed
//! entry length never causes a matching allocation.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use super::{DistroError, DistroResult};

/// Longest entry name accepted in an archive.
const MAX_ENTRY_NAME_LENGTH: usize = 256;

/// Chunk size used when streaming entry data to disk.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// A distro payload held in memory.
///
/// Wraps the raw archive bytes handed over by an update component and
/// unpacks them into a staging directory with [`DistroArchive::extract_to`].
/// The archive itself is never written to disk.
#[derive(Debug, Clone)]
pub struct DistroArchive {
    bytes: Vec<u8>,
}

impl DistroArchive {
    /// Wrap raw archive bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Size of the compressed archive in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether the archive holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the compressed archive bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Unpack every entry into `target_dir`, creating it if needed.
    ///
    /// Parent directories of nested entries are created on demand. Returns
    /// the number of entries written.
    ///
    /// Entry names are validated before extraction: absolute paths, `.` and
    /// `..` segments, backslashes and non-printable characters are all
    /// rejected with [`DistroError::UnsafeEntryName`].
    pub fn extract_to(&self, target_dir: &Path) -> DistroResult<usize> {
        fs::create_dir_all(target_dir).map_err(|e| DistroError::Io {
            path: target_dir.to_path_buf(),
            source: e,
        })?;

        let mut reader = GzDecoder::new(&self.bytes[..]);
        let mut count = 0;

        while let Some(name_len) = read_entry_name_length(&mut reader)? {
            if name_len == 0 || name_len > MAX_ENTRY_NAME_LENGTH {
                return Err(DistroError::MalformedArchive(format!(
                    "entry name length {} outside 1..={}",
                    name_len, MAX_ENTRY_NAME_LENGTH
                )));
            }

            let mut name_bytes = vec![0u8; name_len];
            read_exact_archive(&mut reader, &mut name_bytes, "entry name")?;
            let name = String::from_utf8(name_bytes).map_err(|_| {
                DistroError::MalformedArchive("entry name is not valid UTF-8".to_string())
            })?;
            let entry_path = safe_entry_path(target_dir, &name)?;

            let mut len_bytes = [0u8; 4];
            read_exact_archive(&mut reader, &mut len_bytes, "entry length")?;
            let data_len = u32::from_be_bytes(len_bytes) as u64;

            write_entry(&mut reader, &name, &entry_path, data_len)?;
            debug!(entry = %name, bytes = data_len, "Extracted distro entry");
            count += 1;
        }

        Ok(count)
    }
}

/// Read the 2-byte name length of the next entry.
///
/// A clean end of stream before the first byte means the archive is
/// exhausted; anything in between is a truncated archive.
fn read_entry_name_length(reader: &mut impl Read) -> DistroResult<Option<usize>> {
    let mut len_bytes = [0u8; 2];
    let mut filled = 0;
    while filled < len_bytes.len() {
        let n = reader
            .read(&mut len_bytes[filled..])
            .map_err(map_decode_error)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    match filled {
        0 => Ok(None),
        2 => Ok(Some(u16::from_be_bytes(len_bytes) as usize)),
        _ => Err(DistroError::MalformedArchive(
            "archive ended inside an entry header".to_string(),
        )),
    }
}

fn read_exact_archive(reader: &mut impl Read, buf: &mut [u8], what: &str) -> DistroResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DistroError::MalformedArchive(format!("archive ended inside {}", what))
        } else {
            map_decode_error(e)
        }
    })
}

/// Errors surfaced while inflating an in-memory buffer are corruption, not
/// real I/O.
fn map_decode_error(e: io::Error) -> DistroError {
    DistroError::MalformedArchive(format!("gzip stream error: {}", e))
}

/// Stream `data_len` bytes of entry data into `entry_path`.
fn write_entry(
    reader: &mut impl Read,
    name: &str,
    entry_path: &Path,
    data_len: u64,
) -> DistroResult<()> {
    if let Some(parent) = entry_path.parent() {
        fs::create_dir_all(parent).map_err(|e| DistroError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = File::create(entry_path).map_err(|e| DistroError::Io {
        path: entry_path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; WRITE_BUFFER_SIZE];
    let mut remaining = data_len;

    while remaining > 0 {
        let want = remaining.min(WRITE_BUFFER_SIZE as u64) as usize;
        let n = reader.read(&mut buffer[..want]).map_err(map_decode_error)?;
        if n == 0 {
            return Err(DistroError::MalformedArchive(format!(
                "archive ended inside entry {:?} with {} bytes unread",
                name, remaining
            )));
        }
        writer.write_all(&buffer[..n]).map_err(|e| DistroError::Io {
            path: entry_path.to_path_buf(),
            source: e,
        })?;
        remaining -= n as u64;
    }

    writer.flush().map_err(|e| DistroError::Io {
        path: entry_path.to_path_buf(),
        source: e,
    })
}

/// Check that an entry name cannot escape the extraction directory.
///
/// Used both when unpacking received archives and when framing new ones, so
/// a packaging host rejects a bad name before it ever ships.
pub(super) fn validate_entry_name(name: &str) -> DistroResult<()> {
    let reject = |reason: &str| {
        Err(DistroError::UnsafeEntryName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("is empty");
    }
    if name.len() > MAX_ENTRY_NAME_LENGTH {
        return reject("exceeds the maximum entry name length");
    }
    if !name.is_ascii() {
        return reject("contains non-ASCII characters");
    }
    if name.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return reject("contains control characters");
    }
    if name.contains('\\') {
        return reject("contains a backslash separator");
    }
    if name.starts_with('/') {
        return reject("is an absolute path");
    }
    for segment in name.split('/') {
        match segment {
            "" => return reject("contains an empty path segment"),
            "." | ".." => return reject("contains a relative path segment"),
            _ => {}
        }
    }
    Ok(())
}

/// Resolve an entry name to a path strictly beneath `target_dir`.
fn safe_entry_path(target_dir: &Path, name: &str) -> DistroResult<PathBuf> {
    validate_entry_name(name)?;
    let mut path = target_dir.to_path_buf();
    for segment in name.split('/') {
        path.push(segment);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    /// Frame and compress entries the way a packaging host would.
    fn gz_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for (name, data) in entries {
            encoder
                .write_all(&(name.len() as u16).to_be_bytes())
                .unwrap();
            encoder.write_all(name.as_bytes()).unwrap();
            encoder
                .write_all(&(data.len() as u32).to_be_bytes())
                .unwrap();
            encoder.write_all(data).unwrap();
        }
        encoder.finish().unwrap()
    }

    #[test]
    fn test_extract_single_entry() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(gz_archive(&[("tzdata", b"rules bytes")]));

        let count = archive.extract_to(temp.path()).unwrap();

        assert_eq!(count, 1);
        let content = fs::read(temp.path().join("tzdata")).unwrap();
        assert_eq!(content, b"rules bytes");
    }

    #[test]
    fn test_extract_nested_entry_creates_directories() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(gz_archive(&[
            ("distro_version", b"001.001|2016a|001"),
            ("icu/icu_tzdata.dat", b"icu bytes"),
        ]));

        let count = archive.extract_to(temp.path()).unwrap();

        assert_eq!(count, 2);
        assert!(temp.path().join("icu").is_dir());
        let content = fs::read(temp.path().join("icu/icu_tzdata.dat")).unwrap();
        assert_eq!(content, b"icu bytes");
    }

    #[test]
    fn test_extract_creates_target_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("working");
        let archive = DistroArchive::new(gz_archive(&[("tzdata", b"x")]));

        archive.extract_to(&target).unwrap();

        assert!(target.join("tzdata").is_file());
    }

    #[test]
    fn test_extract_empty_archive() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(gz_archive(&[]));

        let count = archive.extract_to(temp.path()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_extract_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(gz_archive(&[("../evil", b"x")]));

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::UnsafeEntryName { .. }));
        assert!(!temp.path().parent().unwrap().join("evil").exists());
    }

    #[test]
    fn test_extract_rejects_absolute_path() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(gz_archive(&[("/etc/evil", b"x")]));

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::UnsafeEntryName { .. }));
    }

    #[test]
    fn test_extract_rejects_backslash_and_inner_traversal() {
        let temp = TempDir::new().unwrap();

        for name in ["a\\b", "a/../b", "a//b", "./a", "a/."] {
            let archive = DistroArchive::new(gz_archive(&[(name, b"x")]));
            let err = archive.extract_to(temp.path()).unwrap_err();
            assert!(
                matches!(err, DistroError::UnsafeEntryName { .. }),
                "expected {:?} to be rejected",
                name
            );
        }
    }

    #[test]
    fn test_extract_rejects_non_gzip_bytes() {
        let temp = TempDir::new().unwrap();
        let archive = DistroArchive::new(b"definitely not gzip".to_vec());

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::MalformedArchive(_)));
    }

    #[test]
    fn test_extract_rejects_truncated_entry_data() {
        let temp = TempDir::new().unwrap();

        // Claim 100 bytes of data but only provide 4.
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&(6u16).to_be_bytes()).unwrap();
        encoder.write_all(b"tzdata").unwrap();
        encoder.write_all(&(100u32).to_be_bytes()).unwrap();
        encoder.write_all(b"shrt").unwrap();
        let archive = DistroArchive::new(encoder.finish().unwrap());

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::MalformedArchive(_)));
    }

    #[test]
    fn test_extract_rejects_trailing_garbage() {
        let temp = TempDir::new().unwrap();

        // A valid entry followed by a lone byte where the next header should be.
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&(1u16).to_be_bytes()).unwrap();
        encoder.write_all(b"a").unwrap();
        encoder.write_all(&(1u32).to_be_bytes()).unwrap();
        encoder.write_all(b"x").unwrap();
        encoder.write_all(&[0u8]).unwrap();
        let archive = DistroArchive::new(encoder.finish().unwrap());

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::MalformedArchive(_)));
    }

    #[test]
    fn test_extract_rejects_oversized_entry_name() {
        let temp = TempDir::new().unwrap();
        let long_name = "n".repeat(MAX_ENTRY_NAME_LENGTH + 1);
        let archive = DistroArchive::new(gz_archive(&[(long_name.as_str(), b"x")]));

        let err = archive.extract_to(temp.path()).unwrap_err();
        assert!(matches!(err, DistroError::MalformedArchive(_)));
    }

    #[test]
    fn test_archive_len() {
        let bytes = gz_archive(&[("tzdata", b"x")]);
        let archive = DistroArchive::new(bytes.clone());

        assert_eq!(archive.len(), bytes.len());
        assert!(!archive.is_empty());
        assert!(DistroArchive::new(Vec::new()).is_empty());
    }
}
