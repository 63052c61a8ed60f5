//! Time zone distro format: version codec, archive packing and unpacking.
//!
//! A *distro* is a self-contained, versioned bundle of compiled time zone
//! data. It is produced by a packaging host, shipped to devices as a single
//! gzip-compressed archive, and unpacked by the installer into a staging
//! directory before validation and promotion.
//!
//! # Distro contents
//!
//! Every distro contains at least three files:
//!
//! - `distro_version` - fixed-length version file identifying the distro
//!   format version, the IANA rules version and a packaging revision
//! - `tzdata` - compiled time zone rules consumed by the platform
//! - `icu/icu_tzdata.dat` - ICU time zone overlay data
//!
//! # Type overview
//!
//! - [`DistroVersion`]: parsed version file with format compatibility checks
//! - [`DistroArchive`]: a distro payload held in memory, unpacked with
//!   [`DistroArchive::extract_to`]
//! - [`DistroBuilder`]: assembles archive bytes for packaging and tests

mod archive;
mod builder;
mod version;

pub use archive::DistroArchive;
pub use builder::DistroBuilder;
pub use version::{
    DistroVersion, DISTRO_VERSION_FILE_LENGTH, SUPPORTED_FORMAT_MAJOR_VERSION,
    SUPPORTED_FORMAT_MINOR_VERSION,
};

use std::path::PathBuf;

use thiserror::Error;

/// Name of the version file inside a distro.
pub const DISTRO_VERSION_FILE_NAME: &str = "distro_version";

/// Name of the compiled time zone rules file inside a distro.
pub const TZDATA_FILE_NAME: &str = "tzdata";

/// Name of the ICU overlay data file inside a distro.
pub const ICU_DATA_FILE_NAME: &str = "icu/icu_tzdata.dat";

/// Convenience alias for distro format operations.
pub type DistroResult<T> = Result<T, DistroError>;

/// Errors raised while encoding or decoding distro contents.
#[derive(Debug, Error)]
pub enum DistroError {
    /// A version field is out of range or malformed.
    #[error("invalid distro version: {0}")]
    InvalidVersion(String),

    /// The version file bytes do not match the expected fixed-length layout.
    #[error("malformed distro version file: {0}")]
    MalformedVersionFile(String),

    /// The archive bytes are not a well-formed distro archive.
    #[error("malformed distro archive: {0}")]
    MalformedArchive(String),

    /// An archive entry name would escape the extraction directory.
    #[error("unsafe archive entry name {name:?}: {reason}")]
    UnsafeEntryName { name: String, reason: String },

    /// A required entry was not supplied to the builder.
    #[error("distro is missing required entry '{0}'")]
    MissingEntry(&'static str),

    /// An entry body is too large for the archive framing.
    #[error("entry {name:?} is too large to frame ({bytes} bytes)")]
    OversizedEntry { name: String, bytes: u64 },

    /// The archive encoder failed while framing entries.
    #[error("distro archive encode error: {0}")]
    EncodeFailed(String),

    /// I/O error while reading or writing archive contents.
    #[error("distro archive I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
