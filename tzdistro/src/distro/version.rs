//! Distro version file parsing and formatting.
//!
//! The version file is the first thing the installer inspects in an unpacked
//! distro. It is a fixed-length ASCII file of the form `001.001|2016a|001`:
//! a three-digit format major version, a three-digit format minor version,
//! a five-character IANA rules version and a three-digit packaging revision.
//!
//! The format version pair gates installation: the major version must match
//! the version this library was built for exactly, while the minor version
//! only has to be at least the supported minimum. Minor bumps add data that
//! older readers may ignore; major bumps change the layout incompatibly.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::{DistroError, DistroResult};

/// Distro format major version written by this library.
///
/// Installers reject distros whose major version differs from this value.
pub const SUPPORTED_FORMAT_MAJOR_VERSION: u16 = 1;

/// Lowest distro format minor version this library accepts.
pub const SUPPORTED_FORMAT_MINOR_VERSION: u16 = 1;

/// Exact length in bytes of a serialized version file.
pub const DISTRO_VERSION_FILE_LENGTH: usize = 17;

/// Largest value representable by a three-digit version field.
const MAX_VERSION_FIELD: u16 = 999;

/// Length of a rules version string, e.g. `2016a`.
const RULES_VERSION_LENGTH: usize = 5;

fn version_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Pattern breakdown:
        // (\d{3})   - format major version, zero padded
        // \.        - separator
        // (\d{3})   - format minor version, zero padded
        // \|        - separator
        // (\d{4}\w) - rules version (year + release letter)
        // \|        - separator
        // (\d{3})   - revision, zero padded
        Regex::new(r"^(\d{3})\.(\d{3})\|(\d{4}\w)\|(\d{3})$").unwrap()
    })
}

fn rules_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}\w$").unwrap())
}

/// The parsed contents of a distro version file.
///
/// Identifies the distro format a bundle was packaged with, the IANA rules
/// version it carries and a packaging revision that distinguishes repackaged
/// bundles of the same rules version.
///
/// # Example
///
/// ```
/// use tzdistro::distro::DistroVersion;
///
/// let version = DistroVersion::new(1, 1, "2016a", 2).unwrap();
///
/// assert!(version.is_compatible());
/// assert_eq!(version.to_string(), "001.001|2016a|002");
///
/// let reparsed = DistroVersion::from_bytes(&version.to_bytes()).unwrap();
/// assert_eq!(reparsed, version);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroVersion {
    /// Distro format major version. Readers require an exact match.
    pub format_major_version: u16,

    /// Distro format minor version. Readers accept this value or newer.
    pub format_minor_version: u16,

    /// IANA rules version carried by the distro, e.g. `2016a`.
    pub rules_version: String,

    /// Packaging revision for repackaged distros of the same rules version.
    pub revision: u16,
}

impl DistroVersion {
    /// Create a new version, validating each field.
    ///
    /// Numeric fields must fit in three decimal digits and the rules version
    /// must be four digits followed by a release letter.
    pub fn new(
        format_major_version: u16,
        format_minor_version: u16,
        rules_version: impl Into<String>,
        revision: u16,
    ) -> DistroResult<Self> {
        let rules_version = rules_version.into();
        validate_version_field("format major version", format_major_version)?;
        validate_version_field("format minor version", format_minor_version)?;
        validate_version_field("revision", revision)?;
        if rules_version.len() != RULES_VERSION_LENGTH
            || !rules_version_pattern().is_match(&rules_version)
        {
            return Err(DistroError::InvalidVersion(format!(
                "rules version {:?} is not 4 digits followed by a release letter",
                rules_version
            )));
        }
        Ok(Self {
            format_major_version,
            format_minor_version,
            rules_version,
            revision,
        })
    }

    /// Parse a serialized version file.
    ///
    /// Exactly [`DISTRO_VERSION_FILE_LENGTH`] bytes are expected; trailing
    /// bytes are rejected so that a damaged file cannot parse by accident.
    pub fn from_bytes(bytes: &[u8]) -> DistroResult<Self> {
        if bytes.len() != DISTRO_VERSION_FILE_LENGTH {
            return Err(DistroError::MalformedVersionFile(format!(
                "expected {} bytes, got {}",
                DISTRO_VERSION_FILE_LENGTH,
                bytes.len()
            )));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| {
            DistroError::MalformedVersionFile("version file is not ASCII".to_string())
        })?;
        let captures = version_file_pattern().captures(text).ok_or_else(|| {
            DistroError::MalformedVersionFile(format!("unrecognized version file {:?}", text))
        })?;

        // The pattern guarantees three decimal digits, which always fit u16.
        let major = parse_version_field(&captures[1])?;
        let minor = parse_version_field(&captures[2])?;
        let revision = parse_version_field(&captures[4])?;
        Self::new(major, minor, &captures[3], revision)
    }

    /// Serialize to the fixed-length version file form.
    ///
    /// The output always has [`DISTRO_VERSION_FILE_LENGTH`] bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Check whether a distro with this version can be read by this library.
    ///
    /// The major version must match [`SUPPORTED_FORMAT_MAJOR_VERSION`]
    /// exactly and the minor version must be at least
    /// [`SUPPORTED_FORMAT_MINOR_VERSION`].
    ///
    /// # Example
    ///
    /// ```
    /// use tzdistro::distro::DistroVersion;
    ///
    /// assert!(DistroVersion::new(1, 1, "2020a", 1).unwrap().is_compatible());
    /// assert!(DistroVersion::new(1, 2, "2020a", 1).unwrap().is_compatible());
    /// assert!(!DistroVersion::new(2, 1, "2020a", 1).unwrap().is_compatible());
    /// ```
    pub fn is_compatible(&self) -> bool {
        self.format_major_version == SUPPORTED_FORMAT_MAJOR_VERSION
            && self.format_minor_version >= SUPPORTED_FORMAT_MINOR_VERSION
    }
}

impl fmt::Display for DistroVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03}.{:03}|{}|{:03}",
            self.format_major_version, self.format_minor_version, self.rules_version, self.revision
        )
    }
}

fn validate_version_field(field: &str, value: u16) -> DistroResult<()> {
    if value > MAX_VERSION_FIELD {
        return Err(DistroError::InvalidVersion(format!(
            "{} {} exceeds {}",
            field, value, MAX_VERSION_FIELD
        )));
    }
    Ok(())
}

fn parse_version_field(digits: &str) -> DistroResult<u16> {
    digits
        .parse::<u16>()
        .map_err(|_| DistroError::MalformedVersionFile(format!("bad numeric field {:?}", digits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_new() {
        let version = DistroVersion::new(1, 1, "2016a", 1).unwrap();

        assert_eq!(version.format_major_version, 1);
        assert_eq!(version.format_minor_version, 1);
        assert_eq!(version.rules_version, "2016a");
        assert_eq!(version.revision, 1);
    }

    #[test]
    fn test_version_new_rejects_out_of_range_fields() {
        assert!(DistroVersion::new(1000, 1, "2016a", 1).is_err());
        assert!(DistroVersion::new(1, 1000, "2016a", 1).is_err());
        assert!(DistroVersion::new(1, 1, "2016a", 1000).is_err());

        // Boundary values are accepted.
        assert!(DistroVersion::new(999, 999, "2016a", 999).is_ok());
        assert!(DistroVersion::new(0, 0, "2016a", 0).is_ok());
    }

    #[test]
    fn test_version_new_rejects_bad_rules_version() {
        assert!(DistroVersion::new(1, 1, "2016", 1).is_err());
        assert!(DistroVersion::new(1, 1, "2016aa", 1).is_err());
        assert!(DistroVersion::new(1, 1, "201a6", 1).is_err());
        assert!(DistroVersion::new(1, 1, "", 1).is_err());

        // The release marker is any word character, matching historical
        // releases such as "2016a" as well as doubled letters encoded
        // differently upstream.
        assert!(DistroVersion::new(1, 1, "2016a", 1).is_ok());
        assert!(DistroVersion::new(1, 1, "20161", 1).is_ok());
    }

    #[test]
    fn test_version_display_is_zero_padded() {
        let version = DistroVersion::new(2, 3, "2016a", 4).unwrap();
        assert_eq!(version.to_string(), "002.003|2016a|004");
    }

    #[test]
    fn test_version_to_bytes_has_fixed_length() {
        let version = DistroVersion::new(1, 1, "2016a", 1).unwrap();
        assert_eq!(version.to_bytes().len(), DISTRO_VERSION_FILE_LENGTH);

        let version = DistroVersion::new(999, 999, "2016a", 999).unwrap();
        assert_eq!(version.to_bytes().len(), DISTRO_VERSION_FILE_LENGTH);
    }

    #[test]
    fn test_version_from_bytes() {
        let version = DistroVersion::from_bytes(b"001.002|2016c|003").unwrap();

        assert_eq!(version.format_major_version, 1);
        assert_eq!(version.format_minor_version, 2);
        assert_eq!(version.rules_version, "2016c");
        assert_eq!(version.revision, 3);
    }

    #[test]
    fn test_version_from_bytes_rejects_wrong_length() {
        assert!(DistroVersion::from_bytes(b"").is_err());
        assert!(DistroVersion::from_bytes(b"001.001|2016a|00").is_err());
        assert!(DistroVersion::from_bytes(b"001.001|2016a|0011").is_err());
    }

    #[test]
    fn test_version_from_bytes_rejects_bad_separators() {
        assert!(DistroVersion::from_bytes(b"001x001|2016a|001").is_err());
        assert!(DistroVersion::from_bytes(b"001.001x2016a|001").is_err());
        assert!(DistroVersion::from_bytes(b"001.001|2016a.001").is_err());
    }

    #[test]
    fn test_version_from_bytes_rejects_non_ascii() {
        let mut bytes = DistroVersion::new(1, 1, "2016a", 1).unwrap().to_bytes();
        bytes[0] = 0xff;
        assert!(DistroVersion::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_version_compatibility() {
        // Exact match of the supported version.
        let same = DistroVersion::new(
            SUPPORTED_FORMAT_MAJOR_VERSION,
            SUPPORTED_FORMAT_MINOR_VERSION,
            "2016a",
            1,
        )
        .unwrap();
        assert!(same.is_compatible());

        // Newer minor versions are readable by older code.
        let newer_minor = DistroVersion::new(
            SUPPORTED_FORMAT_MAJOR_VERSION,
            SUPPORTED_FORMAT_MINOR_VERSION + 1,
            "2016a",
            1,
        )
        .unwrap();
        assert!(newer_minor.is_compatible());

        // Older minor versions and any other major version are not.
        let older_minor = DistroVersion::new(
            SUPPORTED_FORMAT_MAJOR_VERSION,
            SUPPORTED_FORMAT_MINOR_VERSION - 1,
            "2016a",
            1,
        )
        .unwrap();
        assert!(!older_minor.is_compatible());

        let newer_major = DistroVersion::new(
            SUPPORTED_FORMAT_MAJOR_VERSION + 1,
            SUPPORTED_FORMAT_MINOR_VERSION,
            "2016a",
            1,
        )
        .unwrap();
        assert!(!newer_major.is_compatible());
    }

    #[test]
    fn test_version_round_trip() {
        let original = DistroVersion::new(12, 34, "2024b", 56).unwrap();
        let reparsed = DistroVersion::from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(reparsed, original);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_from_bytes_handles_arbitrary_bytes(
                bytes in prop::collection::vec(any::<u8>(), 0..32)
            ) {
                // Version files arrive inside untrusted payloads, so the
                // parser must never panic, and anything it accepts must
                // re-encode to the identical bytes.
                if let Ok(version) = DistroVersion::from_bytes(&bytes) {
                    prop_assert_eq!(version.to_bytes(), bytes);
                }
            }

            #[test]
            fn test_rules_version_order_matches_release_order(
                year_a in 1000u16..=9999,
                year_b in 1000u16..=9999,
                letter_a in prop::char::range('a', 'z'),
                letter_b in prop::char::range('a', 'z'),
            ) {
                let a = DistroVersion::new(1, 1, format!("{}{}", year_a, letter_a), 1)?;
                let b = DistroVersion::new(1, 1, format!("{}{}", year_b, letter_b), 1)?;

                // Installers compare rules versions byte-wise; for
                // well-formed versions that must agree with release order.
                prop_assert_eq!(
                    a.rules_version.as_bytes() < b.rules_version.as_bytes(),
                    (year_a, letter_a) < (year_b, letter_b)
                );
            }
        }
    }
}
