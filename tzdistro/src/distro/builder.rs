//! Distro archive assembly for packaging hosts and tests.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::archive::validate_entry_name;
use super::{
    DistroArchive, DistroError, DistroResult, DistroVersion, DISTRO_VERSION_FILE_NAME,
    ICU_DATA_FILE_NAME, TZDATA_FILE_NAME,
};

/// Assembles distro archive bytes from individual data files.
///
/// [`DistroBuilder::build`] insists on a complete distro; tests that need a
/// structurally broken one use [`DistroBuilder::build_partial`] to skip the
/// completeness checks.
///
/// # Example
///
/// ```
/// use tzdistro::distro::{DistroBuilder, DistroVersion};
///
/// let version = DistroVersion::new(1, 1, "2016a", 1).unwrap();
/// let archive = DistroBuilder::new()
///     .with_version(version)
///     .with_tzdata(b"tzdata bytes".to_vec())
///     .with_icu_data(b"icu bytes".to_vec())
///     .build()
///     .unwrap();
///
/// assert!(!archive.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct DistroBuilder {
    version: Option<DistroVersion>,
    tzdata: Option<Vec<u8>>,
    icu_data: Option<Vec<u8>>,
    extra_entries: Vec<(String, Vec<u8>)>,
}

impl DistroBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distro version written to the version file.
    pub fn with_version(mut self, version: DistroVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the compiled time zone rules data.
    pub fn with_tzdata(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.tzdata = Some(bytes.into());
        self
    }

    /// Set the ICU overlay data.
    pub fn with_icu_data(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.icu_data = Some(bytes.into());
        self
    }

    /// Add an arbitrary extra entry.
    ///
    /// Extra entries ride along after the well-known files. Future format
    /// minor versions distribute additional data this way without breaking
    /// older readers.
    pub fn with_entry(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.extra_entries.push((name.into(), bytes.into()));
        self
    }

    /// Build a complete distro archive.
    ///
    /// Fails with [`DistroError::MissingEntry`] unless the version, tzdata
    /// and ICU data have all been supplied.
    pub fn build(self) -> DistroResult<DistroArchive> {
        if self.version.is_none() {
            return Err(DistroError::MissingEntry(DISTRO_VERSION_FILE_NAME));
        }
        if self.tzdata.is_none() {
            return Err(DistroError::MissingEntry(TZDATA_FILE_NAME));
        }
        if self.icu_data.is_none() {
            return Err(DistroError::MissingEntry(ICU_DATA_FILE_NAME));
        }
        self.build_partial()
    }

    /// Build an archive from whatever entries are present.
    ///
    /// Intended for tests that exercise installer rejection of incomplete
    /// distros. Entry names are still validated.
    pub fn build_partial(self) -> DistroResult<DistroArchive> {
        let mut entries: Vec<(&str, Vec<u8>)> = Vec::new();
        if let Some(version) = &self.version {
            entries.push((DISTRO_VERSION_FILE_NAME, version.to_bytes()));
        }
        if let Some(tzdata) = self.tzdata {
            entries.push((TZDATA_FILE_NAME, tzdata));
        }
        if let Some(icu_data) = self.icu_data {
            entries.push((ICU_DATA_FILE_NAME, icu_data));
        }
        for (name, bytes) in &self.extra_entries {
            entries.push((name.as_str(), bytes.clone()));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for (name, data) in &entries {
            write_entry(&mut encoder, name, data)?;
        }
        let bytes = encoder
            .finish()
            .map_err(|e| DistroError::EncodeFailed(e.to_string()))?;
        Ok(DistroArchive::new(bytes))
    }
}

fn write_entry(encoder: &mut GzEncoder<Vec<u8>>, name: &str, data: &[u8]) -> DistroResult<()> {
    validate_entry_name(name)?;
    let data_len = u32::try_from(data.len()).map_err(|_| DistroError::OversizedEntry {
        name: name.to_string(),
        bytes: data.len() as u64,
    })?;

    let frame = |e: std::io::Error| DistroError::EncodeFailed(e.to_string());
    encoder
        .write_all(&(name.len() as u16).to_be_bytes())
        .map_err(frame)?;
    encoder.write_all(name.as_bytes()).map_err(frame)?;
    encoder.write_all(&data_len.to_be_bytes()).map_err(frame)?;
    encoder.write_all(data).map_err(frame)
}
