//! TzDistro - Safe distribution of updated time zone rules
//!
//! This library provides the core functionality for replacing a device's
//! compiled time zone rules at runtime: a versioned distro archive format,
//! structural validation of the rule data itself, and a crash-safe
//! installer that atomically swaps the live rules directory.

pub mod distro;
pub mod installer;
pub mod logging;
pub mod tzdata;

pub use distro::{DistroArchive, DistroBuilder, DistroVersion};
pub use installer::{DistroInstaller, InstallOutcome, InstalledDistro};
