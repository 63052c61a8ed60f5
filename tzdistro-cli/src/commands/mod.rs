//! CLI command implementations.

pub mod install;
pub mod pack;
pub mod status;
pub mod uninstall;
