//! Filesystem operations behind the installer.
//!
//! The installer's crash-safety story is a small set of primitive
//! filesystem operations performed in a precise order. [`FileOps`] makes
//! that set explicit and injectable: production code runs on
//! [`StdFileOps`], while tests substitute implementations that fault a
//! single operation to exercise recovery paths.

use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// The filesystem capabilities the installer needs.
///
/// Directory renames are assumed atomic on the filesystem holding the
/// distro directories, which is what makes promotion safe.
pub trait FileOps {
    /// Check whether a file or directory exists.
    fn exists(&self, path: &Path) -> bool;

    /// Rename `from` to `to` in a single filesystem operation.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file or a whole directory tree.
    ///
    /// Deleting a path that does not exist succeeds.
    fn delete_recursive(&self, path: &Path) -> io::Result<()>;

    /// Read exactly `length` bytes from the start of a file.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if the file is shorter
    /// and with [`io::ErrorKind::NotFound`] if it does not exist.
    fn read_fixed_length(&self, path: &Path, length: usize) -> io::Result<Vec<u8>>;

    /// Make every file under `root` world readable and every directory
    /// world readable and searchable.
    fn make_world_readable(&self, root: &Path) -> io::Result<()>;

    /// Create or replace a small file with the given contents.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FileOps`] implementation backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<()> {
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
        }
    }

    fn read_fixed_length(&self, path: &Path, length: usize) -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut bytes = vec![0u8; length];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn make_world_readable(&self, root: &Path) -> io::Result<()> {
        let metadata = fs::metadata(root)?;
        let mut mode = metadata.permissions().mode() | 0o444;
        if metadata.is_dir() {
            mode |= 0o111;
        }
        fs::set_permissions(root, fs::Permissions::from_mode(mode))?;

        if metadata.is_dir() {
            for entry in fs::read_dir(root)? {
                self.make_world_readable(&entry?.path())?;
            }
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
