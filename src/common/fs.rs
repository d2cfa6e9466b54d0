use std::{fs::{self, File}, io, path::Path};

use crate::error::{Error, Result};

/// Error unless `path` exists and is a regular file.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|e| Error::unreadable(path, e))?;
    if !meta.is_file() {
        return Err(Error::unreadable(path, io::Error::new(io::ErrorKind::InvalidInput, "not a regular file")));
    }
    Ok(())
}

/// Open `path` for reading, mapping any failure to `UnreadableFile`.
pub(crate) fn open_file(path: &Path) -> Result<File> {
    require_file_exists(path)?;
    File::open(path).map_err(|e| Error::unreadable(path, e))
}

/// Read the whole file at `path`.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    require_file_exists(path)?;
    fs::read(path).map_err(|e| Error::unreadable(path, e))
}

/// Read the whole file at `path` as UTF-8 text.
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    require_file_exists(path)?;
    fs::read_to_string(path).map_err(|e| Error::unreadable(path, e))
}

/// Create (or truncate) `path` for writing, creating its parent directory.
pub(crate) fn create_file(path: &Path) -> Result<File> {
    ensure_parent_dir_exists(path)?;
    File::create(path).map_err(|e| Error::unwritable(path, e))
}

/// Create the parent directory of an output file if it doesn't exist; error if
/// a non-directory exists there.
pub(crate) fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else { return Ok(()) };
    if parent.exists() {
        if !parent.is_dir() {
            return Err(Error::unwritable(parent, io::Error::new(io::ErrorKind::InvalidInput, "path exists but is not a directory")));
        }
    } else {
        fs::create_dir_all(parent).map_err(|e| Error::unwritable(parent, e))?;
    }
    Ok(())
}
