use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::core::error::{IoResultExt, Result};

/// Platform line ending used when joining reject fragments.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Read a file, `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>>
{
    match fs::read(path)
    {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).at_path(path),
    }
}

/// Write via a sibling temp file and rename, creating parent dirs.
pub fn write_atomic(
    path: &Path,
    contents: &[u8],
) -> Result<()>
{
    let parent = path
        .parent()
        .filter(|p| {
            !p.as_os_str()
                .is_empty()
        })
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).at_path(parent)?;

    let mut tmp = NamedTempFile::new_in(parent).at_path(parent)?;
    tmp.write_all(contents)
        .at_path(tmp.path().to_path_buf())?;
    tmp.as_file()
        .sync_all()
        .ok();
    tmp.persist(path)
        .map_err(|e| e.error)
        .at_path(path)?;
    Ok(())
}

/// Remove a file; returns whether it existed.
pub fn remove_if_exists(path: &Path) -> Result<bool>
{
    match fs::remove_file(path)
    {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).at_path(path),
    }
}

/// Remove a directory tree if present.
pub fn remove_dir_if_exists(path: &Path) -> Result<()>
{
    match fs::remove_dir_all(path)
    {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).at_path(path),
    }
}
