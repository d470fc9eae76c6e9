//! Copy the user's native folders into the snapshot mirror.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::error::{IoResultExt, PatchError, Result};
use crate::infra::io::remove_dir_if_exists;
use crate::infra::walk::TreeWalker;
use crate::infra::workspace::Workspace;

/// Replace each mirrored native folder with a fresh copy of the user's.
///
/// Removing the mirror first is what makes user deletions show up in the
/// diff. Symbolic links are recreated as links, never resolved. Returns the
/// number of entries copied.
pub fn mirror_working_tree(ws: &Workspace) -> Result<usize> {
    let source_root = ws.base();
    let target_root = ws.snapshot_dir();
    let walker = TreeWalker::new(source_root, &ws.config().mirror_excludes)?;

    let mut copied = 0;

    for dir in ws.native_dirs() {
        let source = source_root.join(dir);
        if !source.is_dir() {
            return Err(PatchError::MissingWorkingTree { path: source });
        }

        remove_dir_if_exists(&target_root.join(dir))?;
        copied += copy_files(&walker, source_root, &source, &target_root)?;
    }

    debug!(copied, "mirrored native folders");
    Ok(copied)
}

/// Copy every walked file under `source` to the same relative spot in `target_root`.
fn copy_files(walker: &TreeWalker, source_root: &Path, source: &Path, target_root: &Path) -> Result<usize> {
    let files = walker.walk_files(source)?;

    for file in &files {
        let rel = file.strip_prefix(source_root).unwrap_or(file);
        let dest = target_root.join(rel);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at_path(parent)?;
        }
        let meta = fs::symlink_metadata(file).at_path(file.clone())?;
        if meta.file_type().is_symlink() {
            copy_link(file, &dest)?;
        } else {
            fs::copy(file, &dest).at_path(file.clone())?;
        }
    }

    Ok(files.len())
}

#[cfg(unix)]
fn copy_link(link: &Path, dest: &Path) -> Result<()> {
    let target = fs::read_link(link).at_path(link)?;
    std::os::unix::fs::symlink(target, dest).at_path(dest)
}

// The link target's contents stand in for the link here
#[cfg(not(unix))]
fn copy_link(link: &Path, dest: &Path) -> Result<()> {
    fs::copy(link, dest).at_path(link)?;
    Ok(())
}
