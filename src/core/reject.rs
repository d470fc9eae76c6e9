//! Reject collector: turn `*.rej` artifacts left by `git apply --reject`
//! into one self-contained patch.
//!
//! A reject artifact starts with `diff a/<path> b/<path>\t(rejected hunks)`
//! followed by bare hunks. Inserting a `--- a/<path>` / `+++ b/<path>`
//! header after that first line makes each artifact an independently
//! appliable patch fragment. Collection deletes the artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{IoResultExt, Result};
use crate::infra::io::LINE_ENDING;
use crate::infra::walk::TreeWalker;

const REJECT_SUFFIX: &str = ".rej";

/// One failed file, rewritten as a patch fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFragment {
    /// Target file, relative to the apply root, `/`-separated
    pub path: String,
    pub body: String,
}

/// Hunks that failed the most recent apply pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectedHunkSet {
    pub fragments: Vec<RejectedFragment>,
}

impl RejectedHunkSet {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.fragments.iter().map(|f| PathBuf::from(&f.path)).collect()
    }

    /// Patch text for `rejected-hunks.patch`.
    pub fn render(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.body.as_str())
            .collect::<Vec<_>>()
            .join(LINE_ENDING)
    }
}

fn split_lines(contents: &str) -> Vec<&str> {
    contents.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect()
}

/// Insert the synthetic file header after the first line.
pub fn fragment_from_reject(path: &str, contents: &str) -> RejectedFragment {
    let mut lines = split_lines(contents);
    let header = format!("--- a/{path}{LINE_ENDING}+++ b/{path}");
    let at = lines.len().min(1);
    lines.insert(at, &header);

    RejectedFragment {
        path: path.to_string(),
        body: lines.join(LINE_ENDING),
    }
}

/// A file git skipped as a whole keeps its full `diff --git` section.
pub fn fragment_from_section(path: &str, section: &str) -> RejectedFragment {
    RejectedFragment {
        path: path.to_string(),
        body: split_lines(section).join(LINE_ENDING),
    }
}

fn reject_artifacts(root: &Path, native_dirs: &[String]) -> Result<Vec<PathBuf>> {
    let walker = TreeWalker::new(root, &[])?.with_select(&[format!("**/*{REJECT_SUFFIX}")])?;

    let mut found = Vec::new();
    for dir in native_dirs {
        found.extend(walker.walk_files(&root.join(dir))?);
    }
    Ok(found)
}

/// `ios/first.txt.rej` → `ios/first.txt`, always `/`-separated.
fn original_path(root: &Path, artifact: &Path) -> String {
    let rel = artifact.strip_prefix(root).unwrap_or(artifact);
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    rel.strip_suffix(REJECT_SUFFIX).unwrap_or(&rel).to_string()
}

/// Read and delete every reject artifact under the native folders of `root`.
pub fn collect(root: &Path, native_dirs: &[String]) -> Result<RejectedHunkSet> {
    let mut set = RejectedHunkSet::default();

    for artifact in reject_artifacts(root, native_dirs)? {
        let bytes = fs::read(&artifact).at_path(artifact.clone())?;
        let contents = String::from_utf8_lossy(&bytes);

        if !contents.is_empty() {
            let path = original_path(root, &artifact);
            debug!(%path, "collected rejected hunks");
            set.fragments.push(fragment_from_reject(&path, &contents));
        }

        // Content is captured, the artifact goes either way
        fs::remove_file(&artifact).at_path(artifact.clone())?;
    }

    Ok(set)
}

/// Delete reject artifacts without reading them.
pub fn clear(root: &Path, native_dirs: &[String]) -> Result<usize> {
    let artifacts = reject_artifacts(root, native_dirs)?;
    for artifact in &artifacts {
        fs::remove_file(artifact).at_path(artifact.clone())?;
    }
    Ok(artifacts.len())
}
