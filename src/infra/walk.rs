//! Raw file walker for native folders.
//! - Ignore files (.gitignore, .ignore) are NOT honored: the tree is walked
//!   as it is on disk, hidden files included
//! - Nested `.git` directories are always skipped
//! - Symbolic links are returned as entries and never followed
//! - Exclude globs prune directories early and filter files late
//! - Optional select globs keep only matching files (e.g. `**/*.rej`)
//! - Deterministic ordering for stable patches and tests
//!
//! Globs match on paths relative to the walker's `anchor`, so
//! `ios/Pods/**` works no matter which native folder is being walked.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

use crate::core::error::Result;

pub struct TreeWalker
{
    /// Paths that are relative-matched against the globs
    anchor: PathBuf,

    /// Pruned directories and dropped files
    excludes: GlobSet,

    /// When set, only files matching one of these are returned
    select: Option<GlobSet>,
}

fn build_set(patterns: &[String]) -> Result<GlobSet>
{
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns
    {
        builder.add(Glob::new(pattern)?);
    }

    Ok(builder.build()?)
}

impl TreeWalker
{
    /// Walker whose globs are relative to `anchor`.
    pub fn new(
        anchor: impl Into<PathBuf>,
        excludes: &[String],
    ) -> Result<Self>
    {
        Ok(Self {
            anchor: anchor.into(),
            excludes: build_set(excludes)?,
            select: None,
        })
    }

    /// (Optional) Keep only files matching `patterns`.
    pub fn with_select(
        mut self,
        patterns: &[String],
    ) -> Result<Self>
    {
        self.select = Some(build_set(patterns)?);
        Ok(self)
    }

    fn relative<'a>(
        anchor: &Path,
        path: &'a Path,
    ) -> &'a Path
    {
        path.strip_prefix(anchor)
            .unwrap_or(path)
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Plain filesystem view: no hidden-file skipping, no ignore files
        b.standard_filters(false);
        b.hidden(false);
        b.follow_links(false);

        let excludes = self
            .excludes
            .clone();
        let anchor = self
            .anchor
            .clone();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }

            if ent.depth() > 0 && ent.file_name() == ".git"
            {
                return false;
            }

            let rel = Self::relative(&anchor, ent.path());
            // `dir/**` matches `dir/x` but not `dir`; test a child path too
            !(excludes.is_match(rel) || excludes.is_match(rel.join("_")))
        });

        b
    }

    /// Files under `root`, sorted. A missing root yields an empty list.
    pub fn walk_files(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>>
    {
        if !root.exists()
        {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();

        for entry in self
            .build_walk(root)
            .build()
        {
            let entry = entry?;

            // Regular files and links; a linked directory is one entry
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file() || ft.is_symlink())
            {
                continue;
            }

            let rel = Self::relative(&self.anchor, entry.path());

            if self
                .excludes
                .is_match(rel)
            {
                continue;
            }

            if let Some(select) = &self.select
                && !select.is_match(rel)
            {
                continue;
            }

            out.push(entry.into_path());
        }

        // Deterministic order (stable patches & tests)
        out.sort();

        Ok(out)
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    )
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn rel_all(
        root: &Path,
        files: Vec<PathBuf>,
    ) -> Vec<PathBuf>
    {
        files
            .into_iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_path_buf()
            })
            .collect()
    }

    #[test]
    fn excludes_prune_relative_to_anchor()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        write_file(root, "ios/Pods/Lib/a.h", "h");
        write_file(root, "ios/app/AppDelegate.mm", "m");
        write_file(root, "android/build/out.apk", "bin");
        write_file(root, "android/app/build.gradle", "g");

        let walker = TreeWalker::new(
            root,
            &["ios/Pods/**".to_string(), "android/build/**".to_string()],
        )
        .unwrap();

        let mut files = walker
            .walk_files(&root.join("ios"))
            .unwrap();
        files.extend(
            walker
                .walk_files(&root.join("android"))
                .unwrap(),
        );

        assert_eq!(
            rel_all(root, files),
            vec![PathBuf::from("ios/app/AppDelegate.mm"), PathBuf::from("android/app/build.gradle")]
        );
    }

    #[test]
    fn hidden_files_and_ignore_files_are_not_special()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        write_file(root, "ios/.xcode.env", "export NODE_BINARY=node");
        write_file(root, "ios/.gitignore", "*.txt");
        write_file(root, "ios/notes.txt", "kept");
        write_file(root, "ios/.git/HEAD", "ref");

        let walker = TreeWalker::new(root, &[]).unwrap();
        let files = rel_all(
            root,
            walker
                .walk_files(&root.join("ios"))
                .unwrap(),
        );

        assert_eq!(
            files,
            vec![
                PathBuf::from("ios/.gitignore"),
                PathBuf::from("ios/.xcode.env"),
                PathBuf::from("ios/notes.txt"),
            ]
        );
    }

    #[test]
    fn select_keeps_only_matching()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        write_file(root, "ios/first.txt", "x");
        write_file(root, "ios/first.txt.rej", "@@");
        write_file(root, "ios/nested/deep/second.txt.rej", "@@");

        let walker = TreeWalker::new(root, &[])
            .unwrap()
            .with_select(&["**/*.rej".to_string()])
            .unwrap();
        let files = rel_all(
            root,
            walker
                .walk_files(&root.join("ios"))
                .unwrap(),
        );

        assert_eq!(
            files,
            vec![PathBuf::from("ios/first.txt.rej"), PathBuf::from("ios/nested/deep/second.txt.rej")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn links_are_entries_not_followed()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        write_file(root, "shared/inner.txt", "x");
        write_file(root, "ios/real.txt", "x");
        std::os::unix::fs::symlink("real.txt", root.join("ios/alias.txt")).unwrap();
        std::os::unix::fs::symlink("../shared", root.join("ios/shared")).unwrap();

        let walker = TreeWalker::new(root, &[]).unwrap();
        let files = rel_all(
            root,
            walker
                .walk_files(&root.join("ios"))
                .unwrap(),
        );

        assert_eq!(
            files,
            vec![PathBuf::from("ios/alias.txt"), PathBuf::from("ios/real.txt"), PathBuf::from("ios/shared")]
        );
    }

    #[test]
    fn missing_root_is_empty()
    {
        let tmp = TempDir::new().unwrap();
        let walker = TreeWalker::new(tmp.path(), &[]).unwrap();
        assert!(
            walker
                .walk_files(
                    &tmp.path()
                        .join("nope")
                )
                .unwrap()
                .is_empty()
        );
    }
}
