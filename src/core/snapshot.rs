//! Snapshot store: a mirror of the pristine native folders with its own
//! git history, used only as the baseline for `current.patch`.
//!
//! History is linear: the initial commit of the freshly generated folders,
//! then one commit per tracked automated change.

use tracing::{debug, info};

use crate::core::error::{IoResultExt, PatchError, Result};
use crate::core::git::GitShell;
use crate::core::gitignore::snapshot_gitignore;
use crate::core::mirror::mirror_working_tree;
use crate::infra::io::{remove_dir_if_exists, write_atomic};
use crate::infra::workspace::Workspace;

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit (fresh native folders).";
pub const TRACKED_COMMIT_MESSAGE: &str = "Automated changes.";

#[derive(Debug)]
pub struct SnapshotStore<'a> {
    ws: &'a Workspace,
    shell: GitShell,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        Self {
            shell: GitShell::new(ws.snapshot_dir(), ws.config().max_buffer_bytes),
            ws,
        }
    }

    pub fn shell(&self) -> &GitShell {
        &self.shell
    }

    /// Whether the snapshot repository has been initialized.
    pub fn exists(&self) -> bool {
        self.shell.cwd().join(".git").is_dir()
    }

    /// Require an initialized snapshot.
    pub fn require(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(PatchError::MissingWorkingTree {
                path: self.shell.cwd().to_path_buf(),
            })
        }
    }

    /// Build the snapshot from the current working tree, replacing any
    /// existing one, and record it as the initial commit.
    pub fn initialize(&self) -> Result<()> {
        let dir = self.shell.cwd();
        remove_dir_if_exists(dir)?;

        let copied = mirror_working_tree(self.ws)?;
        std::fs::create_dir_all(dir).at_path(dir)?;

        self.shell.init_repository()?;
        // Mode-only changes from copying must never become hunks
        self.shell.run(["config", "--local", "core.fileMode", "false"])?;
        self.shell.run(["config", "--local", "core.autocrlf", "false"])?;

        write_atomic(
            &dir.join(".gitignore"),
            snapshot_gitignore(&self.ws.config().native_gitignore).as_bytes(),
        )?;

        self.shell.run(["add", "."])?;
        self.shell
            .run(["commit", "--quiet", "--allow-empty", "-m", INITIAL_COMMIT_MESSAGE])?;

        info!("Snapshot initialized with {copied} files in {}", self.ws.display_path(dir));
        Ok(())
    }

    /// Discard uncommitted changes; no-op without a repository.
    pub fn reset(&self) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        // Without --hard the changes would only be unstaged
        self.shell.run(["reset", "--quiet", "--hard", "HEAD"])?;
        Ok(())
    }

    /// Commit everything in the mirror; no-op without a repository.
    pub fn commit(&self, message: &str) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        self.shell.run(["add", "."])?;
        self.shell.run(["commit", "--quiet", "--allow-empty", "-m", message])?;
        debug!(message, "snapshot commit");
        Ok(())
    }

    /// Refresh the mirror from the working tree (uncommitted).
    pub fn mirror_working_tree(&self) -> Result<usize> {
        mirror_working_tree(self.ws)
    }

    /// Stage modifications, additions and removals.
    pub fn stage_all(&self) -> Result<()> {
        self.shell.run(["add", "--all", "."])?;
        Ok(())
    }

    /// Raw binary-safe diff of the staged state against HEAD.
    pub fn staged_diff(&self) -> Result<Vec<u8>> {
        let output = self.shell.run([
            "diff",
            "--cached",
            "--no-color",
            "--ignore-space-at-eol",
            "--no-ext-diff",
            "--no-renames",
            "--binary",
        ])?;
        Ok(output.stdout)
    }

    /// Number of commits on HEAD.
    pub fn commit_count(&self) -> Result<usize> {
        let out = self.shell.run(["rev-list", "--count", "HEAD"])?;
        Ok(String::from_utf8_lossy(&out.stdout).trim().parse().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::infra::config::Config;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn project() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "ios/first.txt", "one\ntwo\nthree\n");
        write(tmp.path(), "android/first.txt", "one\ntwo\nthree\n");
        let ws = Workspace::with_config(tmp.path(), Config::default());
        (tmp, ws)
    }

    #[test]
    fn test_initialize_commits_mirror() {
        let (_tmp, ws) = project();
        let store = SnapshotStore::new(&ws);
        assert!(!store.exists());

        store.initialize().unwrap();
        assert!(store.exists());
        assert_eq!(store.commit_count().unwrap(), 1);
        assert!(ws.snapshot_dir().join("ios/first.txt").exists());
        assert!(ws.snapshot_dir().join(".gitignore").exists());

        // Clean after init
        store.stage_all().unwrap();
        assert!(store.staged_diff().unwrap().is_empty());
    }

    #[test]
    fn test_reset_discards_uncommitted_edits() {
        let (_tmp, ws) = project();
        let store = SnapshotStore::new(&ws);
        store.initialize().unwrap();

        let mirrored = ws.snapshot_dir().join("ios/first.txt");
        fs::write(&mirrored, "changed\n").unwrap();
        store.stage_all().unwrap();
        store.reset().unwrap();

        assert_eq!(fs::read_to_string(&mirrored).unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_commit_extends_history() {
        let (_tmp, ws) = project();
        let store = SnapshotStore::new(&ws);
        store.initialize().unwrap();

        write(&ws.snapshot_dir(), "ios/added.txt", "new\n");
        store.commit(TRACKED_COMMIT_MESSAGE).unwrap();
        assert_eq!(store.commit_count().unwrap(), 2);

        // Empty commits are allowed
        store.commit(TRACKED_COMMIT_MESSAGE).unwrap();
        assert_eq!(store.commit_count().unwrap(), 3);
    }

    #[test]
    fn test_reset_and_commit_without_repository_are_noops() {
        let (_tmp, ws) = project();
        let store = SnapshotStore::new(&ws);
        store.reset().unwrap();
        store.commit("nothing").unwrap();
        assert!(matches!(store.require(), Err(PatchError::MissingWorkingTree { .. })));
    }
}
