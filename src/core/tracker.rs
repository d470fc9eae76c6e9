//! Change tracker: apply automated edits to the working tree and the
//! snapshot alike, so they never show up in `current.patch`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};
use tracing::{debug, info, instrument};

use crate::core::error::Result;
use crate::core::snapshot::{SnapshotStore, TRACKED_COMMIT_MESSAGE};
use crate::infra::workspace::Workspace;

/// Exported to tracked programs: the tree they should edit
pub const NATIVE_PATH_ENV: &str = "NATIVEPATCH_NATIVE_PATH";
/// Exported to tracked programs: the project base
pub const PROJECT_PATH_ENV: &str = "NATIVEPATCH_PROJECT_PATH";

/// Tree an automated mutation runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationTarget {
    WorkingTree(PathBuf),
    Snapshot(PathBuf),
}

impl MutationTarget {
    /// Directory holding the native folders.
    pub fn root(&self) -> &Path {
        match self {
            Self::WorkingTree(p) | Self::Snapshot(p) => p,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WorkingTree(_) => "working tree",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

pub struct ChangeTracker<'a> {
    ws: &'a Workspace,
}

impl<'a> ChangeTracker<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        Self { ws }
    }

    /// Reset the snapshot, run `mutation` on both trees, commit the snapshot.
    ///
    /// A failing mutation aborts before the commit, leaving the snapshot
    /// dirty until the next reset.
    #[instrument(skip_all)]
    pub fn track<F>(&self, mut mutation: F) -> anyhow::Result<()>
    where
        F: FnMut(&MutationTarget) -> anyhow::Result<()>,
    {
        let store = SnapshotStore::new(self.ws);
        store.reset()?;

        let targets = [
            MutationTarget::WorkingTree(self.ws.base().to_path_buf()),
            MutationTarget::Snapshot(self.ws.snapshot_dir()),
        ];
        for target in &targets {
            debug!(target = target.label(), root = %target.root().display(), "tracked mutation");
            mutation(target).with_context(|| format!("automated change failed on the {}", target.label()))?;
        }

        store.commit(TRACKED_COMMIT_MESSAGE)?;
        Ok(())
    }
}

/// Reset, mutate both trees, commit.
pub fn track<F>(ws: &Workspace, mutation: F) -> anyhow::Result<()>
where
    F: FnMut(&MutationTarget) -> anyhow::Result<()>,
{
    ChangeTracker::new(ws).track(mutation)
}

/// Mutation that runs an external program once per target.
pub fn program_mutation<'p>(
    ws: &'p Workspace,
    program: &'p OsString,
    args: &'p [OsString],
) -> impl FnMut(&MutationTarget) -> anyhow::Result<()> + 'p {
    move |target| {
        let status = Command::new(program)
            .args(args)
            .current_dir(target.root())
            .env(NATIVE_PATH_ENV, target.root())
            .env(PROJECT_PATH_ENV, ws.base())
            .status()
            .with_context(|| format!("failed to start {}", program.to_string_lossy()))?;

        if !status.success() {
            bail!("{} exited with {status}", program.to_string_lossy());
        }
        info!("Ran {} on the {}", program.to_string_lossy(), target.label());
        Ok(())
    }
}

/// Snapshot commits so far, for callers checking that a mutation was recorded.
pub fn snapshot_commits(ws: &Workspace) -> Result<usize> {
    SnapshotStore::new(ws).commit_count()
}
