//! Patch generator: diff the working tree against the snapshot baseline and
//! write `patch/current.patch`.

use std::fmt;

use tracing::{info, instrument};

use crate::core::error::Result;
use crate::core::patch::{has_changes, normalize};
use crate::core::snapshot::SnapshotStore;
use crate::infra::io::{read_optional, remove_if_exists, write_atomic};
use crate::infra::workspace::Workspace;

/// What a `generate` run did to `current.patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// No user changes and no patch file
    NoChanges,
    /// No user changes; the stale patch file was deleted
    Removed,
    /// Diff identical to the existing patch, nothing written
    Unchanged,
    Created,
    Updated,
}

impl fmt::Display for GenerateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoChanges => "no changes",
            Self::Removed => "removed",
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
        };
        f.write_str(s)
    }
}

/// Capture user edits as `current.patch`.
///
/// The snapshot is always reset to its last commit afterwards, also when
/// diffing fails, so generation leaves no trace in the snapshot history.
#[instrument(skip_all)]
pub fn generate(ws: &Workspace) -> Result<GenerateOutcome> {
    let store = SnapshotStore::new(ws);
    store.require()?;

    let staged = store
        .mirror_working_tree()
        .and_then(|_| store.stage_all())
        .and_then(|_| store.staged_diff());
    let reset = store.reset();

    let diff = normalize(&staged?);
    reset?;

    write_patch(ws, &diff)
}

fn write_patch(ws: &Workspace, diff: &[u8]) -> Result<GenerateOutcome> {
    let path = ws.current_patch();
    let shown = ws.display_path(&path);
    let existing = read_optional(&path)?;

    if !has_changes(diff) {
        if existing.is_some() {
            remove_if_exists(&path)?;
            info!("No changes to patch found, removed {shown}");
            return Ok(GenerateOutcome::Removed);
        }
        info!("No changes to patch found");
        return Ok(GenerateOutcome::NoChanges);
    }

    match existing {
        Some(old) if old == diff => Ok(GenerateOutcome::Unchanged),
        Some(_) => {
            write_atomic(&path, diff)?;
            info!("Patch updated in {shown}");
            Ok(GenerateOutcome::Updated)
        }
        None => {
            write_atomic(&path, diff)?;
            info!("Patch created in {shown}");
            Ok(GenerateOutcome::Created)
        }
    }
}
