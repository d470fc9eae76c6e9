//! Reconciler: bring a freshly regenerated tree in line with `current.patch`.
//!
//! A hunk that fails forward is either a real conflict or already present.
//! Reverse-applying the rejected hunks tells the two apart: a hunk whose
//! post-image is already in the tree reverses cleanly, a conflict fails
//! both ways. The second forward pass then restores whatever the reverse
//! pass undid.
//!
//! Files git skips as a whole (an addition over an existing file, a change
//! to a missing one) leave no `.rej`. Each is checked on its own: a file
//! already in its patched state is satisfied, any other is a conflict
//! carrying its full patch section.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::error::{IoResultExt, Result};
use crate::core::git::{self, ApplyOptions, ApplyPrimitive};
use crate::core::patch;
use crate::core::reject::{self, RejectedHunkSet};
use crate::infra::io::{remove_if_exists, write_atomic};
use crate::infra::workspace::Workspace;

/// Steps of one apply cycle, in the order they can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileState {
    Start,
    FirstApply,
    Success,
    HasRejects,
    ReverseProbe,
    SecondApply,
    Resolved,
    Unresolved,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::FirstApply => "first-apply",
            Self::Success => "success",
            Self::HasRejects => "has-rejects",
            Self::ReverseProbe => "reverse-probe",
            Self::SecondApply => "second-apply",
            Self::Resolved => "resolved",
            Self::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    /// Stay quiet when there is no patch
    pub skip_empty: bool,
    /// Tree to patch; defaults to the project base
    pub location: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    NoPatch,
    Applied,
    /// Everything the first pass refused turned out to be applied already
    Resolved { satisfied: Vec<PathBuf> },
    Unresolved {
        rejected_path: PathBuf,
        files: Vec<PathBuf>,
    },
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied | Self::Resolved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub outcome: ApplyOutcome,
    pub trail: Vec<ReconcileState>,
}

impl ApplyReport {
    pub fn final_state(&self) -> ReconcileState {
        self.trail.last().copied().unwrap_or(ReconcileState::Start)
    }
}

/// Files the first pass skipped as a whole, sorted by the per-file check
#[derive(Debug, Default)]
struct SkippedFiles {
    satisfied: Vec<PathBuf>,
    conflicts: RejectedHunkSet,
}

pub struct Reconciler<'a, P: ApplyPrimitive> {
    ws: &'a Workspace,
    primitive: P,
    trail: Vec<ReconcileState>,
}

impl<'a, P: ApplyPrimitive> Reconciler<'a, P> {
    pub fn new(ws: &'a Workspace, primitive: P) -> Self {
        Self {
            ws,
            primitive,
            trail: Vec::new(),
        }
    }

    fn enter(&mut self, state: ReconcileState) {
        tracing::debug!(%state, "reconcile");
        self.trail.push(state);
    }

    fn report(&mut self, outcome: ApplyOutcome) -> ApplyReport {
        ApplyReport {
            outcome,
            trail: std::mem::take(&mut self.trail),
        }
    }

    #[instrument(skip_all)]
    pub fn apply(&mut self, request: ApplyRequest) -> Result<ApplyReport> {
        self.trail.clear();
        self.enter(ReconcileState::Start);

        let patch = self.ws.current_patch();
        let rejected_path = self.ws.rejected_hunks();

        if !patch.is_file() {
            if !request.skip_empty {
                warn!("No patch found in {}, run `nativepatch patch` to create one", self.ws.display_path(&patch));
            }
            return Ok(self.report(ApplyOutcome::NoPatch));
        }

        if rejected_path.exists() {
            info!(
                "Removing {}, assuming appropriate changes have been made in {}",
                self.ws.display_path(&rejected_path),
                self.ws.display_path(&patch)
            );
        }

        let root = request
            .location
            .clone()
            .unwrap_or_else(|| self.ws.base().to_path_buf());
        let dirs = self.ws.native_dirs().to_vec();

        // Held until the cycle is over so every pass sees the same repository
        let _repository = self.primitive.prepare(&root)?;

        self.enter(ReconcileState::FirstApply);
        let pass = self.primitive.apply(&root, &patch, ApplyOptions::FORWARD)?;
        for message in pass.unexpected() {
            warn!("git apply: {message}");
        }
        let first = reject::collect(&root, &dirs)?;
        let skipped = self.check_skipped(&root, &patch, &pass)?;

        if first.is_empty() && skipped.conflicts.is_empty() {
            remove_if_exists(&rejected_path)?;
            info!("Patch successfully applied");
            if skipped.satisfied.is_empty() {
                self.enter(ReconcileState::Success);
                return Ok(self.report(ApplyOutcome::Applied));
            }
            self.enter(ReconcileState::Resolved);
            return Ok(self.report(ApplyOutcome::Resolved {
                satisfied: skipped.satisfied,
            }));
        }

        self.enter(ReconcileState::HasRejects);
        let mut unresolved = if first.is_empty() {
            RejectedHunkSet::default()
        } else {
            self.undo_satisfied_hunks(&root, &patch, &rejected_path, &first)?
        };
        unresolved.fragments.extend(skipped.conflicts.fragments);
        unresolved.fragments.sort_by(|a, b| a.path.cmp(&b.path));

        if unresolved.is_empty() {
            self.enter(ReconcileState::Resolved);
            info!("Patch successfully applied");
            let mut satisfied = first.paths();
            satisfied.extend(skipped.satisfied);
            return Ok(self.report(ApplyOutcome::Resolved { satisfied }));
        }

        write_atomic(&rejected_path, unresolved.render().as_bytes())?;
        self.enter(ReconcileState::Unresolved);
        log_unresolved(self.ws, &rejected_path, &unresolved);

        Ok(self.report(ApplyOutcome::Unresolved {
            rejected_path,
            files: unresolved.paths(),
        }))
    }

    /// Reverse the first-pass rejects, then reapply the patch. Returns the
    /// hunks that failed in reverse too.
    fn undo_satisfied_hunks(
        &mut self,
        root: &Path,
        patch: &Path,
        rejected_path: &Path,
        first: &RejectedHunkSet,
    ) -> Result<RejectedHunkSet> {
        let ws = self.ws;
        let dirs = ws.native_dirs();
        write_atomic(rejected_path, first.render().as_bytes())?;

        self.enter(ReconcileState::ReverseProbe);
        let reversed = self
            .primitive
            .apply(root, rejected_path, ApplyOptions::REVERSE);
        remove_if_exists(rejected_path)?;
        reversed?;
        let remaining = reject::collect(root, dirs)?;

        self.enter(ReconcileState::SecondApply);
        self.primitive.apply(root, patch, ApplyOptions::FORWARD)?;
        // Hunks from the first pass are rejected again here, the reverse pass decides
        let discarded = reject::clear(root, dirs)?;
        tracing::debug!(discarded, "second pass artifacts");

        Ok(remaining)
    }

    fn check_skipped(&self, root: &Path, patch: &Path, pass: &git::ApplyOutcome) -> Result<SkippedFiles> {
        let mut skipped = SkippedFiles::default();
        let files = pass.skipped_files();
        if files.is_empty() {
            return Ok(skipped);
        }

        let raw = fs::read(patch).at_path(patch)?;
        for file in files {
            let path = file.to_string_lossy().replace('\\', "/");
            if self.primitive.is_satisfied(root, patch, &path)? {
                tracing::debug!(%path, "file already in patched state");
                skipped.satisfied.push(file);
                continue;
            }
            match patch::file_section(&raw, &path) {
                Some(section) => {
                    let section = String::from_utf8_lossy(&section);
                    skipped.conflicts.fragments.push(reject::fragment_from_section(&path, &section));
                }
                None => warn!("git apply skipped {path}, which the patch does not name"),
            }
        }
        Ok(skipped)
    }
}

/// Convenience for the usual project-level run.
pub fn apply<P: ApplyPrimitive>(ws: &Workspace, primitive: P, request: ApplyRequest) -> Result<ApplyReport> {
    Reconciler::new(ws, primitive).apply(request)
}

fn log_unresolved(ws: &Workspace, rejected_path: &Path, remaining: &RejectedHunkSet) {
    let shown = ws.display_path(rejected_path);
    let patch = ws.current_patch();

    warn!("Unable to apply some changes in the patch");
    for fragment in &remaining.fragments {
        warn!("  {}", fragment.path);
    }
    warn!("Problematic parts have been moved to {shown}");
    warn!("There are two ways to fix this:");
    warn!("1) Fix the problematic parts in {} and try again", ws.display_path(&patch));
    warn!("2) Manually apply the proper changes to the native folders, run `nativepatch patch` to update the patch and then try again");
}
