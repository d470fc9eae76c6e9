//! Project status: snapshot presence and what the patch artifacts contain.

use std::fmt::Write as _;
use std::path::Path;

use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::warn;

use crate::core::error::Result;
use crate::core::patch::{ChangeKind, PatchFile, PatchSummary};
use crate::core::snapshot::SnapshotStore;
use crate::infra::io::read_optional;
use crate::infra::workspace::Workspace;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    pub initialized: bool,
    pub commits: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub snapshot: SnapshotStatus,
    pub patch: Option<PatchSummary>,
    pub rejected: Option<PatchSummary>,
}

/// Warn when a previous apply left unresolved hunks.
pub fn has_rejected_hunks(ws: &Workspace) -> bool {
    let path = ws.rejected_hunks();
    if !path.exists() {
        return false;
    }

    warn!("Found unresolved hunks in {}", ws.display_path(&path));
    warn!(
        "Apply them by hand to the native folders, delete the file and run `nativepatch patch` again"
    );
    true
}

fn summarize_file(path: &Path) -> Result<Option<PatchSummary>> {
    Ok(read_optional(path)?.map(|raw| PatchFile::parse(&raw).summary()))
}

pub fn summarize(ws: &Workspace) -> Result<StatusReport> {
    let store = SnapshotStore::new(ws);
    let initialized = store.exists();
    let commits = if initialized { store.commit_count()? } else { 0 };

    Ok(StatusReport {
        snapshot: SnapshotStatus { initialized, commits },
        patch: summarize_file(&ws.current_patch())?,
        rejected: summarize_file(&ws.rejected_hunks())?,
    })
}

impl StatusReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable rendering; `color` toggles ANSI styling.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();

        let snapshot = if self.snapshot.initialized {
            format!("initialized, {} commit(s)", self.snapshot.commits)
        } else {
            "missing, run `nativepatch init`".to_string()
        };
        let _ = writeln!(out, "{} {snapshot}", heading("snapshot:", color));

        render_section(&mut out, "current.patch:", self.patch.as_ref(), color);
        render_section(&mut out, "rejected-hunks.patch:", self.rejected.as_ref(), color);
        out
    }
}

fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn render_section(out: &mut String, title: &str, summary: Option<&PatchSummary>, color: bool) {
    let Some(summary) = summary else {
        let _ = writeln!(out, "{} none", heading(title, color));
        return;
    };

    let _ = writeln!(
        out,
        "{} {} file(s), {} hunk(s)",
        heading(title, color),
        summary.files.len(),
        summary.hunks()
    );

    for file in &summary.files {
        let marker = match file.change {
            ChangeKind::Added => "A",
            ChangeKind::Deleted => "D",
            ChangeKind::Modified => "M",
        };
        let marker = match (color, file.change) {
            (false, _) => marker.to_string(),
            (true, ChangeKind::Added) => marker.green().to_string(),
            (true, ChangeKind::Deleted) => marker.red().to_string(),
            (true, ChangeKind::Modified) => marker.yellow().to_string(),
        };

        if file.binary {
            let _ = writeln!(out, "  {marker} {} (binary)", file.path);
        } else {
            let _ = writeln!(out, "  {marker} {} +{} -{}", file.path, file.added, file.removed);
        }
    }
}
