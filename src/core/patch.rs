//! Unified diff model for `current.patch` and `rejected-hunks.patch`
//!
//! The artifacts themselves are produced by git and applied by git; this
//! module only normalizes the raw diff (index-line stripping) and parses it
//! leniently for summaries. Patches are handled as bytes since file content
//! is not guaranteed to be UTF-8.

use std::sync::LazyLock;

use bstr::ByteSlice;
use regex::bytes::Regex;
use serde::Serialize;

/// `index 1a2b3c4..5d6e7f8 100644`; the mode is absent for added/deleted files.
static INDEX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^index [0-9a-fA-F]+\.\.[0-9a-fA-F]+(?: [0-7]{6})?\r?\n?$")
        .unwrap_or_else(|e| panic!("index line regex: {e}"))
});

/// A single hunk in a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize, // 1-based line number in old file
    pub old_count: usize, // Number of lines in old version
    pub new_start: usize, // 1-based line number in new file
    pub new_count: usize, // Number of lines in new version
    pub lines: Vec<HunkLine>,
}

/// A line in a hunk with its change type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String), // Unchanged line (starts with ' ')
    Remove(String),  // Removed line (starts with '-')
    Add(String),     // Added line (starts with '+')
    NoNewline,       // "\ No newline at end of file"
}

impl Hunk {
    pub fn added(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Add(_)))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Remove(_)))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
}

/// All hunks for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub change: ChangeKind,
    pub binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    fn new() -> Self {
        Self {
            old_path: None,
            new_path: None,
            change: ChangeKind::Modified,
            binary: false,
            hunks: Vec::new(),
        }
    }

    /// Path the change lands on (old path for deletions).
    pub fn path(&self) -> &str {
        match self.change {
            ChangeKind::Deleted => self.old_path.as_deref(),
            _ => self.new_path.as_deref().or(self.old_path.as_deref()),
        }
        .unwrap_or("")
    }
}

/// Parsed patch artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchFile {
    pub files: Vec<FilePatch>,
}

/// Per-file totals for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub change: ChangeKind,
    pub binary: bool,
    pub hunks: usize,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    pub files: Vec<FileSummary>,
}

impl PatchSummary {
    pub fn hunks(&self) -> usize {
        self.files.iter().map(|f| f.hunks).sum()
    }
}

/// Whether a raw diff contains anything beyond whitespace.
pub fn has_changes(raw: &[u8]) -> bool {
    !raw.trim().is_empty()
}

/// Split a raw git diff into per-file sections (preamble kept as-is).
fn sections(raw: &[u8]) -> Vec<Vec<&[u8]>> {
    let mut out: Vec<Vec<&[u8]>> = vec![Vec::new()];
    for line in raw.lines_with_terminator() {
        if line.starts_with(b"diff --git ") {
            out.push(Vec::new());
        }
        if let Some(current) = out.last_mut() {
            current.push(line);
        }
    }
    out
}

fn is_binary_marker(line: &[u8]) -> bool {
    let line = line.trim_end();
    line == b"GIT binary patch" || line.starts_with(b"Binary files ")
}

/// Strip `index <hash>..<hash> [<mode>]` header lines.
///
/// Abbreviated hashes vary across git setups and would churn the patch.
/// Binary sections keep theirs: `git apply` refuses a binary hunk without
/// the full index line.
pub fn normalize(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());

    for section in sections(raw) {
        let binary = section.iter().any(|l| is_binary_marker(l));
        let mut in_header = true;

        for line in section {
            if line.starts_with(b"@@") || line.starts_with(b"--- ") {
                in_header = false;
            }
            if in_header && !binary && INDEX_LINE.is_match(line) {
                continue;
            }
            out.extend_from_slice(line);
        }
    }

    out
}

/// The whole `diff --git` section touching `path`, as it appears in `raw`.
pub fn file_section(raw: &[u8], path: &str) -> Option<Vec<u8>> {
    sections(raw).into_iter().skip(1).find_map(|section| {
        let rest = section.first()?.strip_prefix(b"diff --git ")?;
        let (old, new) = git_header_paths(rest);
        if old.as_deref() == Some(path) || new.as_deref() == Some(path) {
            Some(section.concat())
        } else {
            None
        }
    })
}

/// Strip `a/` / `b/` prefixes and trailing tab annotations from a header path.
fn header_path(raw: &[u8]) -> Option<String> {
    let raw = raw.trim_end_with(|c| c == '\n' || c == '\r');
    let raw = raw.split_str("\t").next().unwrap_or(raw);
    if raw == b"/dev/null" {
        return None;
    }
    let raw = raw
        .strip_prefix(b"a/")
        .or_else(|| raw.strip_prefix(b"b/"))
        .unwrap_or(raw);
    Some(raw.to_str_lossy().into_owned())
}

/// `diff --git a/x b/y` → (x, y); falls back to halving for paths with " b/".
fn git_header_paths(rest: &[u8]) -> (Option<String>, Option<String>) {
    let rest = rest.trim_end();
    match rest.find(" b/") {
        Some(idx) => (header_path(&rest[..idx]), header_path(&rest[idx + 1..])),
        None => (header_path(rest), None),
    }
}

/// `@@ -1,3 +1,4 @@` → (1, 3, 1, 4); a missing count means 1.
fn parse_hunk_header(line: &[u8]) -> Option<(usize, usize, usize, usize)> {
    let line = line.to_str().ok()?;
    let inner = line.strip_prefix("@@ ")?;
    let end = inner.find(" @@")?;
    let mut ranges = inner[..end].split_whitespace();

    let parse = |spec: &str, sign: char| -> Option<(usize, usize)> {
        let spec = spec.strip_prefix(sign)?;
        match spec.split_once(',') {
            Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
            None => Some((spec.parse().ok()?, 1)),
        }
    };

    let (old_start, old_count) = parse(ranges.next()?, '-')?;
    let (new_start, new_count) = parse(ranges.next()?, '+')?;
    Some((old_start, old_count, new_start, new_count))
}

fn line_text(line: &[u8]) -> String {
    line[1..]
        .trim_end_with(|c| c == '\n' || c == '\r')
        .to_str_lossy()
        .into_owned()
}

impl PatchFile {
    /// Lenient parse of git-style and traditional (`---`/`+++`) diffs.
    pub fn parse(raw: &[u8]) -> Self {
        let mut files: Vec<FilePatch> = Vec::new();
        let mut current: Option<FilePatch> = None;
        // Lines still expected on each side of the open hunk
        let mut remaining = (0usize, 0usize);

        for line in raw.lines_with_terminator() {
            if let Some(hunk) = current.as_mut().and_then(|f| f.hunks.last_mut()) {
                if remaining != (0, 0) {
                    let entry = match line.first() {
                        Some(b' ') => {
                            remaining.0 = remaining.0.saturating_sub(1);
                            remaining.1 = remaining.1.saturating_sub(1);
                            Some(HunkLine::Context(line_text(line)))
                        }
                        // git treats a bare newline as an empty context line
                        Some(b'\n') | Some(b'\r') => {
                            remaining.0 = remaining.0.saturating_sub(1);
                            remaining.1 = remaining.1.saturating_sub(1);
                            Some(HunkLine::Context(String::new()))
                        }
                        Some(b'-') => {
                            remaining.0 = remaining.0.saturating_sub(1);
                            Some(HunkLine::Remove(line_text(line)))
                        }
                        Some(b'+') => {
                            remaining.1 = remaining.1.saturating_sub(1);
                            Some(HunkLine::Add(line_text(line)))
                        }
                        Some(b'\\') => Some(HunkLine::NoNewline),
                        _ => None,
                    };
                    if let Some(entry) = entry {
                        hunk.lines.push(entry);
                        continue;
                    }
                    remaining = (0, 0);
                } else if line.starts_with(b"\\") {
                    hunk.lines.push(HunkLine::NoNewline);
                    continue;
                }
            }

            if let Some(rest) = line.strip_prefix(b"diff --git ") {
                files.extend(current.take());
                let mut file = FilePatch::new();
                (file.old_path, file.new_path) = git_header_paths(rest);
                current = Some(file);
            } else if let Some(rest) = line.strip_prefix(b"--- ") {
                // A traditional header after complete hunks starts a new file
                let starts_new = current.as_ref().is_none_or(|f| !f.hunks.is_empty());
                if starts_new {
                    files.extend(current.take());
                }
                let file = current.get_or_insert_with(FilePatch::new);
                file.old_path = header_path(rest);
                if file.old_path.is_none() {
                    file.change = ChangeKind::Added;
                }
            } else if let Some(rest) = line.strip_prefix(b"+++ ") {
                let file = current.get_or_insert_with(FilePatch::new);
                file.new_path = header_path(rest);
                if file.new_path.is_none() {
                    file.change = ChangeKind::Deleted;
                }
            } else if line.starts_with(b"new file mode") {
                if let Some(file) = current.as_mut() {
                    file.change = ChangeKind::Added;
                }
            } else if line.starts_with(b"deleted file mode") {
                if let Some(file) = current.as_mut() {
                    file.change = ChangeKind::Deleted;
                }
            } else if is_binary_marker(line) {
                if let Some(file) = current.as_mut() {
                    file.binary = true;
                }
            } else if line.starts_with(b"@@ ") {
                if let (Some(file), Some((old_start, old_count, new_start, new_count))) =
                    (current.as_mut(), parse_hunk_header(line))
                {
                    file.hunks.push(Hunk {
                        old_start,
                        old_count,
                        new_start,
                        new_count,
                        lines: Vec::new(),
                    });
                    remaining = (old_count, new_count);
                }
            }
        }

        files.extend(current);
        Self { files }
    }

    pub fn summary(&self) -> PatchSummary {
        PatchSummary {
            files: self
                .files
                .iter()
                .map(|f| FileSummary {
                    path: f.path().to_string(),
                    change: f.change,
                    binary: f.binary,
                    hunks: f.hunks.len(),
                    added: f.hunks.iter().map(Hunk::added).sum(),
                    removed: f.hunks.iter().map(Hunk::removed).sum(),
                })
                .collect(),
        }
    }
}
