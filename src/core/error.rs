//! Error taxonomy for snapshot, patch and reconcile operations.
//!
//! Hunk-level failures during apply are collected as reject artifacts and
//! never show up here; only resource failures and conflicts that survive
//! both apply passes do.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = PatchError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PatchError {
    /// No `current.patch` to apply.
    #[error("no patch found at {}, run `nativepatch patch` to create one", path.display())]
    MissingPatch { path: PathBuf },

    /// A native folder (or the snapshot) required by the operation is absent.
    #[error("missing native folder {}, regenerate the native project and run `nativepatch init`", path.display())]
    MissingWorkingTree { path: PathBuf },

    /// Changes still rejected after the reverse pass and second apply.
    #[error(
        "unable to apply {} file(s) from the patch, rejected hunks are in {}",
        files.len(),
        rejected_path.display()
    )]
    UnresolvedConflict {
        rejected_path: PathBuf,
        files: Vec<PathBuf>,
    },

    /// Subprocess output exceeded the configured buffer.
    #[error("git output exceeded the {limit} byte buffer (raise `max_buffer_bytes`)")]
    BufferOverflow { limit: usize },

    #[error("`git {command}` failed ({status}): {stderr}")]
    Git {
        command: String,
        status: String,
        stderr: String,
    },

    /// `git apply` refused the whole patch, nothing was written.
    #[error("git apply aborted: {stderr}")]
    ApplyAborted { stderr: String },

    #[error("failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("failed to walk native folder: {0}")]
    Walk(#[from] ignore::Error),
}

impl PatchError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// `.map_err(PatchError::io)` shorthand carrying the path.
pub trait IoResultExt<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| PatchError::io(path, source))
    }
}
