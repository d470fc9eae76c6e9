//! **nativepatch** - Keep manual edits to regenerated native folders alive
//!
//! A pristine mirror of the `android`/`ios` folders lives in its own git
//! repository. User edits are captured as a diff against it, and replayed onto
//! freshly generated folders with a reject-aware apply cycle.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Patch engine - snapshot, diff, apply and reconcile
pub mod core {
    /// Error taxonomy shared by the library
    pub mod error;
    pub use error::{PatchError, Result};

    /// Bounded git subprocess shell and the apply primitive
    pub mod git;
    pub use git::{ApplyPrimitive, GitApplier, GitShell, TemporaryRepository};

    /// Unified diff model, index-line normalization and summaries
    pub mod patch;
    pub use patch::{PatchFile, PatchSummary};

    /// Ignore rules for the snapshot repository
    pub mod gitignore;

    /// Copy the working tree into the snapshot
    pub mod mirror;

    /// Snapshot repository lifecycle
    pub mod snapshot;
    pub use snapshot::SnapshotStore;

    /// Working tree vs snapshot diff into current.patch
    pub mod generate;
    pub use generate::{GenerateOutcome, generate};

    /// `.rej` artifacts to patch fragments
    pub mod reject;
    pub use reject::{RejectedFragment, RejectedHunkSet};

    /// Forward apply, reverse pass, second apply
    pub mod reconcile;
    pub use reconcile::{ApplyOutcome, ApplyReport, ApplyRequest, ReconcileState, Reconciler};

    /// Automated changes applied to both trees
    pub mod tracker;
    pub use tracker::{ChangeTracker, MutationTarget};

    /// Snapshot and patch status report
    pub mod status;
    pub use status::{StatusReport, has_rejected_hunks};
}

/// Infrastructure - Configuration, context, I/O and logging
pub mod infra {
    /// Layered configuration (file + environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Project base plus loaded configuration, passed by reference
    pub mod workspace;
    pub use workspace::Workspace;

    /// Atomic writes and tolerant removals
    pub mod io;

    /// Deterministic directory walking with glob filters
    pub mod walk;
    pub use walk::TreeWalker;

    /// tracing subscriber setup and exit policy
    pub mod logging;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{ApplyOutcome, ApplyRequest, PatchError, Reconciler, SnapshotStore, generate};
pub use infra::{Config, Workspace, load_config};
