//! Shared test utilities for integration tests
//!
//! Builds throwaway projects with native folders, a snapshot and helpers
//! to run the patch cycle against real git.

#![allow(dead_code)]

use assert_fs::prelude::*;

use nativepatch::core::git::GitApplier;
use nativepatch::core::reconcile::{ApplyReport, ApplyRequest, Reconciler};
use nativepatch::core::{GenerateOutcome, SnapshotStore};
use nativepatch::infra::{Config, Workspace};

/// Temporary project with `android`/`ios` folders
pub struct Project
{
    pub dir: assert_fs::TempDir,
    pub ws: Workspace,
}

impl Project
{
    /// Write `files` and take a snapshot of them as the pristine state.
    pub fn pristine(files: &[(&str, &str)]) -> Self
    {
        Self::pristine_with(files, Config::default())
    }

    pub fn pristine_with(
        files: &[(&str, &str)],
        config: Config,
    ) -> Self
    {
        let dir = assert_fs::TempDir::new().expect("tempdir");

        // Both native folders must exist even when a test only uses one
        for native in &config.native_dirs
        {
            std::fs::create_dir_all(dir.path().join(native)).expect("native dir");
        }
        for (path, body) in files
        {
            dir.child(path)
                .write_str(body)
                .expect("write fixture");
        }

        let ws = Workspace::with_config(dir.path(), config);
        SnapshotStore::new(&ws)
            .initialize()
            .expect("initialize snapshot");

        Self { dir, ws }
    }

    pub fn write(
        &self,
        path: &str,
        body: &str,
    )
    {
        self.dir
            .child(path)
            .write_str(body)
            .expect("write");
    }

    pub fn read(
        &self,
        path: &str,
    ) -> String
    {
        std::fs::read_to_string(self.dir.path().join(path)).expect("read")
    }

    pub fn exists(
        &self,
        path: &str,
    ) -> bool
    {
        self.dir
            .path()
            .join(path)
            .exists()
    }

    pub fn patch(&self) -> GenerateOutcome
    {
        nativepatch::generate(&self.ws).expect("generate patch")
    }

    pub fn apply(&self) -> ApplyReport
    {
        self.apply_request(ApplyRequest::default())
    }

    pub fn apply_request(
        &self,
        request: ApplyRequest,
    ) -> ApplyReport
    {
        let applier = GitApplier::new(
            self.ws
                .config()
                .max_buffer_bytes,
        );
        Reconciler::new(&self.ws, applier)
            .apply(request)
            .expect("apply patch")
    }

    pub fn current_patch(&self) -> String
    {
        std::fs::read_to_string(self.ws.current_patch()).expect("current.patch")
    }

    pub fn rejected_hunks(&self) -> Option<String>
    {
        std::fs::read_to_string(self.ws.rejected_hunks()).ok()
    }
}
