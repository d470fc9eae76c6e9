//! Git subprocess shell and the `git apply` primitive
//!
//! Every mutation of the snapshot and the working tree goes through a
//! blocking `git` invocation. Stdout is read through a bounded buffer and
//! stderr is spooled to an anonymous temp file, so no helper threads are
//! needed and large binary diffs fail loudly instead of being truncated.

use std::ffi::OsStr;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::core::error::{PatchError, Result};

/// Identity used for snapshot commits
pub const GIT_USER_NAME: &str = "nativepatch";
pub const GIT_USER_EMAIL: &str = "nativepatch@localhost";

/// Exit code git uses when it refuses to process the input at all
const GIT_FATAL_STATUS: i32 = 128;

/// Captured result of one git invocation
#[derive(Debug)]
pub struct GitOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Blocking git runner bound to one working directory
#[derive(Debug, Clone)]
pub struct GitShell {
    cwd: PathBuf,
    home: PathBuf,
    max_buffer: usize,
}

impl GitShell {
    /// Shell rooted at `cwd`; `HOME` points at `cwd` so user config stays out.
    pub fn new(cwd: impl Into<PathBuf>, max_buffer: usize) -> Self {
        let cwd = cwd.into();
        Self {
            home: cwd.clone(),
            cwd,
            max_buffer,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run and require a zero exit status.
    pub fn run<I, S>(&self, args: I) -> Result<GitOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let output = self.run_unchecked(&args)?;

        if !output.status.success() {
            return Err(PatchError::Git {
                command: render_args(&args),
                status: output.status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Run and return the output whatever the exit status.
    pub fn run_unchecked<I, S>(&self, args: I) -> Result<GitOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        debug!(cwd = %self.cwd.display(), "git {}", render_args(&args));

        let mut stderr_spool = tempfile::tempfile().map_err(PatchError::Spawn)?;

        let mut cmd = Command::new("git");
        cmd.args(&args)
            .current_dir(&self.cwd)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", &self.home)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_TERMINAL_PROMPT", "0")
            // Inherited from hooks or wrappers, these would redirect us
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(
                stderr_spool.try_clone().map_err(PatchError::Spawn)?,
            ));

        let mut child = cmd.spawn().map_err(PatchError::Spawn)?;

        let mut stdout = Vec::new();
        {
            let pipe = child
                .stdout
                .take()
                .ok_or_else(|| PatchError::Spawn(std::io::Error::other("stdout not captured")))?;

            // One byte past the limit tells overflow apart from an exact fit
            pipe.take(self.max_buffer as u64 + 1)
                .read_to_end(&mut stdout)
                .map_err(PatchError::Spawn)?;
        }

        if stdout.len() > self.max_buffer {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PatchError::BufferOverflow {
                limit: self.max_buffer,
            });
        }

        let status = child.wait().map_err(PatchError::Spawn)?;

        let mut raw_stderr = Vec::new();
        stderr_spool
            .seek(SeekFrom::Start(0))
            .and_then(|_| stderr_spool.read_to_end(&mut raw_stderr))
            .map_err(PatchError::Spawn)?;

        Ok(GitOutput {
            status,
            stdout,
            stderr: String::from_utf8_lossy(&raw_stderr).into_owned(),
        })
    }

    /// `git init` plus a local identity so commits never depend on user config.
    pub fn init_repository(&self) -> Result<()> {
        self.run(["init", "--quiet"])?;
        self.run(["config", "--local", "user.name", GIT_USER_NAME])?;
        self.run(["config", "--local", "user.email", GIT_USER_EMAIL])?;
        Ok(())
    }

    /// `git apply` of `patch` against this shell's directory.
    pub fn apply(&self, patch: &Path, options: ApplyOptions) -> Result<ApplyOutcome> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("apply")];
        if options.reject {
            args.push(OsStr::new("--reject"));
        }
        if options.reverse {
            args.push(OsStr::new("--reverse"));
        }
        args.push(patch.as_os_str());

        let output = self.run_unchecked(args)?;
        let diagnostics = parse_apply_stderr(&output.stderr);

        let aborted = output.status.code() == Some(GIT_FATAL_STATUS)
            || diagnostics
                .iter()
                .any(|d| matches!(d, ApplyDiagnostic::Fatal(_)));
        if aborted {
            return Err(PatchError::ApplyAborted {
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(ApplyOutcome {
            clean: output.status.success(),
            diagnostics,
        })
    }

    /// `git apply --reverse --check` restricted to `path`: succeeds when the
    /// tree already holds that file's post-image. Touches nothing.
    pub fn reverse_check(&self, patch: &Path, path: &str) -> Result<bool> {
        let include = format!("--include={path}");
        let args: [&OsStr; 5] = [
            OsStr::new("apply"),
            OsStr::new("--reverse"),
            OsStr::new("--check"),
            OsStr::new(&include),
            patch.as_os_str(),
        ];
        let output = self.run_unchecked(args)?;
        Ok(output.status.success())
    }
}

fn render_args(args: &[std::ffi::OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flags for one apply pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Write failing hunks to `<file>.rej` instead of aborting the file
    pub reject: bool,
    /// Apply the inverse of the patch
    pub reverse: bool,
}

impl ApplyOptions {
    pub const FORWARD: Self = Self {
        reject: true,
        reverse: false,
    };
    pub const REVERSE: Self = Self {
        reject: true,
        reverse: true,
    };
}

/// What `git apply` reported for one pass
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// Zero exit status: every hunk applied
    pub clean: bool,
    pub diagnostics: Vec<ApplyDiagnostic>,
}

impl ApplyOutcome {
    /// Files git skipped as a whole. These leave no `.rej` artifact.
    pub fn skipped_files(&self) -> Vec<PathBuf> {
        if self.clean {
            return Vec::new();
        }
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                ApplyDiagnostic::AlreadyExists { path } | ApplyDiagnostic::DoesNotExist { path } => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Unexpected errors, reported as-is.
    pub fn unexpected(&self) -> impl Iterator<Item = &str> {
        self.diagnostics.iter().filter_map(|d| match d {
            ApplyDiagnostic::Other(msg) => Some(msg.as_str()),
            _ => None,
        })
    }
}

/// Categorized stderr line from `git apply`.
///
/// Hunk-level failures are not listed: their `.rej` artifacts say more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyDiagnostic {
    /// `error: <path>: already exists in working directory`
    AlreadyExists { path: PathBuf },
    /// `error: <path>: No such file or directory` and friends
    DoesNotExist { path: PathBuf },
    Fatal(String),
    Other(String),
}

/// Parse git apply stderr into structured diagnostics
pub fn parse_apply_stderr(stderr: &str) -> Vec<ApplyDiagnostic> {
    let mut diagnostics = Vec::new();

    for line in stderr.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("fatal: ") {
            diagnostics.push(ApplyDiagnostic::Fatal(rest.to_string()));
        } else if line.starts_with("error: patch failed: ") {
            continue;
        } else if let Some(rest) = line.strip_prefix("error: ") {
            if let Some(path) = rest.strip_suffix(": already exists in working directory") {
                diagnostics.push(ApplyDiagnostic::AlreadyExists {
                    path: PathBuf::from(path),
                });
            } else if let Some(path) = rest
                .strip_suffix(": No such file or directory")
                .or_else(|| rest.strip_suffix(": does not exist in index"))
            {
                diagnostics.push(ApplyDiagnostic::DoesNotExist {
                    path: PathBuf::from(path),
                });
            } else if rest != "while searching for:" {
                diagnostics.push(ApplyDiagnostic::Other(rest.to_string()));
            }
        }
    }

    diagnostics
}

/// The patch/reject primitive the reconciler drives
pub trait ApplyPrimitive {
    /// Called once per apply cycle; the guard is dropped when the cycle ends.
    fn prepare(&self, root: &Path) -> Result<TemporaryRepository>;

    /// One apply pass of `patch` against `root`.
    fn apply(&self, root: &Path, patch: &Path, options: ApplyOptions) -> Result<ApplyOutcome>;

    /// Whether `path` in `root` already matches what `patch` makes of it.
    fn is_satisfied(&self, root: &Path, patch: &Path, path: &str) -> Result<bool>;
}

/// `git apply` backed primitive
#[derive(Debug, Clone)]
pub struct GitApplier {
    max_buffer: usize,
}

impl GitApplier {
    pub fn new(max_buffer: usize) -> Self {
        Self { max_buffer }
    }
}

impl ApplyPrimitive for GitApplier {
    fn prepare(&self, root: &Path) -> Result<TemporaryRepository> {
        TemporaryRepository::ensure(&GitShell::new(root, self.max_buffer))
    }

    fn apply(&self, root: &Path, patch: &Path, options: ApplyOptions) -> Result<ApplyOutcome> {
        let outcome = GitShell::new(root, self.max_buffer).apply(patch, options)?;
        for d in &outcome.diagnostics {
            debug!(?d, reverse = options.reverse, "git apply");
        }
        Ok(outcome)
    }

    fn is_satisfied(&self, root: &Path, patch: &Path, path: &str) -> Result<bool> {
        GitShell::new(root, self.max_buffer).reverse_check(patch, path)
    }
}

/// Scratch `.git` making the apply target the repository top level.
/// Removed on drop; a pre-existing repository is left alone.
#[derive(Debug, Default)]
pub struct TemporaryRepository {
    git_dir: Option<PathBuf>,
}

impl TemporaryRepository {
    /// Guard that owns nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ensure(shell: &GitShell) -> Result<Self> {
        let git_dir = shell.cwd().join(".git");
        if git_dir.exists() {
            return Ok(Self::none());
        }

        shell.init_repository()?;
        Ok(Self {
            git_dir: Some(git_dir),
        })
    }

    pub fn is_temporary(&self) -> bool {
        self.git_dir.is_some()
    }
}

impl Drop for TemporaryRepository {
    fn drop(&mut self) {
        if let Some(dir) = self.git_dir.take()
            && let Err(e) = fs::remove_dir_all(&dir)
        {
            warn!("failed to remove temporary repository {}: {e}", dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_stderr_parsing() {
        let stderr = r#"
Checking patch ios/first.txt...
error: while searching for:
one
two
error: patch failed: ios/first.txt:1
error: ios/new.txt: already exists in working directory
error: android/gone.txt: No such file or directory
Applying patch ios/first.txt with 1 reject...
Rejected hunk #1.
Applied patch android/first.txt cleanly.
"#;

        let diagnostics = parse_apply_stderr(stderr);
        assert_eq!(
            diagnostics,
            vec![
                ApplyDiagnostic::AlreadyExists {
                    path: PathBuf::from("ios/new.txt")
                },
                ApplyDiagnostic::DoesNotExist {
                    path: PathBuf::from("android/gone.txt")
                },
            ]
        );

        let outcome = ApplyOutcome {
            clean: false,
            diagnostics,
        };
        assert_eq!(
            outcome.skipped_files(),
            [PathBuf::from("ios/new.txt"), PathBuf::from("android/gone.txt")]
        );
        assert_eq!(outcome.unexpected().count(), 0);
    }

    #[test]
    fn test_unknown_errors_are_kept() {
        let outcome = ApplyOutcome {
            clean: false,
            diagnostics: parse_apply_stderr("error: ios/link: wrong type\n"),
        };
        assert_eq!(outcome.unexpected().collect::<Vec<_>>(), ["ios/link: wrong type"]);
    }

    #[test]
    fn test_reverse_check_detects_applied_files() {
        let dir = tempfile::tempdir().unwrap();
        let shell = GitShell::new(dir.path(), 1024 * 1024);
        let _repository = TemporaryRepository::ensure(&shell).unwrap();
        let patch = dir.path().join("add.patch");
        fs::write(
            &patch,
            "diff --git a/ios/added.txt b/ios/added.txt\nnew file mode 100644\n--- /dev/null\n+++ b/ios/added.txt\n@@ -0,0 +1 @@\n+user content\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("ios")).unwrap();

        fs::write(dir.path().join("ios/added.txt"), "template content\n").unwrap();
        assert!(!shell.reverse_check(&patch, "ios/added.txt").unwrap());

        fs::write(dir.path().join("ios/added.txt"), "user content\n").unwrap();
        assert!(shell.reverse_check(&patch, "ios/added.txt").unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("ios/added.txt")).unwrap(), "user content\n");
    }

    #[test]
    fn test_fatal_lines_are_flagged() {
        let diagnostics = parse_apply_stderr("fatal: unrecognized input\n");
        assert_eq!(
            diagnostics,
            vec![ApplyDiagnostic::Fatal("unrecognized input".into())]
        );
    }

    #[test]
    fn test_buffer_overflow_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // `git --version` prints more than 4 bytes
        let shell = GitShell::new(dir.path(), 4);
        let err = shell.run(["--version"]).unwrap_err();
        assert!(matches!(err, PatchError::BufferOverflow { limit: 4 }));

        let shell = GitShell::new(dir.path(), 1024);
        let out = shell.run(["--version"]).unwrap();
        assert!(String::from_utf8_lossy(&out.stdout).contains("git version"));
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let shell = GitShell::new(dir.path(), 1024);
        let err = shell.run(["rev-parse", "--verify", "HEAD"]).unwrap_err();
        match err {
            PatchError::Git { command, .. } => assert_eq!(command, "rev-parse --verify HEAD"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_temporary_repository_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let shell = GitShell::new(dir.path(), 1024 * 1024);

        {
            let guard = TemporaryRepository::ensure(&shell).unwrap();
            assert!(guard.is_temporary());
            assert!(dir.path().join(".git").exists());

            // A second guard sees the existing repository and owns nothing
            let nested = TemporaryRepository::ensure(&shell).unwrap();
            assert!(!nested.is_temporary());
        }

        assert!(!dir.path().join(".git").exists());
    }
}
