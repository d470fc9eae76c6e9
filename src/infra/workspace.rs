//! Process context: project base, loaded configuration and the paths derived
//! from them. Built once in `main` and passed by reference.

use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::infra::config::{Config, load_config};

pub const CURRENT_PATCH: &str = "current.patch";
pub const REJECTED_HUNKS: &str = "rejected-hunks.patch";

#[derive(Debug, Clone)]
pub struct Workspace
{
    base: PathBuf,
    config: Config,
}

impl Workspace
{
    /// Resolve `base` and load its configuration.
    pub fn open(base: &Path) -> Result<Self>
    {
        let base = dunce::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());
        let config = load_config(&base)?;
        Ok(Self { base, config })
    }

    /// Build from an already loaded config (tests, embedding).
    pub fn with_config(
        base: impl Into<PathBuf>,
        config: Config,
    ) -> Self
    {
        Self { base: base.into(), config }
    }

    /// Re-read configuration from disk and environment.
    pub fn reload(&mut self) -> Result<()>
    {
        self.config = load_config(&self.base)?;
        Ok(())
    }

    pub fn base(&self) -> &Path
    {
        &self.base
    }

    pub fn config(&self) -> &Config
    {
        &self.config
    }

    pub fn native_dirs(&self) -> &[String]
    {
        &self.config.native_dirs
    }

    /// Root of the snapshot mirror and its repository.
    pub fn snapshot_dir(&self) -> PathBuf
    {
        self.base
            .join(&self.config.snapshot_dir)
    }

    pub fn patch_dir(&self) -> PathBuf
    {
        self.base
            .join(&self.config.patch_dir)
    }

    pub fn current_patch(&self) -> PathBuf
    {
        self.patch_dir()
            .join(CURRENT_PATCH)
    }

    pub fn rejected_hunks(&self) -> PathBuf
    {
        self.patch_dir()
            .join(REJECTED_HUNKS)
    }

    /// Path relative to the project base, for log output.
    pub fn display_path<'a>(
        &self,
        path: &'a Path,
    ) -> std::path::Display<'a>
    {
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .display()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn derived_paths_follow_config()
    {
        let config = Config {
            snapshot_dir: PathBuf::from(".snap"),
            patch_dir: PathBuf::from("patches"),
            ..Config::default()
        };
        let ws = Workspace::with_config("/project", config);

        assert_eq!(ws.snapshot_dir(), PathBuf::from("/project/.snap"));
        assert_eq!(ws.current_patch(), PathBuf::from("/project/patches/current.patch"));
        assert_eq!(ws.rejected_hunks(), PathBuf::from("/project/patches/rejected-hunks.patch"));
        assert_eq!(
            ws.display_path(Path::new("/project/patches/rejected-hunks.patch"))
                .to_string(),
            "patches/rejected-hunks.patch"
        );
    }

    #[test]
    fn reload_picks_up_new_config()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.native_dirs(), ["android", "ios"]);

        std::fs::write(
            dir.path()
                .join("nativepatch.toml"),
            "native_dirs = [\"ios\"]\n",
        )
        .unwrap();
        ws.reload()
            .unwrap();
        assert_eq!(ws.native_dirs(), ["ios"]);
    }
}
