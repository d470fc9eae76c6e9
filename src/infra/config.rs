use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, ConfigArgs};

/// Default stdout buffer for git subprocesses (large binary diffs).
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024 * 100;

const CONFIG_FILES: [&str; 4] =
    ["nativepatch.toml", "nativepatch.yaml", "nativepatch.json", ".nativepatch.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Snapshot directory, relative to the project base
    pub snapshot_dir: PathBuf,

    /// Directory holding current.patch and rejected-hunks.patch
    pub patch_dir: PathBuf,

    /// Generated native folders tracked by the patch
    pub native_dirs: Vec<String>,

    /// Globs (relative to the project base) never mirrored into the snapshot
    pub mirror_excludes: Vec<String>,

    /// Extra .gitignore entries for the snapshot repository
    pub native_gitignore: Vec<String>,

    /// Upper bound for git stdout, larger output is an error
    pub max_buffer_bytes: usize,

    /// Force CI behavior (errors exit non-zero); unset reads the CI env var
    pub ci: Option<bool>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            snapshot_dir: PathBuf::from(".nativepatch"),
            patch_dir: PathBuf::from("patch"),
            native_dirs: vec!["android".to_string(), "ios".to_string()],
            mirror_excludes: vec![
                "ios/Pods/**".to_string(),
                "ios/build/**".to_string(),
                "android/build/**".to_string(),
            ],
            native_gitignore: Vec::new(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER,
            ci: None,
        }
    }
}

impl Config
{
    /// CI mode from config, falling back to a non-empty, non-"false" `CI` variable.
    pub fn ci_mode(&self) -> bool
    {
        self.ci
            .unwrap_or_else(|| {
                std::env::var("CI")
                    .map(|v| !v.is_empty() && v != "false" && v != "0")
                    .unwrap_or(false)
            })
    }
}

/// Load layered configuration for the project rooted at `base`.
pub fn load_config(base: &Path) -> crate::core::error::Result<Config>
{
    let mut builder = config::Config::builder();

    // First config file found wins
    for name in &CONFIG_FILES
    {
        let path = base.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // NATIVEPATCH_SNAPSHOT_DIR, NATIVEPATCH_MAX_BUFFER_BYTES, ...
    builder = builder.add_source(
        config::Environment::with_prefix("NATIVEPATCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("native_dirs")
            .with_list_parse_key("mirror_excludes")
            .with_list_parse_key("native_gitignore"),
    );

    let parsed: Config = builder
        .build()?
        .try_deserialize()?;

    Ok(parsed)
}

pub fn init(
    args: ConfigArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("nativepatch.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
