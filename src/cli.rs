use clap::{Args, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub ci: bool,       // --ci, config `ci` or CI env
    pub strict: bool,   // global --strict
    pub root: PathBuf,  // global --root
}

#[derive(Parser)]
#[command(name = "nativepatch")]
#[command(
    about = "Keep manual edits to regenerated android/ios folders as a patch and re-apply them"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project base containing the native folders
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print warnings and errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Automated mode: errors end the process with a non-zero status
    #[arg(long, global = true)]
    pub ci: bool,

    /// Treat a missing patch and unresolved hunks as errors
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mirror the native folders and initialize the snapshot
    Init,

    /// Write user edits to patch/current.patch
    Patch,

    /// Apply patch/current.patch to the native folders
    Apply(ApplyArgs),

    /// Run an automated change on the working tree and the snapshot
    Track(TrackArgs),

    /// Show snapshot and patch status
    Status(StatusArgs),

    /// Write a default nativepatch.toml config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Stay quiet when there is no patch to apply
    #[arg(long)]
    pub skip_empty: bool,

    /// Tree to apply to instead of the project base
    #[arg(long)]
    pub location: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    /// Program to run in each tree
    #[arg(required = true)]
    pub program: OsString,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Directory to write the config file into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory to write the script into
    #[arg(long, required_unless_present = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print the script instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}
