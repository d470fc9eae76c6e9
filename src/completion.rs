//! `nativepatch completions <shell>`: completion scripts from the clap model.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell as Target;

use crate::cli::{Cli, CompletionsArgs, Shell};

const BIN_NAME: &str = "nativepatch";

fn target(shell: Shell) -> Target {
    match shell {
        Shell::Bash => Target::Bash,
        Shell::Zsh => Target::Zsh,
        Shell::Fish => Target::Fish,
        Shell::PowerShell => Target::PowerShell,
        Shell::Elvish => Target::Elvish,
    }
}

/// Render the script for `shell` into `out`.
pub fn render(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(target(shell), &mut Cli::command(), BIN_NAME, out);
}

/// Write the script into `dir` under the shell's conventional file name.
pub fn install(shell: Shell, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    clap_complete::generate_to(target(shell), &mut Cli::command(), BIN_NAME, dir)
        .with_context(|| format!("writing {shell:?} completions to {}", dir.display()))
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    match args.out_dir {
        Some(dir) if !args.stdout => {
            let path = install(args.shell, &dir)?;
            tracing::info!("Wrote completion to {}", path.display());
        }
        _ => render(args.shell, &mut std::io::stdout().lock()),
    }
    Ok(())
}
