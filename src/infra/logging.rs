//! Logging setup and the `log(message, level)` contract.
//!
//! User-facing messages are `tracing` events printed without timestamps or
//! targets. An `Error` never exits the process from here: the operation
//! returns `Err`, and `main` decides the exit status (non-zero in CI).

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Filter variable, e.g. `NATIVEPATCH_LOG=debug`.
pub const LOG_ENV: &str = "NATIVEPATCH_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Level
{
    #[default]
    Info,
    Warning,
    Error,
}

pub fn log(
    message: &str,
    level: Level,
)
{
    match level
    {
        Level::Info => info!("{message}"),
        Level::Warning => warn!("{message}"),
        Level::Error => error!("{message}"),
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(
    quiet: bool,
    no_color: bool,
)
{
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Exit status for a failed command.
pub fn exit_code(ci: bool) -> i32
{
    if ci { 1 } else { 0 }
}
