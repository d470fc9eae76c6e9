use anyhow::{Context, Result, bail};
use clap::Parser;
use nativepatch::cli::{AppContext, ApplyArgs, Cli, Commands, StatusArgs, TrackArgs};
use nativepatch::core::git::GitApplier;
use nativepatch::core::reconcile::{ApplyOutcome, ApplyRequest, Reconciler};
use nativepatch::core::{PatchError, SnapshotStore, status, tracker};
use nativepatch::infra::logging::{self, Level};
use nativepatch::infra::{Config, Workspace, config};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.no_color);

    // Refined once the project config is loaded
    let mut ci = cli.ci || Config::default().ci_mode();
    if let Err(e) = run(cli, &mut ci) {
        logging::log(&format!("{e:#}"), Level::Error);
        std::process::exit(logging::exit_code(ci));
    }
}

fn run(cli: Cli, ci_mode: &mut bool) -> Result<()> {
    let Cli {
        command,
        root,
        no_color,
        quiet,
        ci,
        strict,
    } = cli;

    // No project needed for these
    if let Commands::Completions(args) = command {
        return nativepatch::completion::run(args);
    }

    // Build a context once, pass everywhere
    let ws = Workspace::open(&root).with_context(|| format!("failed to load project at {}", root.display()))?;
    *ci_mode = ci || ws.config().ci_mode();
    let ctx = AppContext {
        quiet,
        no_color,
        ci: *ci_mode,
        strict,
        root: ws.base().to_path_buf(),
    };

    match command {
        Commands::Init => {
            SnapshotStore::new(&ws).initialize()?;
            Ok(())
        }
        Commands::Patch => {
            status::has_rejected_hunks(&ws);
            nativepatch::generate(&ws)?;
            Ok(())
        }
        Commands::Apply(args) => apply(&ws, args, &ctx),
        Commands::Track(args) => track(&ws, args),
        Commands::Status(args) => show_status(&ws, args, &ctx),
        Commands::Config(args) => config::init(args, &ctx),
        Commands::Completions(_) => unreachable!("handled before the project is opened"),
    }
}

fn apply(ws: &Workspace, args: ApplyArgs, ctx: &AppContext) -> Result<()> {
    let request = ApplyRequest {
        skip_empty: args.skip_empty,
        location: args.location.map(|l| ctx.root.join(l)),
    };

    let report = Reconciler::new(ws, GitApplier::new(ws.config().max_buffer_bytes)).apply(request)?;
    tracing::debug!(trail = ?report.trail, "apply finished");

    match report.outcome {
        ApplyOutcome::NoPatch if ctx.strict && !args.skip_empty => Err(PatchError::MissingPatch {
            path: ws.current_patch(),
        }
        .into()),
        ApplyOutcome::Unresolved { rejected_path, files } if ctx.strict || ctx.ci => {
            Err(PatchError::UnresolvedConflict { rejected_path, files }.into())
        }
        _ => Ok(()),
    }
}

fn track(ws: &Workspace, args: TrackArgs) -> Result<()> {
    if !SnapshotStore::new(ws).exists() {
        bail!(PatchError::MissingWorkingTree { path: ws.snapshot_dir() });
    }
    tracker::track(ws, tracker::program_mutation(ws, &args.program, &args.args))
}

fn show_status(ws: &Workspace, args: StatusArgs, ctx: &AppContext) -> Result<()> {
    let report = status::summarize(ws)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render(!ctx.no_color));
        status::has_rejected_hunks(ws);
    }
    Ok(())
}
