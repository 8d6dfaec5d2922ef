//! pdksync: keep a fleet of module repositories in step with their pdk template.
//!
//! # Usage
//!
//! ```text
//! pdksync run --steps clone,pdk_convert,create_commit [--set KEY=VALUE]... [--args-file FILE]
//! pdksync clone | pdk-convert | pdk-validate | pdk-update | push
//! pdksync run-a-command <COMMAND>
//! pdksync create-commit --branch-name <B> --commit-message <M>
//! pdksync create-pr --pr-title <T> [--additional-title <T>] [--label <L>]
//! pdksync clean-branches --branch-name <B>
//! pdksync gem-file-update --gem-to-test <GEM> [--gem-line <LINE>] [--gem-*-finder ... --gem-*-replacer ...]
//! pdksync run-tests --module-type litmus|traditional
//! pdksync modules list | enable <NAME> | disable <NAME>
//! ```
//!
//! Every step command accepts `--modules a,b` (or `$MODULES`) and `--json`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{modules::ModulesCommand, run::RunArgs, step::StepCommand};

/// Log filter variable, e.g. `PDKSYNC_LOG_LEVEL=debug`.
const LOG_ENV: &str = "PDKSYNC_LOG_LEVEL";

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pdksync",
    version,
    about = "Run pdk and git maintenance steps across managed module repositories",
    long_about = None,
)]
struct Cli {
    /// Config file (default: $PDKSYNC_CONFIG_PATH, then ~/.pdksync.yml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run several steps, in pipeline order, against every managed module.
    Run(RunArgs),

    #[command(flatten)]
    Step(StepCommand),

    /// Inspect and edit the managed module list.
    Modules {
        #[command(subcommand)]
        command: ModulesCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => args.run(config),
        Commands::Step(command) => command.run(config),
        Commands::Modules { command } => commands::modules::run(command, config),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
