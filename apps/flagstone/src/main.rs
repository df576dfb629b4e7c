//! # Flagstone CLI
//!
//! `flagstone check <name>` exits 0 when the toggle is on and 1 when it is
//! off, so it can gate shell scripts. Any error exits 2.

use clap::{Parser, Subcommand};
use flagstone::cli::{StoreKind, StoreOptions, cmd_check, cmd_list, cmd_set};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "flagstone", version, about = "Resolve boolean feature toggles")]
struct Cli {
    /// Store backend.
    #[arg(long, value_enum, default_value = "redb", global = true)]
    store: StoreKind,

    /// Database file for the redb store.
    #[arg(long, default_value = "flagstone.redb", global = true)]
    db: PathBuf,

    /// Connection URL for the redis store (defaults to FLAGSTONE_STORE_URL).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Defaults file (defaults to config/features.yml).
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    /// Runtime environment (defaults to FLAGSTONE_ENV, then APP_ENV, then development).
    #[arg(long = "env", global = true)]
    environment: Option<String>,

    /// Key namespace in the store.
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a toggle.
    Check { name: String },
    /// Overwrite a toggle in the store.
    Set {
        name: String,
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        value: bool,
    },
    /// List toggles present in the store.
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let opts = StoreOptions {
        store: cli.store,
        db: cli.db,
        url: cli.url,
        defaults: cli.defaults,
        environment: cli.environment,
        namespace: cli.namespace,
    };

    let outcome = match &cli.command {
        Command::Check { name } => cmd_check(&opts, name, cli.json).map(|r| r.value),
        Command::Set { name, value } => cmd_set(&opts, name, *value, cli.json),
        Command::List => cmd_list(&opts, cli.json).map(|_| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("flagstone=debug,flagstone_core=debug")
        } else {
            EnvFilter::new("flagstone=info,flagstone_core=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
