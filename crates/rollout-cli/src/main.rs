mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, run::RunArgs, wait::WaitArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Ship versioned SQL migrations as a release and drive its rollout to completion",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root for relative paths (default: auto-detect from .git/)
    #[arg(long, global = true, env = "GITHUB_WORKSPACE")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Release the migrations of a merged change and wait for the rollout
    Run(RunArgs),

    /// List the migration files that would be released
    Collect {
        /// Migration directory, relative to the workspace root
        #[arg(long, env = "INPUT_DIRECTORY", default_value = cmd::DEFAULT_DIRECTORY)]
        directory: PathBuf,
    },

    /// Wait for an existing rollout, running its tasks stage by stage
    Wait(WaitArgs),

    /// Inspect the branch mapping config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) | Commands::Wait(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Collect { directory } => cmd::collect::run(&root, &directory, cli.json),
        Commands::Wait(args) => cmd::wait::run(args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
