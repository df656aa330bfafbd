//! assessly CLI: take assessments from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "assessly", version, about = "Take training assessments from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an assessment, resuming any saved draft
    Take {
        /// Assessment id
        #[arg(long)]
        assessment: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for draft files (overrides config)
        #[arg(long)]
        draft_dir: Option<PathBuf>,
    },

    /// Inspect or discard saved drafts
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Create a starter config
    Init,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Show the saved answers for an assessment
    Show {
        /// Assessment id
        #[arg(long)]
        assessment: String,

        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete the saved answers for an assessment
    Clear {
        /// Assessment id
        #[arg(long)]
        assessment: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // stdout carries prompts; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assessly=warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            assessment,
            config,
            draft_dir,
        } => commands::take::execute(assessment, config, draft_dir).await,
        Commands::Draft { action } => match action {
            DraftAction::Show {
                assessment,
                json,
                config,
            } => commands::draft::show(assessment, config, json),
            DraftAction::Clear { assessment, config } => commands::draft::clear(assessment, config),
        },
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
