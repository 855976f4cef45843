// Stagerun CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so `--output -` keeps stdout clean.

mod commands;
mod loader;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stagerun")]
#[command(about = "Stagerun CLI - Run declarative stage workflows against a payload")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub format: String,

    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow against a payload
    Run {
        /// Workflow config file (JSON, or YAML by extension)
        #[arg(long, short)]
        config: PathBuf,

        /// Payload file (JSON, or YAML by extension)
        #[arg(long, short)]
        payload: PathBuf,

        /// Result file, or "-" for stdout
        #[arg(long, short, default_value = "outputLog.json")]
        output: String,

        /// Seed for non-deterministic stages (overrides STAGERUN_SEED)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check a workflow config without running it
    Validate {
        /// Workflow config file (JSON, or YAML by extension)
        #[arg(long, short)]
        config: PathBuf,
    },

    /// List the built-in abilities
    Abilities,
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet {
        "stagerun=warn"
    } else {
        "stagerun=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);
    let output_format = output::OutputFormat::from_str(&cli.format);

    match cli.command {
        Commands::Run {
            config,
            payload,
            output,
            seed,
        } => {
            let args = commands::run::RunArgs {
                config,
                payload,
                output,
                seed,
            };
            commands::run::run(args, output_format, cli.quiet).await
        }
        Commands::Validate { config } => commands::validate::run(&config, output_format).await,
        Commands::Abilities => commands::abilities::run(output_format),
    }
}
