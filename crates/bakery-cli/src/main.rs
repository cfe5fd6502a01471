//! bakery CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "bakery")]
#[command(about = "Multi-image container build tool", long_about = None)]
struct Cli {
    /// Path to the build manifest
    #[arg(
        short = 'f',
        long = "file",
        env = "BAKERY_FILE",
        default_value = "docker-compose.yml"
    )]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest
    Validate,
    /// List the declared services
    List,
    /// Resolve services against the environment and print the result
    Resolve {
        /// Service to resolve (all services when omitted)
        service: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build images via the local Docker daemon
    Build {
        /// Services to build, in the given order (all, in manifest order, when omitted)
        services: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => {
            commands::validate(&cli.file)?;
        }
        Commands::List => {
            commands::list(&cli.file)?;
        }
        Commands::Resolve { service, json } => {
            commands::resolve(&cli.file, service, json)?;
        }
        Commands::Build { services } => {
            commands::build(&cli.file, services).await?;
        }
    }

    Ok(())
}
