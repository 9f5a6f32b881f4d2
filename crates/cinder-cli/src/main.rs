//! Cinder CLI - build Rust crates to wasm and serve them to a web app.

mod build;
mod clean;
mod colors;
mod list;
mod project;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Build Rust crates to wasm and serve them to a web app")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (directory containing cinder.toml)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all units in development mode and start the dev server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Maximum number of concurrent unit builds
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Build all units and emit assets for production
    Build {
        /// Maximum number of concurrent unit builds
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Build with the development profile instead
        #[arg(long)]
        dev: bool,
    },

    /// List discovered units
    List,

    /// Remove generated bindings and the production tree
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port, host, jobs } => {
            serve::execute(&cli.root, &host, port, jobs).await?;
        }

        Commands::Build { jobs, dev } => {
            build::execute(&cli.root, jobs, dev)?;
        }

        Commands::List => {
            list::execute(&cli.root)?;
        }

        Commands::Clean => {
            clean::execute(&cli.root)?;
        }
    }

    Ok(())
}
