//! skiff CLI - incremental static site builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Incremental static site builder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to skiff.toml config file
    #[arg(short, long, default_value = "skiff.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site once
    Build {
        /// Pages directory (defaults to config or "pages")
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory (defaults to config or "out")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy stylesheets unminified
        #[arg(long)]
        no_minify: bool,
    },

    /// Build, watch and serve with live reload
    Dev {
        /// Pages directory (defaults to config or "pages")
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory (defaults to config or ".skiff/dev")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Preview a built site
    Serve {
        /// Directory to serve (defaults to the build output)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Build {
            input,
            output,
            no_minify,
        } => {
            commands::build::run(config, input, output, !no_minify).await?;
        }
        Commands::Dev {
            input,
            output,
            port,
            no_open,
        } => {
            commands::dev::run(config, input, output, port, !no_open).await?;
        }
        Commands::Serve { dir, port, no_open } => {
            commands::serve::run(config, dir, port, !no_open).await?;
        }
    }

    Ok(())
}
