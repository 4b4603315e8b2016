//! Veristamp CLI - attest photos and stamp them with a verification QR code.
//!
//! Each photo is sent with its capture context to a remote attestation
//! service. Attested photos get the service's verification code drawn into
//! the bottom-right corner and are saved as JPEG.
//!
//! # Usage
//!
//! ```bash
//! # Attest a single photo taken at a known location
//! veristamp attest photo.jpg --lat 52.52 --lon 13.405
//!
//! # Attest a directory, retrying network failures, report as JSONL
//! veristamp attest ./captures/ --retries 3 --format jsonl --output report.jsonl
//!
//! # View configuration
//! veristamp config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Veristamp - attest photos and stamp them with a verification QR code.
#[derive(Parser, Debug)]
#[command(name = "veristamp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Attest images and save them with their verification code
    Attest(cli::attest::AttestArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match veristamp_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `veristamp config path`."
            );
            veristamp_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Veristamp v{}", veristamp_core::VERSION);

    match cli.command {
        Commands::Attest(args) => cli::attest::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
