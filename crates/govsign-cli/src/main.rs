//! # govsign CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use govsign_cli::inspect::{run_inspect, InspectArgs};
use govsign_cli::keys::{run_keygen, KeygenArgs};
use govsign_cli::sign::{run_countersign, run_sign, CountersignArgs, SignArgs};
use govsign_cli::ts_query::{run_ts_query, TsQueryArgs};
use govsign_cli::verify::{run_verify, VerifyArgs};

/// govsign: multi-party ASiC-E signature containers
///
/// Signs documents into ASiC-E containers, collects countersignatures, and
/// verifies every signature independently of whoever produced it.
#[derive(Parser, Debug)]
#[command(name = "govsign", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 signer key and self-signed certificate.
    Keygen(KeygenArgs),

    /// Sign a document into a new container.
    Sign(SignArgs),

    /// Append the next signature to an existing container.
    Countersign(CountersignArgs),

    /// Verify every signature in a container.
    Verify(VerifyArgs),

    /// Show a container's contents without verifying them.
    Inspect(InspectArgs),

    /// Write a DER RFC 3161 timestamp request.
    #[command(name = "ts-query")]
    TsQuery(TsQueryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "govsign CLI starting");

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Sign(args) => run_sign(&args),
        Commands::Countersign(args) => run_countersign(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Inspect(args) => run_inspect(&args),
        Commands::TsQuery(args) => run_ts_query(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
