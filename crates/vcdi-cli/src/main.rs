//! # vcdi CLI entry point
//!
//! Parses command-line arguments, sets up logging and dispatches to the
//! subcommand handlers in the library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use vcdi_cli::canonicalize::{run_canonicalize, CanonicalizeArgs};
use vcdi_cli::config::CliConfig;
use vcdi_cli::derive::{run_derive, DeriveArgs};
use vcdi_cli::issue::{run_issue, IssueArgs};
use vcdi_cli::keygen::{run_keygen, KeygenArgs};
use vcdi_cli::verify::{run_verify, VerifyArgs};

/// Selective disclosure for Verifiable Credentials (ecdsa-sd-2023).
///
/// Issue credentials with a base proof, derive proofs that reveal only
/// chosen fields, and verify either kind.
#[derive(Parser, Debug)]
#[command(name = "vcdi", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a P-256 or P-384 key pair.
    Keygen(KeygenArgs),

    /// Print the canonical N-Quads of a document, or their hash.
    Canonicalize(CanonicalizeArgs),

    /// Attach a base proof to a credential.
    Issue(IssueArgs),

    /// Derive a proof that discloses selected fields only.
    Derive(DeriveArgs),

    /// Verify every proof on a credential.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "vcdi starting");

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Canonicalize(args) => run_canonicalize(args, &config),
        Commands::Issue(args) => run_issue(args, &config),
        Commands::Derive(args) => run_derive(args, &config),
        Commands::Verify(args) => run_verify(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
