//! # Canonicalize Subcommand
//!
//! Prints the canonical N-Quads of a JSON-LD document (proofs removed), or
//! their hash with `--hash`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::CliConfig;

/// Arguments for `vcdi canonicalize`.
#[derive(Args, Debug)]
pub struct CanonicalizeArgs {
    /// JSON-LD document to canonicalize.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the hash of the canonical form instead of the N-Quads.
    #[arg(long)]
    pub hash: bool,

    /// Hash algorithm used with `--hash`.
    #[arg(long, default_value = "sha256")]
    pub algorithm: String,
}

/// Execute `vcdi canonicalize`.
pub fn run_canonicalize(args: &CanonicalizeArgs, config: &CliConfig) -> Result<u8> {
    print!("{}", canonical_output(args, config)?);
    Ok(0)
}

fn canonical_output(args: &CanonicalizeArgs, config: &CliConfig) -> Result<String> {
    let canonicalizer = config.canonicalizer()?;
    let mut document = crate::read_json(&args.file)?;
    if let Some(map) = document.as_object_mut() {
        map.remove("proof");
    }
    if args.hash {
        let digest = canonicalizer
            .hash_with_algorithm(&document, &args.algorithm)
            .context("failed to hash document")?;
        return Ok(format!("{digest}\n"));
    }
    let nquads = canonicalizer
        .canonicalize(&document)
        .context("failed to canonicalize document")?;
    tracing::debug!(statements = nquads.len(), "canonicalized document");
    Ok(nquads.as_str().to_string())
}
