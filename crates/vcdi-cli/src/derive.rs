//! # Derive Subcommand
//!
//! Holder side: turns a credential carrying a base proof into one that
//! discloses only the mandatory fields plus the `--reveal` pointers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use vcdi_crypto::{Curve, EcdsaPublicKey};
use vcdi_ecdsa_sd::{is_base_proof, parse_base_proof, DerivedProofOptions, Suite};
use vcdi_vc::VerifiableCredential;

use crate::config::CliConfig;

/// Arguments for `vcdi derive`.
#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Credential carrying an `ecdsa-sd-2023` base proof.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// JSON Pointer to disclose. Repeatable.
    #[arg(long = "reveal", value_name = "POINTER")]
    pub reveal: Vec<String>,

    /// Write the disclosed credential here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Execute `vcdi derive`.
pub fn run_derive(args: &DeriveArgs, config: &CliConfig) -> Result<u8> {
    let credential = crate::read_credential(&args.file)?;
    let suite = Suite::with_curve(config.canonicalizer()?, base_proof_curve(&credential)?);
    let disclosed = suite
        .add_derived_proof(&credential, &DerivedProofOptions::new(args.reveal.iter().cloned()))
        .context("failed to derive proof")?;
    tracing::info!(revealed = args.reveal.len(), "derived credential");
    crate::write_json(&disclosed.into_value(), args.out.as_deref())?;
    Ok(0)
}

/// Curve of the issuer key embedded in the credential's first base proof.
pub fn base_proof_curve(credential: &VerifiableCredential) -> Result<Curve> {
    let proofs = credential.proofs()?;
    let proof = proofs
        .iter()
        .find(|p| matches!(is_base_proof(&p.proof_value), Ok(true)))
        .context("credential has no base proof")?;
    let base = parse_base_proof(&proof.proof_value)?;
    Ok(EcdsaPublicKey::from_sec1(&base.public_key)?.curve())
}
