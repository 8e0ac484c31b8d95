//! # Verify Subcommand
//!
//! Verifies every proof on a credential and prints one result per proof.
//!
//! Base proofs carry their key; `--public-key` is then an optional
//! cross-check. Derived proofs carry none, so `--public-key` is required.
//!
//! Exit codes: 0 when every proof verifies, 2 when a well-formed proof does
//! not, 1 when a proof cannot be checked at all.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use vcdi_crypto::multikey_to_public_key;
use vcdi_ecdsa_sd::{ProofResult, StaticKeyResolver, Suite, VerificationMethodResolver};
use vcdi_vc::VerifiableCredential;

use crate::config::CliConfig;

/// Exit code for a proof that is well formed but does not verify.
pub const EXIT_NOT_VERIFIED: u8 = 2;

/// Arguments for `vcdi verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential to verify.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Issuer public key as a Multikey, used for every proof.
    #[arg(long)]
    pub public_key: Option<String>,
}

/// Execute `vcdi verify`.
pub fn run_verify(args: &VerifyArgs, config: &CliConfig) -> Result<u8> {
    let credential = crate::read_credential(&args.file)?;
    let results = verify_credential(&credential, args.public_key.as_deref(), config)?;
    crate::write_json(&serde_json::to_value(&results)?, None)?;
    Ok(exit_code(&results))
}

/// Verify each proof of `credential`, optionally against `public_key`.
pub fn verify_credential(
    credential: &VerifiableCredential,
    public_key: Option<&str>,
    config: &CliConfig,
) -> Result<Vec<ProofResult>> {
    let resolver = match public_key {
        Some(multikey) => {
            let key = multikey_to_public_key(multikey.trim()).context("invalid --public-key")?;
            let mut resolver = StaticKeyResolver::new();
            for proof in credential.proofs()? {
                resolver.insert(proof.verification_method, key.clone());
            }
            Some((key.curve(), resolver))
        }
        None => None,
    };
    let curve = match &resolver {
        Some((curve, _)) => *curve,
        None => crate::derive::base_proof_curve(credential)
            .context("derived proofs need --public-key")?,
    };

    let suite = Suite::with_curve(config.canonicalizer()?, curve);
    let resolver = resolver
        .as_ref()
        .map(|(_, r)| r as &dyn VerificationMethodResolver);
    let results = suite.verify_each(credential, resolver)?;
    for result in &results {
        match &result.error {
            Some(error) => tracing::warn!(index = result.index, %error, "proof could not be verified"),
            None => tracing::info!(index = result.index, verified = result.verified, "checked proof"),
        }
    }
    Ok(results)
}

/// Process exit code for a set of results.
pub fn exit_code(results: &[ProofResult]) -> u8 {
    if results.iter().any(|r| r.error.is_some()) {
        1
    } else if results.iter().all(|r| r.verified) {
        0
    } else {
        EXIT_NOT_VERIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(verified: bool, error: Option<&str>) -> ProofResult {
        ProofResult {
            index: 0,
            verification_method: "did:example:issuer#key-1".into(),
            kind: None,
            verified,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&[result(true, None), result(true, None)]), 0);
        assert_eq!(exit_code(&[result(true, None), result(false, None)]), EXIT_NOT_VERIFIED);
        assert_eq!(exit_code(&[result(false, None), result(false, Some("bad header"))]), 1);
    }
}
