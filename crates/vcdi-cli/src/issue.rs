//! # Issue Subcommand
//!
//! Validates a credential and attaches an `ecdsa-sd-2023` base proof.
//!
//! `--key` takes a secret Multikey, or `@FILE` naming a file written by
//! `vcdi keygen` (or holding the bare Multikey).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use vcdi_core::Timestamp;
use vcdi_crypto::{multikey_to_private_key, EcdsaPrivateKey};
use vcdi_ecdsa_sd::{ProofOptions, Suite};
use vcdi_vc::ProofPurpose;

use crate::config::CliConfig;

/// Arguments for `vcdi issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Unsigned credential.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Issuer secret key as a Multikey, or `@FILE`.
    #[arg(long)]
    pub key: String,

    /// Verification method id recorded in the proof.
    #[arg(long)]
    pub verification_method: String,

    /// JSON Pointer the holder must always disclose. Repeatable.
    #[arg(long = "mandatory", value_name = "POINTER")]
    pub mandatory: Vec<String>,

    /// Proof purpose.
    #[arg(long, default_value = "assertionMethod")]
    pub purpose: ProofPurpose,

    /// Creation time (RFC 3339); defaults to now.
    #[arg(long)]
    pub created: Option<String>,

    /// Challenge recorded in the proof.
    #[arg(long)]
    pub challenge: Option<String>,

    /// Domain recorded in the proof.
    #[arg(long)]
    pub domain: Option<String>,

    /// Write the signed credential here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Execute `vcdi issue`.
pub fn run_issue(args: &IssueArgs, config: &CliConfig) -> Result<u8> {
    let key = load_secret_key(&args.key)?;
    let suite = Suite::with_curve(config.canonicalizer()?, key.curve());

    let credential = crate::read_credential(&args.file)?;
    credential.validate().context("credential failed validation")?;

    let mut options = ProofOptions::new(&args.verification_method)
        .with_purpose(args.purpose)
        .with_mandatory_pointers(args.mandatory.iter().cloned());
    if let Some(created) = &args.created {
        options = options.with_created(
            Timestamp::parse(created).with_context(|| format!("invalid --created {created:?}"))?,
        );
    }
    if let Some(challenge) = &args.challenge {
        options = options.with_challenge(challenge);
    }
    if let Some(domain) = &args.domain {
        options = options.with_domain(domain);
    }

    let signed = suite
        .add_base_proof(&credential, &key, &options)
        .context("failed to create base proof")?;
    tracing::info!(
        verification_method = %args.verification_method,
        mandatory = args.mandatory.len(),
        "issued credential"
    );
    crate::write_json(&signed.into_value(), args.out.as_deref())?;
    Ok(0)
}

/// Decode `--key`: a Multikey, or `@FILE` with either a keygen document or
/// the bare Multikey.
pub fn load_secret_key(arg: &str) -> Result<EcdsaPrivateKey> {
    let multikey = match arg.strip_prefix('@') {
        Some(path) => read_secret_multikey(Path::new(path))?,
        None => arg.trim().to_string(),
    };
    multikey_to_private_key(&multikey).context("invalid secret key")
}

fn read_secret_multikey(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file: {}", path.display()))?;
    let text = text.trim();
    if !text.starts_with('{') {
        return Ok(text.to_string());
    }
    let document: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("failed to parse key file: {}", path.display()))?;
    document["secretKeyMultibase"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("no secretKeyMultibase in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcdi_crypto::{generate_key_pair, private_key_to_multikey, Curve};

    #[test]
    fn key_from_literal_and_files() {
        let (secret, public) = generate_key_pair(Curve::P256);
        let multikey = private_key_to_multikey(&secret);
        assert_eq!(load_secret_key(&multikey).unwrap().public_key(), public);

        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("issuer.key");
        std::fs::write(&bare, format!("{multikey}\n")).unwrap();
        let arg = format!("@{}", bare.display());
        assert_eq!(load_secret_key(&arg).unwrap().public_key(), public);

        let doc = dir.path().join("issuer.json");
        std::fs::write(&doc, json!({"secretKeyMultibase": multikey}).to_string()).unwrap();
        let arg = format!("@{}", doc.display());
        assert_eq!(load_secret_key(&arg).unwrap().public_key(), public);
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(load_secret_key("not-a-key").is_err());
        assert!(load_secret_key("@/nonexistent/key").is_err());

        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("public-only.json");
        std::fs::write(&doc, json!({"publicKeyMultibase": "zDn"}).to_string()).unwrap();
        assert!(load_secret_key(&format!("@{}", doc.display())).is_err());
    }
}
