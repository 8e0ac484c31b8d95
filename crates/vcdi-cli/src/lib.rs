//! # vcdi-cli — Command-Line Front End
//!
//! Provides the `vcdi` binary over the `ecdsa-sd-2023` suite. Every
//! subcommand reads and writes plain JSON so the three roles can run on
//! different machines:
//!
//! ```bash
//! vcdi keygen --curve p256 > issuer.json
//! vcdi issue credential.json --key z42t... --verification-method did:example:issuer#key-1 \
//!     --mandatory /issuer --out signed.json
//! vcdi derive signed.json --reveal /credentialSubject/name --out disclosed.json
//! vcdi verify disclosed.json --public-key zDn...
//! ```
//!
//! ## Subcommands
//!
//! - `vcdi keygen`: P-256 or P-384 key pair as Multikey strings.
//! - `vcdi canonicalize`: canonical N-Quads or their hash.
//! - `vcdi issue`: attach a base proof.
//! - `vcdi derive`: attach a derived proof revealing chosen fields.
//! - `vcdi verify`: verify every proof; exit 0, 2 on mismatch, 1 on error.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers return an exit code and
//!   delegate to the library crates.
//! - Results go to stdout, logs to stderr.

pub mod canonicalize;
pub mod config;
pub mod derive;
pub mod issue;
pub mod keygen;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use vcdi_vc::VerifiableCredential;

/// Read a JSON document from `path`.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse JSON: {}", path.display()))
}

/// Read a credential from `path`.
pub fn read_credential(path: &Path) -> Result<VerifiableCredential> {
    VerifiableCredential::from_value(read_json(path)?)
        .with_context(|| format!("not a credential: {}", path.display()))
}

/// Pretty-print `value` to `out`, or to stdout when no path is given.
pub fn write_json(value: &Value, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}
