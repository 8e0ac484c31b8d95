//! # Keygen Subcommand
//!
//! Generates an issuer key pair and prints both halves as Multikey strings.
//! The secret key is printed once; nothing is written unless `--out` is given.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::{json, Value};

use vcdi_crypto::{generate_key_pair, private_key_to_multikey, public_key_to_multikey, Curve};

/// Arguments for `vcdi keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Curve of the new key pair (p256 or p384).
    #[arg(long, default_value = "p256")]
    pub curve: Curve,

    /// Write the key pair to this file instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Execute `vcdi keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    crate::write_json(&key_pair_document(args.curve), args.out.as_deref())?;
    Ok(0)
}

fn key_pair_document(curve: Curve) -> Value {
    let (secret, public) = generate_key_pair(curve);
    tracing::info!(curve = curve.name(), "generated key pair");
    json!({
        "curve": curve.name(),
        "publicKeyMultibase": public_key_to_multikey(&public),
        "secretKeyMultibase": private_key_to_multikey(&secret),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcdi_crypto::{multikey_to_private_key, multikey_to_public_key};

    #[test]
    fn keys_decode_and_match() {
        for curve in Curve::ALL {
            let doc = key_pair_document(curve);
            assert_eq!(doc["curve"], curve.name());
            let secret = multikey_to_private_key(doc["secretKeyMultibase"].as_str().unwrap()).unwrap();
            let public = multikey_to_public_key(doc["publicKeyMultibase"].as_str().unwrap()).unwrap();
            assert_eq!(secret.public_key(), public);
            assert_eq!(public.curve(), curve);
        }
    }

    #[test]
    fn writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("issuer.json");
        let args = KeygenArgs {
            curve: Curve::P384,
            out: Some(out.clone()),
        };
        assert_eq!(run_keygen(&args).unwrap(), 0);
        let doc = crate::read_json(&out).unwrap();
        assert_eq!(doc["curve"], "P-384");
    }
}
