//! Integration test: the keygen → issue → derive → verify pipeline through
//! the subcommand handlers, with every hand-off going through a file.

use std::path::Path;

use serde_json::{json, Value};
use vcdi_cli::config::CliConfig;
use vcdi_cli::derive::{run_derive, DeriveArgs};
use vcdi_cli::issue::{run_issue, IssueArgs};
use vcdi_cli::keygen::{run_keygen, KeygenArgs};
use vcdi_cli::verify::{exit_code, verify_credential, EXIT_NOT_VERIFIED};
use vcdi_cli::{read_credential, read_json};
use vcdi_crypto::Curve;
use vcdi_vc::ProofPurpose;

const VM: &str = "did:example:issuer#key-1";

fn write(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn issue_args(dir: &Path, mandatory: &[&str]) -> IssueArgs {
    IssueArgs {
        file: dir.join("credential.json"),
        key: format!("@{}", dir.join("issuer.json").display()),
        verification_method: VM.into(),
        mandatory: mandatory.iter().map(|p| p.to_string()).collect(),
        purpose: ProofPurpose::AssertionMethod,
        created: Some("2024-01-02T03:04:05Z".into()),
        challenge: None,
        domain: None,
        out: Some(dir.join("signed.json")),
    }
}

fn setup(curve: Curve) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let keygen = KeygenArgs {
        curve,
        out: Some(dir.path().join("issuer.json")),
    };
    assert_eq!(run_keygen(&keygen).unwrap(), 0);
    let keys = read_json(&dir.path().join("issuer.json")).unwrap();
    write(
        &dir.path().join("credential.json"),
        &json!({
            "@context": ["https://www.w3.org/ns/credentials/v2"],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": {
                "id": "did:example:alice",
                "name": "Alice",
                "age": 30
            }
        }),
    );
    let public = keys["publicKeyMultibase"].as_str().unwrap().to_string();
    (dir, public)
}

#[test]
fn pipeline_verifies_on_both_curves() {
    for curve in Curve::ALL {
        let (dir, public) = setup(curve);
        let config = CliConfig::default();

        assert_eq!(run_issue(&issue_args(dir.path(), &["/credentialSubject/id"]), &config).unwrap(), 0);
        let signed = read_credential(&dir.path().join("signed.json")).unwrap();
        let results = verify_credential(&signed, None, &config).unwrap();
        assert_eq!(exit_code(&results), 0);

        let derive = DeriveArgs {
            file: dir.path().join("signed.json"),
            reveal: vec!["/credentialSubject/name".into()],
            out: Some(dir.path().join("disclosed.json")),
        };
        assert_eq!(run_derive(&derive, &config).unwrap(), 0);
        let disclosed = read_credential(&dir.path().join("disclosed.json")).unwrap();
        let subject = disclosed.credential_subject().unwrap();
        assert_eq!(subject["id"], "did:example:alice");
        assert_eq!(subject["name"], "Alice");
        assert!(subject.get("age").is_none());

        let results = verify_credential(&disclosed, Some(&public), &config).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].verified);
        assert_eq!(exit_code(&results), 0);
    }
}

#[test]
fn derived_proof_without_public_key_is_an_error() {
    let (dir, _) = setup(Curve::P256);
    let config = CliConfig::default();
    run_issue(&issue_args(dir.path(), &[]), &config).unwrap();
    let derive = DeriveArgs {
        file: dir.path().join("signed.json"),
        reveal: vec!["/credentialSubject/age".into()],
        out: Some(dir.path().join("disclosed.json")),
    };
    run_derive(&derive, &config).unwrap();
    let disclosed = read_credential(&dir.path().join("disclosed.json")).unwrap();
    assert!(verify_credential(&disclosed, None, &config).is_err());
}

#[test]
fn edited_disclosure_exits_not_verified() {
    let (dir, public) = setup(Curve::P256);
    let config = CliConfig::default();
    run_issue(&issue_args(dir.path(), &["/credentialSubject/id"]), &config).unwrap();
    let derive = DeriveArgs {
        file: dir.path().join("signed.json"),
        reveal: vec!["/credentialSubject/name".into()],
        out: Some(dir.path().join("disclosed.json")),
    };
    run_derive(&derive, &config).unwrap();

    let mut value = read_json(&dir.path().join("disclosed.json")).unwrap();
    value["credentialSubject"]["name"] = json!("Mallory");
    write(&dir.path().join("edited.json"), &value);
    let edited = read_credential(&dir.path().join("edited.json")).unwrap();
    let results = verify_credential(&edited, Some(&public), &config).unwrap();
    assert!(!results[0].verified);
    assert_eq!(exit_code(&results), EXIT_NOT_VERIFIED);
}

#[test]
fn invalid_credentials_are_not_issued() {
    let (dir, _) = setup(Curve::P256);
    write(
        &dir.path().join("credential.json"),
        &json!({
            "@context": ["https://www.w3.org/ns/credentials/v2"],
            "type": ["VerifiableCredential"],
            "credentialSubject": {"name": "Alice"}
        }),
    );
    assert!(run_issue(&issue_args(dir.path(), &[]), &CliConfig::default()).is_err());
    assert!(!dir.path().join("signed.json").exists());
}
