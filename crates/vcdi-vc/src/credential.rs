//! # Verifiable Credentials
//!
//! [`VerifiableCredential`] is a newtype over the credential's JSON object.
//! Arbitrary claims must survive selective disclosure unchanged, so the
//! document is not forced through a fixed struct. Typed accessors read the
//! envelope members and [`VerifiableCredential::validate`] checks the data
//! model rules.
//!
//! ## Security Invariants
//!
//! - Proofs are appended, never mutated in place. A second proof turns the
//!   `proof` member into an array.
//! - [`VerifiableCredential::without_proof`] is what gets canonicalized
//!   and signed; the proof member never signs itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use vcdi_core::{Timestamp, TimestampError, CREDENTIALS_V2_URL};

use crate::proof::{DataIntegrityProof, ProofSet};

/// Legacy v1.1 base context.
pub const CREDENTIALS_V1_URL: &str = "https://www.w3.org/2018/credentials/v1";

/// The base credential type.
pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";

/// Errors from the credential model.
#[derive(Error, Debug)]
pub enum VcError {
    /// The document is not a JSON object.
    #[error("credential must be a JSON object")]
    NotAnObject,

    /// A required member is absent.
    #[error("credential is missing {0}")]
    MissingField(String),

    /// A member has the wrong shape or value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Member name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A proof object is malformed.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// A date member is not a valid timestamp.
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn invalid(field: &str, reason: impl Into<String>) -> VcError {
    VcError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// A W3C Verifiable Credential document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifiableCredential(Map<String, Value>);

impl VerifiableCredential {
    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, VcError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(VcError::NotAnObject),
        }
    }

    /// Parse JSON text.
    pub fn from_json(text: &str) -> Result<Self, VcError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// The document as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// The underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// A member by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `@context` member.
    pub fn context(&self) -> Option<&Value> {
        self.0.get("@context")
    }

    /// The credential `id`.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// The `type` values (a single string counts as a one-element list).
    pub fn types(&self) -> Vec<&str> {
        match self.0.get("type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// The issuer identifier: the `issuer` string or `issuer.id`.
    pub fn issuer_id(&self) -> Option<&str> {
        match self.0.get("issuer")? {
            Value::String(s) => Some(s),
            Value::Object(o) => o.get("id").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The `credentialSubject` member.
    pub fn credential_subject(&self) -> Option<&Value> {
        self.0.get("credentialSubject")
    }

    fn timestamp(&self, field: &str) -> Result<Option<Timestamp>, VcError> {
        match self.0.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(Timestamp::parse_lenient(s)?)),
            Some(other) => Err(invalid(field, format!("expected a date-time string, got {other}"))),
        }
    }

    /// `validFrom`, if present.
    pub fn valid_from(&self) -> Result<Option<Timestamp>, VcError> {
        self.timestamp("validFrom")
    }

    /// `validUntil`, if present.
    pub fn valid_until(&self) -> Result<Option<Timestamp>, VcError> {
        self.timestamp("validUntil")
    }

    /// Whether `at` lies inside the validity window.
    pub fn is_valid_at(&self, at: Timestamp) -> Result<bool, VcError> {
        let after_start = self.valid_from()?.map_or(true, |from| at >= from);
        let before_end = self.valid_until()?.map_or(true, |until| at <= until);
        Ok(after_start && before_end)
    }

    /// Whether the credential is inside its validity window now.
    pub fn is_valid_now(&self) -> Result<bool, VcError> {
        self.is_valid_at(Timestamp::now())
    }

    /// Whether a `proof` member is present.
    pub fn has_proof(&self) -> bool {
        self.0.contains_key("proof")
    }

    /// The `proof` member, parsed.
    pub fn proof_set(&self) -> Result<Option<ProofSet>, VcError> {
        match self.0.get("proof") {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| VcError::InvalidProof(e.to_string())),
        }
    }

    /// All attached proofs in order (empty when there are none).
    pub fn proofs(&self) -> Result<Vec<DataIntegrityProof>, VcError> {
        Ok(self.proof_set()?.map(ProofSet::into_vec).unwrap_or_default())
    }

    /// A copy with the `proof` member removed.
    pub fn without_proof(&self) -> Self {
        let mut map = self.0.clone();
        map.remove("proof");
        Self(map)
    }

    /// Append a proof.
    pub fn add_proof(&mut self, proof: DataIntegrityProof) -> Result<(), VcError> {
        let set = match self.proof_set()? {
            Some(mut set) => {
                set.push(proof);
                set
            }
            None => ProofSet::from(proof),
        };
        self.0.insert("proof".to_string(), serde_json::to_value(set)?);
        Ok(())
    }

    /// A copy with `proof` appended.
    pub fn with_proof(&self, proof: DataIntegrityProof) -> Result<Self, VcError> {
        let mut out = self.clone();
        out.add_proof(proof)?;
        Ok(out)
    }

    /// Check the data model rules.
    ///
    /// - `@context` is present and starts with a credentials base context.
    /// - `type` includes `VerifiableCredential`.
    /// - `issuer` is a URL string or an object with an `id`.
    /// - `credentialSubject` is an object or a non-empty array of objects.
    /// - `validFrom`/`validUntil` parse and are ordered.
    /// - any `proof` member parses.
    pub fn validate(&self) -> Result<(), VcError> {
        let first_context = match self.context() {
            None => return Err(VcError::MissingField("@context".into())),
            Some(Value::Array(items)) => items.first(),
            Some(single) => Some(single),
        };
        match first_context.and_then(Value::as_str) {
            Some(CREDENTIALS_V2_URL) | Some(CREDENTIALS_V1_URL) => {}
            _ => {
                return Err(invalid(
                    "@context",
                    format!("first context must be {CREDENTIALS_V2_URL}"),
                ))
            }
        }

        if self.0.get("type").is_none() {
            return Err(VcError::MissingField("type".into()));
        }
        if !self.types().contains(&VERIFIABLE_CREDENTIAL) {
            return Err(invalid("type", "must include VerifiableCredential"));
        }

        match self.0.get("issuer") {
            None => return Err(VcError::MissingField("issuer".into())),
            Some(_) if self.issuer_id().map_or(true, str::is_empty) => {
                return Err(invalid("issuer", "must be a URL or an object with an id"))
            }
            Some(_) => {}
        }

        match self.credential_subject() {
            None => return Err(VcError::MissingField("credentialSubject".into())),
            Some(Value::Object(_)) => {}
            Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_object) => {}
            Some(_) => {
                return Err(invalid(
                    "credentialSubject",
                    "must be an object or a non-empty array of objects",
                ))
            }
        }

        if let (Some(from), Some(until)) = (self.valid_from()?, self.valid_until()?) {
            if from > until {
                return Err(invalid("validUntil", "is before validFrom"));
            }
        }

        self.proof_set()?;
        Ok(())
    }
}

impl TryFrom<Value> for VerifiableCredential {
    type Error = VcError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<VerifiableCredential> for Value {
    fn from(vc: VerifiableCredential) -> Self {
        vc.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ProofPurpose;
    use serde_json::json;

    fn make_test_vc() -> VerifiableCredential {
        VerifiableCredential::from_value(json!({
            "@context": [CREDENTIALS_V2_URL],
            "id": "urn:uuid:58172aac-d8ba-11ed-83dd-0b3aef56cc33",
            "type": ["VerifiableCredential", "ExampleCredential"],
            "issuer": "did:example:issuer",
            "validFrom": "2024-01-01T00:00:00Z",
            "validUntil": "2030-01-01T00:00:00Z",
            "credentialSubject": {"id": "did:example:subject", "name": "Alice", "age": 30}
        }))
        .unwrap()
    }

    fn proof(vm: &str) -> DataIntegrityProof {
        DataIntegrityProof::new("ecdsa-sd-2023", vm, ProofPurpose::AssertionMethod, None)
            .with_proof_value("uAAAA")
    }

    #[test]
    fn accessors() {
        let vc = make_test_vc();
        assert_eq!(vc.issuer_id(), Some("did:example:issuer"));
        assert_eq!(vc.types(), vec!["VerifiableCredential", "ExampleCredential"]);
        assert_eq!(vc.id(), Some("urn:uuid:58172aac-d8ba-11ed-83dd-0b3aef56cc33"));
        assert_eq!(vc.credential_subject().unwrap()["age"], json!(30));
        assert!(vc.validate().is_ok());
    }

    #[test]
    fn issuer_object_form() {
        let mut value = make_test_vc().into_value();
        value["issuer"] = json!({"id": "did:example:org", "name": "Org"});
        let vc = VerifiableCredential::from_value(value).unwrap();
        assert_eq!(vc.issuer_id(), Some("did:example:org"));
        assert!(vc.validate().is_ok());
    }

    #[test]
    fn not_an_object() {
        assert!(matches!(
            VerifiableCredential::from_value(json!([1, 2])),
            Err(VcError::NotAnObject)
        ));
    }

    #[test]
    fn validation_failures() {
        let cases: Vec<(&str, Value)> = vec![
            ("@context", Value::Null),
            ("type", json!(["ExampleCredential"])),
            ("issuer", json!({"name": "no id"})),
            ("credentialSubject", json!([])),
            ("validUntil", json!("2020-01-01T00:00:00Z")),
            ("validFrom", json!("not a date")),
        ];
        for (field, replacement) in cases {
            let mut value = make_test_vc().into_value();
            if replacement.is_null() {
                value.as_object_mut().unwrap().remove(field);
            } else {
                value[field] = replacement;
            }
            let vc = VerifiableCredential::from_value(value).unwrap();
            assert!(vc.validate().is_err(), "{field} should fail validation");
        }
    }

    #[test]
    fn wrong_base_context() {
        let mut value = make_test_vc().into_value();
        value["@context"] = json!(["https://example.org/other", CREDENTIALS_V2_URL]);
        let vc = VerifiableCredential::from_value(value).unwrap();
        assert!(vc.validate().is_err());
    }

    #[test]
    fn validity_window() {
        let vc = make_test_vc();
        let inside = Timestamp::parse("2025-06-01T00:00:00Z").unwrap();
        let before = Timestamp::parse("2023-06-01T00:00:00Z").unwrap();
        let after = Timestamp::parse("2031-06-01T00:00:00Z").unwrap();
        assert!(vc.is_valid_at(inside).unwrap());
        assert!(!vc.is_valid_at(before).unwrap());
        assert!(!vc.is_valid_at(after).unwrap());
    }

    #[test]
    fn proofs_accumulate() {
        let mut vc = make_test_vc();
        assert!(vc.proofs().unwrap().is_empty());
        vc.add_proof(proof("did:example:issuer#key-1")).unwrap();
        assert!(vc.get("proof").unwrap().is_object());
        vc.add_proof(proof("did:example:issuer#key-2")).unwrap();
        assert!(vc.get("proof").unwrap().is_array());
        assert_eq!(vc.proofs().unwrap().len(), 2);
        assert!(vc.validate().is_ok());
    }

    #[test]
    fn without_proof_strips_member() {
        let vc = make_test_vc().with_proof(proof("did:x#k")).unwrap();
        assert!(vc.has_proof());
        let stripped = vc.without_proof();
        assert!(!stripped.has_proof());
        assert_eq!(stripped, make_test_vc());
    }

    #[test]
    fn malformed_proof_member() {
        let mut value = make_test_vc().into_value();
        value["proof"] = json!({"type": "DataIntegrityProof"});
        let vc = VerifiableCredential::from_value(value).unwrap();
        assert!(matches!(vc.proofs(), Err(VcError::InvalidProof(_))));
        assert!(vc.validate().is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let vc = make_test_vc();
        let text = serde_json::to_string(&vc).unwrap();
        assert!(text.starts_with('{'));
        let back: VerifiableCredential = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vc);
    }
}
