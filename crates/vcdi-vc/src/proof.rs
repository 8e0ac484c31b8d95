//! # Data Integrity Proofs
//!
//! The proof object attached to credentials and the `proof` member's
//! single-or-array shape.
//!
//! ## Security Invariant
//!
//! Proof objects have a rigid structure (`deny_unknown_fields`). A member
//! that is not part of the proof configuration cannot ride along unsigned.
//! `challenge` and `domain` are carried on the proof so a verifier can
//! rebuild the exact configuration that was signed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vcdi_core::Timestamp;

use crate::credential::VcError;

/// The `type` of every proof handled here.
pub const DATA_INTEGRITY_PROOF: &str = "DataIntegrityProof";

/// Why a proof was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the credential claims.
    #[default]
    AssertionMethod,
    /// The holder authenticates.
    Authentication,
    /// A capability is invoked.
    CapabilityInvocation,
    /// A capability is delegated.
    CapabilityDelegation,
    /// Key agreement.
    KeyAgreement,
}

impl ProofPurpose {
    /// The vocabulary term.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssertionMethod => "assertionMethod",
            Self::Authentication => "authentication",
            Self::CapabilityInvocation => "capabilityInvocation",
            Self::CapabilityDelegation => "capabilityDelegation",
            Self::KeyAgreement => "keyAgreement",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofPurpose {
    type Err = VcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assertionMethod" => Ok(Self::AssertionMethod),
            "authentication" => Ok(Self::Authentication),
            "capabilityInvocation" => Ok(Self::CapabilityInvocation),
            "capabilityDelegation" => Ok(Self::CapabilityDelegation),
            "keyAgreement" => Ok(Self::KeyAgreement),
            other => Err(VcError::InvalidField {
                field: "proofPurpose".into(),
                reason: format!("unknown proof purpose {other:?}"),
            }),
        }
    }
}

/// A `DataIntegrityProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DataIntegrityProof {
    /// Always `DataIntegrityProof` for proofs created here.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// Cryptosuite identifier, e.g. `ecdsa-sd-2023`.
    pub cryptosuite: String,

    /// Creation time (UTC, seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    /// URL of the key that made the proof.
    pub verification_method: String,

    /// Why the proof was made.
    pub proof_purpose: ProofPurpose,

    /// Multibase-encoded proof bytes. Empty while the proof is a
    /// configuration being signed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proof_value: String,

    /// Verifier-supplied challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,

    /// Intended domain of the proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl DataIntegrityProof {
    /// A proof with no value yet.
    pub fn new(
        cryptosuite: impl Into<String>,
        verification_method: impl Into<String>,
        proof_purpose: ProofPurpose,
        created: Option<Timestamp>,
    ) -> Self {
        Self {
            proof_type: DATA_INTEGRITY_PROOF.to_string(),
            cryptosuite: cryptosuite.into(),
            created,
            verification_method: verification_method.into(),
            proof_purpose,
            proof_value: String::new(),
            challenge: None,
            domain: None,
        }
    }

    /// Set the challenge.
    pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.challenge = Some(challenge.into());
        self
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the proof value.
    pub fn with_proof_value(mut self, proof_value: impl Into<String>) -> Self {
        self.proof_value = proof_value.into();
        self
    }

    /// The proof options without `proofValue`.
    pub fn configuration(&self) -> Self {
        Self {
            proof_value: String::new(),
            ..self.clone()
        }
    }

    /// Check type, cryptosuite and presence of a proof value.
    pub fn validate(&self, cryptosuite: &str) -> Result<(), VcError> {
        if self.proof_type != DATA_INTEGRITY_PROOF {
            return Err(VcError::InvalidProof(format!(
                "expected type {DATA_INTEGRITY_PROOF}, got {:?}",
                self.proof_type
            )));
        }
        if self.cryptosuite != cryptosuite {
            return Err(VcError::InvalidProof(format!(
                "expected cryptosuite {cryptosuite}, got {:?}",
                self.cryptosuite
            )));
        }
        if self.proof_value.is_empty() {
            return Err(VcError::InvalidProof("proofValue is empty".into()));
        }
        if self.verification_method.is_empty() {
            return Err(VcError::InvalidProof("verificationMethod is empty".into()));
        }
        Ok(())
    }

    /// Parse from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, VcError> {
        serde_json::from_value(value).map_err(|e| VcError::InvalidProof(e.to_string()))
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, VcError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The `proof` member: one proof or an array of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofSet {
    /// A single proof object.
    Single(Box<DataIntegrityProof>),
    /// An array of proofs.
    Set(Vec<DataIntegrityProof>),
}

impl Default for ProofSet {
    fn default() -> Self {
        Self::Set(Vec::new())
    }
}

impl ProofSet {
    /// Append a proof, turning a single proof into an array.
    pub fn push(&mut self, proof: DataIntegrityProof) {
        match self {
            Self::Single(existing) => {
                let prev = (**existing).clone();
                *self = Self::Set(vec![prev, proof]);
            }
            Self::Set(proofs) => proofs.push(proof),
        }
    }

    /// Number of proofs.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Set(proofs) => proofs.len(),
        }
    }

    /// Whether there are no proofs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the proofs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DataIntegrityProof> {
        match self {
            Self::Single(p) => std::slice::from_ref(p.as_ref()).iter(),
            Self::Set(proofs) => proofs.iter(),
        }
    }

    /// Consume into a list.
    pub fn into_vec(self) -> Vec<DataIntegrityProof> {
        match self {
            Self::Single(p) => vec![*p],
            Self::Set(proofs) => proofs,
        }
    }

    /// Whether the member was an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

impl From<DataIntegrityProof> for ProofSet {
    fn from(proof: DataIntegrityProof) -> Self {
        Self::Single(Box::new(proof))
    }
}

impl<'a> IntoIterator for &'a ProofSet {
    type Item = &'a DataIntegrityProof;
    type IntoIter = std::slice::Iter<'a, DataIntegrityProof>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
