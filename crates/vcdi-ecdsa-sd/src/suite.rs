//! # The `ecdsa-sd-2023` Suite
//!
//! [`Suite`] binds a curve to a [`Canonicalizer`]. Proof creation lives in
//! `base_proof` and `derived_proof`, verification in `verify`. This module
//! holds the shared plumbing: proof options, proof configuration, signing
//! and the small helpers callers need around keys and signatures.
//!
//! ## Security Invariant
//!
//! A suite never signs or verifies with a key of a different curve. That
//! is reported as [`SuiteError::CurveMismatch`], never as a failed
//! verification.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vcdi_core::{sha256, CanonicalNQuads, Canonicalizer, Timestamp};
use vcdi_crypto::{
    generate_key_pair, public_key_to_multikey, Curve, EcdsaPrivateKey,
    EcdsaPublicKey, EcdsaSignature,
};
use vcdi_vc::{DataIntegrityProof, ProofPurpose, VerifiableCredential};

use crate::error::SuiteError;

/// Cryptosuite identifier.
pub const CRYPTOSUITE: &str = "ecdsa-sd-2023";

/// Context of Multikey verification method documents.
pub const MULTIKEY_CONTEXT: &str = "https://w3id.org/security/multikey/v1";

// ---------------------------------------------------------------------------
// Proof options
// ---------------------------------------------------------------------------

/// Options for creating a base proof.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOptions {
    /// Verification method URL, e.g. `did:example:issuer#key-1`.
    pub verification_method: String,
    /// Proof purpose.
    #[serde(default)]
    pub proof_purpose: ProofPurpose,
    /// Creation time. Now when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    /// Verifier challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Intended domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Pointers the holder must always disclose.
    #[serde(default)]
    pub mandatory_pointers: Vec<String>,
}

impl ProofOptions {
    /// Options for `verification_method` with defaults everywhere else.
    pub fn new(verification_method: impl Into<String>) -> Self {
        Self {
            verification_method: verification_method.into(),
            ..Self::default()
        }
    }

    /// Set the proof purpose.
    pub fn with_purpose(mut self, purpose: ProofPurpose) -> Self {
        self.proof_purpose = purpose;
        self
    }

    /// Set the creation time.
    pub fn with_created(mut self, created: Timestamp) -> Self {
        self.created = Some(created);
        self
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

    /// Set the mandatory pointers.
    pub fn with_mandatory_pointers<S: Into<String>>(
        mut self,
        pointers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.mandatory_pointers = pointers.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Suite
// ---------------------------------------------------------------------------

/// The `ecdsa-sd-2023` cryptosuite on one curve.
#[derive(Debug, Clone)]
pub struct Suite {
    curve: Curve,
    canonicalizer: Canonicalizer,
}

impl Suite {
    /// P-256 suite.
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self::with_curve(canonicalizer, Curve::P256)
    }

    /// P-384 suite.
    pub fn new_p384(canonicalizer: Canonicalizer) -> Self {
        Self::with_curve(canonicalizer, Curve::P384)
    }

    /// Suite on `curve`.
    pub fn with_curve(canonicalizer: Canonicalizer, curve: Curve) -> Self {
        Self { curve, canonicalizer }
    }

    /// The suite's curve.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The canonicalizer in use.
    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Length of a fixed-width signature on this curve.
    pub fn signature_length(&self) -> usize {
        self.curve.signature_length()
    }

    /// Fresh key pair on this curve.
    pub fn generate_key_pair(&self) -> (EcdsaPrivateKey, EcdsaPublicKey) {
        generate_key_pair(self.curve)
    }

    pub(crate) fn check_curve(&self, key: Curve) -> Result<(), SuiteError> {
        if key != self.curve {
            return Err(SuiteError::CurveMismatch { suite: self.curve, key });
        }
        Ok(())
    }

    /// Proof configuration for `options`: the proof without a value.
    ///
    /// `proofPurpose` defaults to `assertionMethod` and `created` to the
    /// current time in whole seconds.
    pub fn create_proof_config(&self, options: &ProofOptions) -> Result<DataIntegrityProof, SuiteError> {
        if options.verification_method.is_empty() {
            return Err(SuiteError::MissingOption("verificationMethod"));
        }
        let mut config = DataIntegrityProof::new(
            CRYPTOSUITE,
            options.verification_method.clone(),
            options.proof_purpose,
            Some(options.created.unwrap_or_else(Timestamp::now)),
        );
        config.challenge = options.challenge.clone();
        config.domain = options.domain.clone();
        Ok(config)
    }

    /// Canonical N-Quads of a proof configuration under the credential's
    /// `@context`.
    pub(crate) fn canonical_proof_config(
        &self,
        proof: &DataIntegrityProof,
        context: Option<&Value>,
    ) -> Result<CanonicalNQuads, SuiteError> {
        let mut document = proof.configuration().to_value()?;
        if let (Some(context), Value::Object(map)) = (context, &mut document) {
            map.insert("@context".into(), context.clone());
        }
        Ok(self.canonicalizer.canonicalize(&document)?)
    }

    pub(crate) fn proof_config_hash(
        &self,
        proof: &DataIntegrityProof,
        context: Option<&Value>,
    ) -> Result<([u8; 32], CanonicalNQuads), SuiteError> {
        let nquads = self.canonical_proof_config(proof, context)?;
        Ok((sha256(nquads.as_bytes()), nquads))
    }

    /// Sign SHA-256(`data`); returns the fixed-width `r || s` signature.
    pub fn sign_data(&self, key: &EcdsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, SuiteError> {
        self.check_curve(key.curve())?;
        Ok(key.sign(data)?.into_bytes())
    }

    /// Verify a fixed-width signature over SHA-256(`data`).
    ///
    /// A signature of the wrong length is an error; a well-formed one that
    /// does not match is `Ok(false)`.
    pub fn verify_signature(
        &self,
        key: &EcdsaPublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, SuiteError> {
        self.check_curve(key.curve())?;
        let signature = EcdsaSignature::from_bytes(self.curve, signature)?;
        Ok(key.verify(data, &signature)?)
    }

    /// Convert a fixed-width signature to ASN.1 DER.
    pub fn signature_to_der(&self, signature: &[u8]) -> Result<Vec<u8>, SuiteError> {
        Ok(EcdsaSignature::from_bytes(self.curve, signature)?.to_der()?)
    }

    /// Convert an ASN.1 DER signature to fixed width.
    pub fn signature_from_der(&self, der: &[u8]) -> Result<Vec<u8>, SuiteError> {
        Ok(EcdsaSignature::from_der(self.curve, der)?.into_bytes())
    }

    /// Hex SHA-256 of the canonical form of the credential without proofs.
    pub fn hash_credential(&self, credential: &VerifiableCredential) -> Result<String, SuiteError> {
        Ok(self.canonicalizer.hash(&credential.without_proof().into_value())?)
    }

    /// Multikey verification method document for `public_key`. The
    /// controller is `id` up to the first `#`.
    pub fn verification_method(id: &str, public_key: &EcdsaPublicKey) -> Value {
        let controller = id.split('#').next().unwrap_or(id);
        json!({
            "@context": MULTIKEY_CONTEXT,
            "id": id,
            "type": "Multikey",
            "controller": controller,
            "publicKeyMultibase": public_key_to_multikey(public_key)
        })
    }
}
