//! # Verification
//!
//! Results follow one rule throughout:
//!
//! - `Ok(true)`: the proof verifies.
//! - `Ok(false)`: everything is well formed but the credential does not match
//!   the proof (modified claims, wrong key, forged disclosure).
//! - `Err(_)`: the proof cannot be interpreted or its key cannot be found.
//!
//! Base proofs verify against the key embedded in the proof, optionally
//! cross-checked against a resolver. Derived proofs carry no key and always
//! need a resolver.

use std::collections::BTreeSet;

use serde::Serialize;
use subtle::ConstantTimeEq;
use vcdi_crypto::{CanonicalIdMap, EcdsaPublicKey};
use vcdi_vc::{DataIntegrityProof, VerifiableCredential};

use crate::cbor::{
    parse_base_proof, parse_derived_proof, proof_kind, BaseProofComponents, DisclosureData, ProofKind,
};
use crate::derived_proof::canonical_index;
use crate::error::SuiteError;
use crate::resolver::VerificationMethodResolver;
use crate::selection::{apply_json_pointer, validate_json_pointer};
use crate::statements::{
    mandatory_digest, presentation_header, signed_message, statement_digest, statements_digest,
};
use crate::suite::{Suite, CRYPTOSUITE};

/// Outcome of verifying one proof of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    /// Position of the proof in the `proof` member.
    pub index: usize,
    /// The proof's verification method.
    pub verification_method: String,
    /// Base or derived, when the header could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProofKind>,
    /// Whether the proof verified.
    pub verified: bool,
    /// Why verification could not be carried out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn strictly_increasing(indexes: &[usize]) -> bool {
    indexes.windows(2).all(|w| w[0] < w[1])
}

impl Suite {
    /// Verify one proof, choosing base or derived verification from the
    /// proof value header.
    pub fn verify_proof(
        &self,
        credential: &VerifiableCredential,
        proof: &DataIntegrityProof,
        resolver: Option<&dyn VerificationMethodResolver>,
    ) -> Result<bool, SuiteError> {
        proof.validate(CRYPTOSUITE)?;
        match (proof_kind(&proof.proof_value)?, resolver) {
            (ProofKind::Base, None) => self.verify_base_proof(credential, proof),
            (ProofKind::Base, Some(resolver)) => {
                self.verify_base_proof_with_resolver(credential, proof, resolver)
            }
            (ProofKind::Derived, Some(resolver)) => {
                self.verify_derived_proof_with_resolver(credential, proof, resolver)
            }
            (ProofKind::Derived, None) => Err(SuiteError::ResolverRequired),
        }
    }

    /// Verify a base proof against the public key embedded in it.
    pub fn verify_base_proof(
        &self,
        credential: &VerifiableCredential,
        proof: &DataIntegrityProof,
    ) -> Result<bool, SuiteError> {
        proof.validate(CRYPTOSUITE)?;
        let base = parse_base_proof(&proof.proof_value)?;
        let key = EcdsaPublicKey::from_sec1(&base.public_key)?;
        self.verify_base_with_key(credential, proof, &base, &key)
    }

    /// Verify a base proof, requiring the resolved key for the proof's
    /// verification method to equal the embedded key.
    pub fn verify_base_proof_with_resolver(
        &self,
        credential: &VerifiableCredential,
        proof: &DataIntegrityProof,
        resolver: &dyn VerificationMethodResolver,
    ) -> Result<bool, SuiteError> {
        proof.validate(CRYPTOSUITE)?;
        let base = parse_base_proof(&proof.proof_value)?;
        let embedded = EcdsaPublicKey::from_sec1(&base.public_key)?;
        let resolved = resolver.resolve_public_key(&proof.verification_method)?;
        if resolved != embedded {
            return Err(SuiteError::KeyMismatch(proof.verification_method.clone()));
        }
        self.verify_base_with_key(credential, proof, &base, &resolved)
    }

    fn verify_base_with_key(
        &self,
        credential: &VerifiableCredential,
        proof: &DataIntegrityProof,
        base: &BaseProofComponents,
        key: &EcdsaPublicKey,
    ) -> Result<bool, SuiteError> {
        self.check_curve(key.curve())?;
        let unsecured = credential.without_proof().into_value();
        let message = match self.base_message(
            &unsecured,
            &proof.configuration(),
            &base.hmac_key,
            &base.mandatory_pointers,
        ) {
            Ok(message) => message,
            Err(SuiteError::PointerNotFound { pointer, .. }) => {
                tracing::debug!(%pointer, "mandatory field missing from credential");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let verified = self.verify_signature(key, &message, &base.signature)?;
        if !verified {
            tracing::debug!(verification_method = %proof.verification_method, "base proof signature mismatch");
        }
        Ok(verified)
    }

    /// Verify a derived proof over a disclosed credential.
    pub fn verify_derived_proof_with_resolver(
        &self,
        credential: &VerifiableCredential,
        proof: &DataIntegrityProof,
        resolver: &dyn VerificationMethodResolver,
    ) -> Result<bool, SuiteError> {
        proof.validate(CRYPTOSUITE)?;
        let derived = parse_derived_proof(&proof.proof_value)?;
        let key = resolver.resolve_public_key(&proof.verification_method)?;
        self.check_curve(key.curve())?;
        let disclosure = DisclosureData::from_bytes(&derived.compressed_label_map)?;

        // Index bookkeeping.
        if !strictly_increasing(&derived.mandatory_indexes)
            || !strictly_increasing(&derived.selective_indexes)
        {
            return Err(SuiteError::InvalidProof("statement indexes must be strictly increasing".into()));
        }
        let disclosed: BTreeSet<usize> = derived
            .mandatory_indexes
            .iter()
            .chain(&derived.selective_indexes)
            .copied()
            .collect();
        if disclosed.len() != derived.mandatory_indexes.len() + derived.selective_indexes.len() {
            return Err(SuiteError::InvalidProof("mandatory and selective indexes overlap".into()));
        }
        if disclosure.disclosed_salts.len() != disclosed.len() {
            return Err(SuiteError::InvalidProof(format!(
                "{} salts for {} disclosed statements",
                disclosure.disclosed_salts.len(),
                disclosed.len()
            )));
        }
        let total = disclosed.len() + disclosure.withheld_digests.len();
        if disclosed.last().is_some_and(|&last| last >= total) {
            return Err(SuiteError::InvalidProof(format!(
                "statement index out of range for {total} statements"
            )));
        }

        // Relabel the disclosed statements with the issuer's HMAC labels.
        let unsecured = credential.without_proof().into_value();
        let nquads = self.canonicalizer().canonicalize(&unsecured)?;
        let mut relabel = CanonicalIdMap::new();
        for label in nquads.blank_node_labels() {
            let Some(hmac) = disclosure.label_map.get(&canonical_index(&label)?) else {
                tracing::debug!(%label, "blank node missing from label map");
                return Ok(false);
            };
            relabel.insert(label, format!("_:u{}", hex::encode(hmac)));
        }
        let relabeled = vcdi_crypto::relabel_blank_nodes(nquads.as_str(), &relabel);
        let statements: Vec<String> = vcdi_core::CanonicalNQuads::from_statements(relabeled.lines())
            .statements()
            .into_iter()
            .map(str::to_string)
            .collect();
        if statements.len() != disclosed.len() {
            tracing::debug!(
                statements = statements.len(),
                disclosed = disclosed.len(),
                "disclosed statement count mismatch"
            );
            return Ok(false);
        }

        let (config_hash, config_nquads) =
            self.proof_config_hash(proof, unsecured.get("@context"))?;
        let header = presentation_header(&statements, &config_nquads);
        if !bool::from(header.as_slice().ct_eq(derived.presentation_header.as_slice())) {
            tracing::debug!("presentation header mismatch");
            return Ok(false);
        }

        // Rebuild the commitment in statement order.
        let mut opened = disclosed
            .iter()
            .zip(statements.iter().zip(&disclosure.disclosed_salts))
            .peekable();
        let mut withheld = disclosure.withheld_digests.iter();
        let mut digests = Vec::with_capacity(total);
        for index in 0..total {
            let digest = match opened.peek() {
                Some((next, _)) if **next == index => {
                    let (_, (statement, salt)) = opened.next().ok_or_else(|| {
                        SuiteError::InvalidProof("disclosed statements exhausted".into())
                    })?;
                    statement_digest(salt, statement)
                }
                _ => *withheld.next().ok_or_else(|| {
                    SuiteError::InvalidProof("withheld digests exhausted".into())
                })?,
            };
            digests.push(digest);
        }

        let message = signed_message(
            &config_hash,
            &statements_digest(&digests),
            &mandatory_digest(&derived.mandatory_indexes),
        );
        let verified = self.verify_signature(&key, &message, &derived.signature)?;
        if !verified {
            tracing::debug!(verification_method = %proof.verification_method, "derived proof signature mismatch");
        }
        Ok(verified)
    }

    /// Verify every proof on `credential`. No proof at all is an error.
    pub fn verify_credential_with_proof(
        &self,
        credential: &VerifiableCredential,
        resolver: Option<&dyn VerificationMethodResolver>,
    ) -> Result<bool, SuiteError> {
        let proofs = credential.proofs()?;
        if proofs.is_empty() {
            return Err(SuiteError::NoProofs);
        }
        for proof in &proofs {
            if !self.verify_proof(credential, proof, resolver)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Verify each proof independently and report per-proof outcomes.
    /// Errors are captured in the result instead of aborting.
    pub fn verify_each(
        &self,
        credential: &VerifiableCredential,
        resolver: Option<&dyn VerificationMethodResolver>,
    ) -> Result<Vec<ProofResult>, SuiteError> {
        let proofs = credential.proofs()?;
        if proofs.is_empty() {
            return Err(SuiteError::NoProofs);
        }
        Ok(proofs
            .iter()
            .enumerate()
            .map(|(index, proof)| {
                let outcome = self.verify_proof(credential, proof, resolver);
                ProofResult {
                    index,
                    verification_method: proof.verification_method.clone(),
                    kind: proof_kind(&proof.proof_value).ok(),
                    verified: matches!(outcome, Ok(true)),
                    error: outcome.err().map(|e| e.to_string()),
                }
            })
            .collect())
    }

    /// Verify a proof chain: `proof` must be an array and `resolvers[i]`
    /// resolves the key of proof `i`. All proofs must verify.
    pub fn validate_proof_chain(
        &self,
        credential: &VerifiableCredential,
        resolvers: &[&dyn VerificationMethodResolver],
    ) -> Result<bool, SuiteError> {
        let set = credential.proof_set()?.ok_or(SuiteError::NoProofs)?;
        if !set.is_array() {
            return Err(SuiteError::NotAProofChain);
        }
        if set.is_empty() {
            return Err(SuiteError::NoProofs);
        }
        if set.len() != resolvers.len() {
            return Err(SuiteError::ResolverCountMismatch {
                proofs: set.len(),
                resolvers: resolvers.len(),
            });
        }
        for (proof, resolver) in set.iter().zip(resolvers) {
            if !self.verify_proof(credential, proof, Some(*resolver))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every pointer resolves in the disclosed credential. Array
    /// indexes refer to the disclosed document, not the full credential.
    pub fn verify_mandatory_pointers<S: AsRef<str>>(
        &self,
        disclosed: &VerifiableCredential,
        pointers: &[S],
    ) -> Result<bool, SuiteError> {
        let document = disclosed.without_proof().into_value();
        for pointer in pointers {
            let pointer = pointer.as_ref();
            validate_json_pointer(pointer)?;
            match apply_json_pointer(&document, pointer) {
                Ok(_) => {}
                Err(SuiteError::PointerNotFound { .. }) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Whether two credentials denote the same claims, ignoring proofs.
    pub fn compare_credentials(
        &self,
        a: &VerifiableCredential,
        b: &VerifiableCredential,
    ) -> Result<bool, SuiteError> {
        Ok(self
            .canonicalizer()
            .equivalent(&a.without_proof().into_value(), &b.without_proof().into_value())?)
    }
}
