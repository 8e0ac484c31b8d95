//! # Base Proof Creation
//!
//! The issuer signs the whole credential once. The resulting proof carries
//! the signature, the per-credential HMAC key, the issuer's compressed public
//! key and the mandatory pointers, so the holder can later derive proofs
//! without going back to the issuer.
//!
//! ## Security Invariant
//!
//! The statements the mandatory pointers select are signed along with the
//! credential. A holder who strips pointers from the proof value, or a
//! derived proof that leaves one of those statements out, fails
//! verification.

use serde_json::Value;
use vcdi_crypto::{EcdsaPrivateKey, HmacKey};
use vcdi_vc::{DataIntegrityProof, VerifiableCredential};

use crate::cbor::{serialize_base_proof, BaseProofComponents};
use crate::derived_proof::Commitment;
use crate::error::SuiteError;
use crate::selection::apply_json_pointer;
use crate::statements::{mandatory_digest, salted_digests, signed_message, statements_digest};
use crate::suite::{ProofOptions, Suite};

impl Suite {
    /// Create a base proof for `credential`. Existing proofs are ignored.
    pub fn create_base_proof(
        &self,
        credential: &VerifiableCredential,
        key: &EcdsaPrivateKey,
        options: &ProofOptions,
    ) -> Result<DataIntegrityProof, SuiteError> {
        self.create_base_proof_with_hmac_key(credential, key, options, HmacKey::generate())
    }

    /// [`create_base_proof`](Self::create_base_proof) with a caller-supplied
    /// HMAC key. Together with a fixed `created` the output is reproducible.
    pub fn create_base_proof_with_hmac_key(
        &self,
        credential: &VerifiableCredential,
        key: &EcdsaPrivateKey,
        options: &ProofOptions,
        hmac_key: HmacKey,
    ) -> Result<DataIntegrityProof, SuiteError> {
        self.check_curve(key.curve())?;
        let config = self.create_proof_config(options)?;

        let unsecured = credential.without_proof().into_value();
        for pointer in &options.mandatory_pointers {
            apply_json_pointer(&unsecured, pointer)?;
        }

        let message = self.base_message(&unsecured, &config, &hmac_key, &options.mandatory_pointers)?;
        let signature = self.sign_data(key, &message)?;

        let proof_value = serialize_base_proof(&BaseProofComponents {
            signature,
            hmac_key,
            public_key: key.public_key().to_compressed_bytes(),
            mandatory_pointers: options.mandatory_pointers.clone(),
        })?;

        tracing::debug!(
            verification_method = %config.verification_method,
            mandatory_pointers = options.mandatory_pointers.len(),
            "created base proof"
        );
        Ok(config.with_proof_value(proof_value))
    }

    /// Create a base proof and append it to a copy of `credential`.
    pub fn add_base_proof(
        &self,
        credential: &VerifiableCredential,
        key: &EcdsaPrivateKey,
        options: &ProofOptions,
    ) -> Result<VerifiableCredential, SuiteError> {
        let proof = self.create_base_proof(credential, key, options)?;
        Ok(credential.with_proof(proof)?)
    }

    /// The message signed by a base proof over `unsecured` (a credential
    /// without `proof`) with the given mandatory pointers.
    pub(crate) fn base_message(
        &self,
        unsecured: &Value,
        config: &DataIntegrityProof,
        hmac_key: &HmacKey,
        mandatory_pointers: &[String],
    ) -> Result<[u8; 32], SuiteError> {
        let commitment = Commitment::new(self, unsecured, hmac_key)?;
        let mandatory = commitment.indexes(mandatory_pointers)?;
        let (config_hash, _) = self.proof_config_hash(config, unsecured.get("@context"))?;
        let digests = salted_digests(hmac_key, commitment.statements());
        Ok(signed_message(
            &config_hash,
            &statements_digest(&digests),
            &mandatory_digest(&mandatory),
        ))
    }
}
