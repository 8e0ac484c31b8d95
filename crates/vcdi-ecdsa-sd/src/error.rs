//! # Suite Errors
//!
//! Four kinds of failure, kept apart so callers can react differently:
//!
//! - **Precondition**: the caller asked for something the suite cannot do
//!   (missing verification method, wrong curve, no resolver).
//! - **Format**: bytes or documents that cannot be interpreted (bad pointer
//!   syntax, wrong CBOR header, truncated components).
//! - **Semantic**: well-formed input that is inconsistent (a pointer that
//!   does not resolve, a disclosed statement absent from the credential).
//! - **Cryptographic**: lower layer failures from `vcdi-crypto`.
//!
//! A signature that simply does not match is *not* an error. Verification
//! returns `Ok(false)` for that case.

use thiserror::Error;
use vcdi_core::CanonicalizationError;
use vcdi_crypto::{CryptoError, Curve};
use vcdi_vc::VcError;

/// Error raised by the `ecdsa-sd-2023` suite.
#[derive(Error, Debug)]
pub enum SuiteError {
    // ------------------------------------------------------------------
    // Precondition
    // ------------------------------------------------------------------
    /// A required proof option was not supplied.
    #[error("missing required option: {0}")]
    MissingOption(&'static str),

    /// Key curve differs from the curve the suite was built for.
    #[error("suite is configured for {suite} but the key is {key}")]
    CurveMismatch {
        /// Curve of the suite.
        suite: Curve,
        /// Curve of the supplied key.
        key: Curve,
    },

    /// Derived proof verification needs a verification method resolver.
    #[error("a verification method resolver is required to verify derived proofs")]
    ResolverRequired,

    /// The credential carries no proof.
    #[error("credential has no proof")]
    NoProofs,

    /// Proof chain validation needs the `proof` member to be an array.
    #[error("proof chain requires the proof member to be an array")]
    NotAProofChain,

    /// One resolver per proof is required for chain validation.
    #[error("proof chain has {proofs} proofs but {resolvers} resolvers were supplied")]
    ResolverCountMismatch {
        /// Number of proofs on the credential.
        proofs: usize,
        /// Number of resolvers passed in.
        resolvers: usize,
    },

    /// Nothing would be disclosed.
    #[error("derived proof must disclose at least one pointer")]
    EmptySelection,

    // ------------------------------------------------------------------
    // Format
    // ------------------------------------------------------------------
    /// JSON Pointer syntax error.
    #[error("invalid JSON pointer {pointer:?}: {reason}")]
    InvalidPointer {
        /// The offending pointer.
        pointer: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Proof value does not start with the base proof header.
    #[error("invalid base proof header")]
    InvalidBaseProofHeader,

    /// Proof value does not start with the derived proof header.
    #[error("invalid derived proof header")]
    InvalidDerivedProofHeader,

    /// Proof value could not be decoded.
    #[error("invalid proof value: {0}")]
    InvalidProofValue(String),

    // ------------------------------------------------------------------
    // Semantic
    // ------------------------------------------------------------------
    /// A pointer is syntactically valid but does not resolve in the document.
    #[error("JSON pointer {pointer:?} does not resolve: {reason}")]
    PointerNotFound {
        /// The pointer.
        pointer: String,
        /// Where resolution stopped.
        reason: String,
    },

    /// Proof is structurally inconsistent with the credential.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The resolver returned a key other than the one embedded in the proof.
    #[error("resolved key for {0} does not match the key embedded in the proof")]
    KeyMismatch(String),

    /// The resolver does not know the verification method.
    #[error("unknown verification method: {0}")]
    UnknownVerificationMethod(String),

    /// A verification method document is malformed.
    #[error("invalid verification method: {0}")]
    InvalidVerificationMethod(String),

    // ------------------------------------------------------------------
    // Lower layers
    // ------------------------------------------------------------------
    /// Canonicalization failure.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Credential model failure.
    #[error(transparent)]
    Credential(#[from] VcError),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SuiteError {
    pub(crate) fn pointer(pointer: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPointer {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(pointer: &str, reason: impl Into<String>) -> Self {
        Self::PointerNotFound {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn proof_value(reason: impl Into<String>) -> Self {
        Self::InvalidProofValue(reason.into())
    }

    /// Whether the error comes from a caller precondition rather than from
    /// the data being processed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingOption(_)
                | Self::CurveMismatch { .. }
                | Self::ResolverRequired
                | Self::NoProofs
                | Self::NotAProofChain
                | Self::ResolverCountMismatch { .. }
                | Self::EmptySelection
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_messages_are_stable() {
        assert_eq!(SuiteError::InvalidBaseProofHeader.to_string(), "invalid base proof header");
        assert_eq!(
            SuiteError::InvalidDerivedProofHeader.to_string(),
            "invalid derived proof header"
        );
    }

    #[test]
    fn lower_errors_convert() {
        let err: SuiteError = CryptoError::InvalidHmacKeyLength(3).into();
        assert!(matches!(err, SuiteError::Crypto(_)));
        assert!(err.to_string().contains("32 bytes"));

        let err: SuiteError = VcError::NotAnObject.into();
        assert!(matches!(err, SuiteError::Credential(_)));
    }

    #[test]
    fn precondition_classification() {
        assert!(SuiteError::ResolverRequired.is_precondition());
        assert!(SuiteError::CurveMismatch { suite: Curve::P256, key: Curve::P384 }.is_precondition());
        assert!(!SuiteError::InvalidBaseProofHeader.is_precondition());
        assert!(!SuiteError::not_found("/a", "missing key").is_precondition());
    }
}
