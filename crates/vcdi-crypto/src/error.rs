//! Errors for key handling, signatures and encodings.
//!
//! A signature that is well formed but does not verify is not an error:
//! verification returns `Ok(false)`. Errors are reserved for inputs that
//! cannot be interpreted at all (bad lengths, unknown codecs, off-curve
//! points).

use thiserror::Error;

use crate::curve::Curve;

/// Cryptographic error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes could not be parsed or the point is not on the curve.
    #[error("invalid {curve} key: {reason}")]
    InvalidKey {
        /// Curve the key was parsed for.
        curve: Curve,
        /// Parser message.
        reason: String,
    },

    /// Signature bytes have the wrong length or encoding.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A key for one curve was used where another curve was required.
    #[error("curve mismatch: expected {expected}, got {actual}")]
    CurveMismatch {
        /// Curve required by the caller.
        expected: Curve,
        /// Curve of the supplied key or signature.
        actual: Curve,
    },

    /// Multicodec prefix not supported by this crate.
    #[error("unsupported multicodec 0x{0:x}")]
    UnsupportedMulticodec(u64),

    /// Multibase decoding failed or used a disallowed base.
    #[error("invalid multibase: {0}")]
    Multibase(String),

    /// Malformed unsigned varint.
    #[error("invalid varint: {0}")]
    Varint(String),

    /// HMAC keys must be exactly 32 bytes.
    #[error("HMAC key must be 32 bytes, got {0}")]
    InvalidHmacKeyLength(usize),

    /// Signing failed inside the ECDSA implementation.
    #[error("signing failed: {0}")]
    Signing(String),
}
