//! # vcdi-crypto — Cryptographic Primitives
//!
//! Building blocks for the `ecdsa-sd-2023` cryptosuite:
//!
//! - **ECDSA** keys and signatures on P-256 and P-384, SHA-256 prehash,
//!   fixed-width `r || s` with DER conversion.
//! - **Multikey** encoding of public and private keys (base58btc +
//!   multicodec varint).
//! - **HMAC** blank node label randomization with zeroizing 32-byte keys.
//!
//! ## Crate Policy
//!
//! - Depends only on `vcdi-core` internally.
//! - No mocking of cryptographic operations in tests: all tests use real
//!   keys, real SHA-256 and real ECDSA.
//! - Verification distinguishes "does not verify" (`Ok(false)`) from
//!   "cannot be interpreted" (`Err`).

pub mod curve;
pub mod ecdsa;
pub mod error;
pub mod hmac;
pub mod multikey;

pub use crate::curve::Curve;
pub use crate::ecdsa::{generate_key_pair, EcdsaPrivateKey, EcdsaPublicKey, EcdsaSignature};
pub use crate::error::CryptoError;
pub use crate::hmac::{
    compute_hmac, extract_blank_node_labels, randomize_blank_node_labels, randomize_label,
    relabel_blank_nodes, verify_hmac, CanonicalIdMap, HmacKey, HMAC_KEY_LENGTH,
};
pub use crate::multikey::{
    multikey_to_private_key, multikey_to_public_key, private_key_to_multikey,
    public_key_to_multikey,
};
