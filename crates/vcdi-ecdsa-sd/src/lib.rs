//! # vcdi-ecdsa-sd — Selective Disclosure Cryptosuite
//!
//! The `ecdsa-sd-2023` Data Integrity cryptosuite over P-256 and P-384.
//!
//! ```text
//!   issuer                      holder                          verifier
//!   ──────                      ──────                          ────────
//!   add_base_proof ──signed──▶ add_derived_proof ──disclosed──▶ verify_credential_with_proof
//!    (HMAC key, mandatory        (mandatory + chosen             (resolver supplies the
//!     pointers, signature)        pointers, same signature)       issuer key)
//! ```
//!
//! - [`selection`]: JSON Pointer resolution and field selection.
//! - [`cbor`]: the `proofValue` wire format.
//! - [`skolem`] and [`statements`]: blank node identity across selections and
//!   the per-statement commitment the signature covers.
//! - [`suite`], `base_proof`, `derived_proof`, [`verify`]: the suite itself.
//! - [`resolver`]: verification method lookup.
//!
//! ## Crate Policy
//!
//! - `Ok(false)` means "well formed, does not verify"; `Err` means the input
//!   could not be interpreted or a precondition was violated.
//! - No network I/O. Context documents come from the canonicalizer's loader,
//!   keys from the resolver.
//! - [`Suite`] is `Send + Sync` and can be shared behind an `Arc`.

mod base_proof;
pub mod cbor;
mod derived_proof;
pub mod error;
pub mod resolver;
pub mod selection;
pub mod skolem;
pub mod statements;
pub mod suite;
pub mod verify;

pub use crate::cbor::{
    is_base_proof, parse_base_proof, parse_derived_proof, proof_kind, serialize_base_proof,
    serialize_derived_proof, BaseProofComponents, DerivedProofComponents, DisclosureData, ProofKind,
};
pub use crate::derived_proof::DerivedProofOptions;
pub use crate::error::SuiteError;
pub use crate::resolver::{MultikeyDocumentResolver, StaticKeyResolver, VerificationMethodResolver};
pub use crate::selection::{
    apply_json_pointer, escape_token, filter_pointers, is_mandatory, merge_pointers, select_fields,
    unescape_token, validate_json_pointer,
};
pub use crate::suite::{ProofOptions, Suite, CRYPTOSUITE};
pub use crate::verify::ProofResult;
