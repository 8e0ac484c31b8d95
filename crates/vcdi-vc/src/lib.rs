//! # vcdi-vc — Verifiable Credential Document Model
//!
//! - **Credential** ([`VerifiableCredential`]): a newtype over the JSON
//!   object with typed accessors for the envelope and data model validation.
//!   Claims stay free-form so that any subset of them can be disclosed.
//! - **Proofs** ([`DataIntegrityProof`], [`ProofSet`]): the rigid proof
//!   object and the single-or-array `proof` member.
//!
//! Signing and verification live in `vcdi-ecdsa-sd`; this crate only knows
//! the shapes.

pub mod credential;
pub mod proof;

pub use credential::{VcError, VerifiableCredential, CREDENTIALS_V1_URL, VERIFIABLE_CREDENTIAL};
pub use proof::{DataIntegrityProof, ProofPurpose, ProofSet, DATA_INTEGRITY_PROOF};
