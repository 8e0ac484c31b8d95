//! # vcdi-core — JSON-LD Canonicalization for Data Integrity Proofs
//!
//! The leaf crate of the vcdi workspace. It turns JSON-LD credentials into
//! RDFC-1.0 canonical N-Quads, the byte form that every proof in the
//! workspace signs and verifies.
//!
//! ## Key Design Principles
//!
//! 1. **No global state.** Contexts are resolved through an explicitly
//!    constructed [`ContextLoader`] shared via `Arc`. Nothing is fetched over
//!    the network; misses go to an injected [`ContextSource`].
//!
//! 2. **Strict expansion.** JSON-LD processing is done by the `json-ld`
//!    crate under a policy that rejects keys which would expand to nothing
//!    and invalid IRIs. Dropping data silently would leave claims outside
//!    the signature.
//!
//! 3. **`CanonicalNQuads` newtype.** Canonical text is only produced by the
//!    canonicalizer, so anything hashed downstream is sorted and
//!    de-duplicated by construction.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vcdi-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod jsonld;
pub mod loader;
pub mod nquads;
pub mod temporal;

pub use canonical::{canonicalize_dataset, Canonicalizer, LabelMap};
pub use digest::{sha256, sha256_concat, sha256_hex, HashAlgorithm};
pub use error::{CanonicalizationError, ContextError, TimestampError};
pub use jsonld::SkolemScheme;
pub use loader::{ContextLoader, ContextSource, LoaderConfig, CREDENTIALS_V2_URL};
pub use nquads::{blank_node_ranges, CanonicalNQuads};
pub use temporal::Timestamp;
