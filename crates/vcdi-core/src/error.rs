//! # Error Types
//!
//! Errors raised while turning JSON-LD documents into canonical N-Quads.
//! All errors use `thiserror`; nothing in this crate panics on bad input.
//!
//! ## Design
//!
//! - Context resolution failures are kept apart from processing failures so
//!   callers can tell "unknown context URL" from "malformed document".
//! - Keys the JSON-LD processor would drop are reported, never skipped.
//!   A skipped term would leave claims outside the signed statements.

use thiserror::Error;

/// Error while resolving a JSON-LD context document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No cached entry and no source able to provide the document.
    #[error("context document not found: {0}")]
    NotFound(String),

    /// The source returned a document that is not a JSON-LD context.
    #[error("invalid context document {url}: {reason}")]
    InvalidDocument {
        /// URL of the offending document.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The source failed to produce the document.
    #[error("context source failed for {url}: {reason}")]
    SourceFailed {
        /// URL that was requested.
        url: String,
        /// Source-specific failure description.
        reason: String,
    },

    /// Remote contexts reference each other too deeply or cyclically.
    #[error("context recursion limit exceeded while loading {0}")]
    RecursionLimit(String),
}

/// Error while canonicalizing a JSON-LD document.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// A referenced context could not be resolved.
    #[error("context resolution failed: {0}")]
    Context(#[from] ContextError),

    /// The document is not valid JSON-LD.
    #[error("invalid JSON-LD: {0}")]
    InvalidJsonLd(String),

    /// An IRI is not well formed.
    #[error("invalid IRI {iri:?}: {reason}")]
    InvalidIri {
        /// The offending IRI.
        iri: String,
        /// Parser message.
        reason: String,
    },

    /// The expanded document could not be written as RDF quads.
    #[error("RDF conversion failed: {0}")]
    ToRdf(String),

    /// The RDF construct is recognised but not supported.
    #[error("unsupported RDF feature: {0}")]
    Unsupported(String),

    /// RDF dataset normalization failed.
    #[error("RDF dataset normalization failed: {0}")]
    Normalization(String),

    /// Unknown hash algorithm name.
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// JSON (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CanonicalizationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidJsonLd(msg.into())
    }
}

/// Error for malformed timestamps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp {input:?}: {reason}")]
pub struct TimestampError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}
