//! # Canonicalizer
//!
//! Turns JSON-LD documents into RDFC-1.0 canonical N-Quads and hashes them.
//!
//! ## Pipeline
//!
//! 1. JSON-LD to RDF ([`crate::jsonld`]) with contexts resolved through the
//!    shared [`ContextLoader`].
//! 2. Canonical blank node labels (`c14n0`, `c14n1`, ...) issued by
//!    `rdf-canon`.
//! 3. Serialization of every quad with the issued labels, sorted in
//!    code-point order and de-duplicated ([`CanonicalNQuads`]).
//!
//! ## Security Invariant
//!
//! Canonicalization is all-or-nothing. An unknown term, an unresolvable
//! context or an unsupported JSON-LD feature fails the whole call. Partial
//! output would let claims escape the signature.

use std::collections::HashMap;
use std::sync::Arc;

use oxrdf::Dataset;
use serde_json::Value;

use crate::digest::{sha256_hex, HashAlgorithm};
use crate::error::{CanonicalizationError, ContextError};
use crate::loader::ContextLoader;
use crate::jsonld::{self, SkolemScheme};
use crate::nquads::{format_quad, CanonicalNQuads};

/// Map from input blank node label to canonical label, both without `_:`.
pub type LabelMap = HashMap<String, String>;

/// JSON-LD canonicalizer bound to a context loader.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    loader: Arc<ContextLoader>,
}

impl Canonicalizer {
    /// Create a canonicalizer that resolves contexts through `loader`.
    pub fn new(loader: Arc<ContextLoader>) -> Self {
        Self { loader }
    }

    /// Canonicalizer over a fresh loader with the built-in contexts warmed.
    pub fn with_builtin() -> Result<Self, ContextError> {
        Ok(Self::new(Arc::new(ContextLoader::with_builtin()?)))
    }

    /// The shared context loader.
    pub fn loader(&self) -> &Arc<ContextLoader> {
        &self.loader
    }

    /// Convert a document to an RDF dataset without canonical relabelling.
    pub fn to_dataset(&self, doc: &Value) -> Result<Dataset, CanonicalizationError> {
        jsonld::to_dataset(doc, &self.loader, None)
    }

    /// Canonical N-Quads for `doc`.
    pub fn canonicalize(&self, doc: &Value) -> Result<CanonicalNQuads, CanonicalizationError> {
        Ok(self.canonicalize_with_labels(doc)?.0)
    }

    /// Canonical N-Quads plus the issued input-label to canonical-label map.
    ///
    /// Input labels are the converter's generated blank node names.
    pub fn canonicalize_with_labels(
        &self,
        doc: &Value,
    ) -> Result<(CanonicalNQuads, LabelMap), CanonicalizationError> {
        self.canonicalize_dataset_of(doc, None)
    }

    /// Like [`Self::canonicalize_with_labels`], but identifiers of `scheme`
    /// are read back as blank nodes keyed by their skolem label.
    pub fn canonicalize_skolemized(
        &self,
        doc: &Value,
        scheme: &SkolemScheme,
    ) -> Result<(CanonicalNQuads, LabelMap), CanonicalizationError> {
        self.canonicalize_dataset_of(doc, Some(scheme))
    }

    fn canonicalize_dataset_of(
        &self,
        doc: &Value,
        scheme: Option<&SkolemScheme>,
    ) -> Result<(CanonicalNQuads, LabelMap), CanonicalizationError> {
        let dataset = jsonld::to_dataset(doc, &self.loader, scheme)?;
        let (nquads, labels) = canonicalize_dataset(&dataset)?;
        tracing::debug!(
            statements = nquads.len(),
            blank_nodes = labels.len(),
            "canonicalized document"
        );
        Ok((nquads, labels))
    }

    /// Hex SHA-256 of the canonical N-Quads.
    pub fn hash(&self, doc: &Value) -> Result<String, CanonicalizationError> {
        Ok(sha256_hex(self.canonicalize(doc)?.as_bytes()))
    }

    /// Hash of the canonical N-Quads with a named algorithm (`"sha256"` or
    /// `"SHA-256"`).
    pub fn hash_with_algorithm(
        &self,
        doc: &Value,
        algorithm: &str,
    ) -> Result<String, CanonicalizationError> {
        let algorithm: HashAlgorithm = algorithm.parse()?;
        let nquads = self.canonicalize(doc)?;
        Ok(algorithm.hash_hex(nquads.as_bytes()))
    }

    /// Whether two documents denote the same canonical dataset.
    pub fn equivalent(&self, a: &Value, b: &Value) -> Result<bool, CanonicalizationError> {
        Ok(self.canonicalize(a)? == self.canonicalize(b)?)
    }
}

/// Canonicalize an RDF dataset.
pub fn canonicalize_dataset(
    dataset: &Dataset,
) -> Result<(CanonicalNQuads, LabelMap), CanonicalizationError> {
    let issued = rdf_canon::issue(dataset)
        .map_err(|e| CanonicalizationError::Normalization(e.to_string()))?;
    let labels: LabelMap = issued
        .into_iter()
        .map(|(input, canonical)| {
            (
                input.trim_start_matches("_:").to_string(),
                canonical.trim_start_matches("_:").to_string(),
            )
        })
        .collect();

    let statements = dataset
        .iter()
        .map(|quad| format_quad(quad, &labels))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((CanonicalNQuads::from_statements(statements), labels))
}
