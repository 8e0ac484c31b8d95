//! # JSON-LD to RDF
//!
//! Expansion and RDF conversion are delegated to the `json-ld` crate. This
//! module feeds it context documents from the [`ContextLoader`], drives its
//! futures to completion on the calling thread and turns the resulting
//! quads into an `oxrdf` [`Dataset`] for canonicalization.
//!
//! ## Security Invariant
//!
//! Expansion runs with a strict policy: invalid IRIs and keys that expand to
//! nothing are errors. A dropped key would be a claim outside the signature.
//!
//! ## Skolem identifiers
//!
//! A [`SkolemScheme`] is a per-use IRI prefix. Only a conversion handed that
//! scheme maps matching IRIs back to blank nodes. Plain canonicalization
//! keeps every IRI an IRI, whatever its scheme.

use std::collections::{BTreeMap, HashSet};

use futures::executor::block_on;
use json_ld::expansion::{Action, Policy};
use json_ld::{IriBuf, JsonLdProcessor, Options, RemoteDocument};
use oxrdf::{BlankNode, Dataset, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad};
use rdf_types::{generator, Id, LexicalQuad, LiteralType};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{CanonicalizationError, ContextError};
use crate::loader::ContextLoader;

/// Upper bound on distinct remote contexts pulled in by one document.
const MAX_REMOTE_CONTEXTS: usize = 32;

/// Prefix shared by all skolem schemes.
const SKOLEM_URN: &str = "urn:bnid:";

// ---------------------------------------------------------------------------
// Skolem scheme
// ---------------------------------------------------------------------------

/// IRI prefix that stands in for blank nodes while a document is cut into
/// selections.
///
/// Every scheme carries a fresh UUID, so identifiers written by the credential
/// author never fall inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkolemScheme {
    prefix: String,
}

impl SkolemScheme {
    /// A scheme nobody else uses: `urn:bnid:<uuid>:`.
    pub fn random() -> Self {
        Self {
            prefix: format!("{SKOLEM_URN}{}:", Uuid::new_v4().simple()),
        }
    }

    /// The IRI prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Skolem IRI for blank node `label`.
    pub fn iri(&self, label: &str) -> String {
        format!("{}{label}", self.prefix)
    }

    /// Blank node label of a skolem IRI of this scheme.
    pub fn label<'a>(&self, iri: &'a str) -> Option<&'a str> {
        iri.strip_prefix(self.prefix.as_str()).filter(|l| !l.is_empty())
    }

    /// Whether `iri` belongs to this scheme.
    pub fn contains(&self, iri: &str) -> bool {
        self.label(iri).is_some()
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a JSON-LD document into an RDF dataset.
///
/// With `skolem`, IRIs of that scheme become blank nodes named by their
/// label. Every other blank node is named `g<n>`.
pub fn to_dataset(
    doc: &Value,
    loader: &ContextLoader,
    skolem: Option<&SkolemScheme>,
) -> Result<Dataset, CanonicalizationError> {
    let mut dataset = Dataset::new();
    for quad in expand_to_quads(doc, loader)? {
        dataset.insert(&convert_quad(&quad, skolem)?);
    }
    Ok(dataset)
}

fn strict_policy() -> Policy {
    Policy {
        invalid: Action::Reject,
        vocab: Action::Keep,
        allow_undefined: false,
    }
}

fn expand_to_quads(
    doc: &Value,
    loader: &ContextLoader,
) -> Result<Vec<LexicalQuad>, CanonicalizationError> {
    if !doc.is_object() && !doc.is_array() {
        return Err(CanonicalizationError::invalid(
            "a JSON-LD document must be an object or an array",
        ));
    }
    let mut documents = remote_contexts(doc, loader)?;
    let input: RemoteDocument<IriBuf> =
        RemoteDocument::new(None, None, json_ld::syntax::Value::from(doc.clone()));
    let options = Options {
        expansion_policy: strict_policy(),
        ..Options::default()
    };
    let mut expanded = block_on(input.expand_using(&mut documents, options))
        .map_err(|e| CanonicalizationError::invalid(e.to_string()))?;
    expanded.canonicalize();

    let quads = linked_data::to_lexical_quads(generator::Blank::new(), &expanded)
        .map_err(|e| CanonicalizationError::ToRdf(format!("{e:?}")))?;
    tracing::trace!(quads = quads.len(), contexts = documents.len(), "expanded JSON-LD document");
    Ok(quads)
}

/// Every remote context `doc` needs, resolved through `loader` and keyed
/// the way the JSON-LD processor looks them up.
fn remote_contexts(
    doc: &Value,
    loader: &ContextLoader,
) -> Result<BTreeMap<IriBuf, RemoteDocument>, CanonicalizationError> {
    let mut pending = Vec::new();
    context_urls(doc, false, &mut pending);

    let mut seen = HashSet::new();
    let mut documents = BTreeMap::new();
    while let Some(url) = pending.pop() {
        if !seen.insert(url.clone()) {
            continue;
        }
        if seen.len() > MAX_REMOTE_CONTEXTS {
            return Err(ContextError::RecursionLimit(url).into());
        }
        let document = loader.load(&url)?;
        context_urls(&document, false, &mut pending);

        let iri = IriBuf::new(url.clone()).map_err(|_| CanonicalizationError::InvalidIri {
            iri: url.clone(),
            reason: "context URL is not an absolute IRI".into(),
        })?;
        let content = json_ld::syntax::Value::from(document.as_ref().clone());
        documents.insert(iri.clone(), RemoteDocument::new(Some(iri), None, content));
    }
    Ok(documents)
}

/// URLs named by `@context` (and `@import` inside a context) anywhere in
/// `value`.
fn context_urls(value: &Value, in_context: bool, out: &mut Vec<String>) {
    match value {
        Value::String(url) if in_context => out.push(url.clone()),
        Value::Array(items) => items.iter().for_each(|item| context_urls(item, in_context, out)),
        Value::Object(map) => {
            for (key, child) in map {
                let nested = key == "@context" || (in_context && key == "@import");
                context_urls(child, nested, out);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// rdf-types → oxrdf
// ---------------------------------------------------------------------------

fn named(iri: &str) -> Result<NamedNode, CanonicalizationError> {
    NamedNode::new(iri).map_err(|e| CanonicalizationError::InvalidIri {
        iri: iri.to_string(),
        reason: e.to_string(),
    })
}

fn blank(label: &str) -> Result<BlankNode, CanonicalizationError> {
    BlankNode::new(label)
        .map_err(|e| CanonicalizationError::ToRdf(format!("invalid blank node label {label:?}: {e}")))
}

fn resource(id: &Id, skolem: Option<&SkolemScheme>) -> Result<NamedOrBlankNode, CanonicalizationError> {
    match id {
        Id::Iri(iri) => match skolem.and_then(|s| s.label(iri.as_str())) {
            Some(label) => Ok(blank(label)?.into()),
            None => Ok(named(iri.as_str())?.into()),
        },
        Id::Blank(b) => Ok(blank(&format!("g{}", b.suffix()))?.into()),
    }
}

fn literal(literal: &rdf_types::Literal) -> Result<Literal, CanonicalizationError> {
    match &literal.type_ {
        LiteralType::Any(datatype) => Ok(Literal::new_typed_literal(
            literal.value.as_str(),
            named(datatype.as_str())?,
        )),
        LiteralType::LangString(tag) => {
            Literal::new_language_tagged_literal(literal.value.as_str(), tag.as_str())
                .map_err(|e| CanonicalizationError::ToRdf(format!("invalid language tag: {e}")))
        }
    }
}

fn convert_quad(quad: &LexicalQuad, skolem: Option<&SkolemScheme>) -> Result<Quad, CanonicalizationError> {
    let rdf_types::Quad(subject, predicate, object, graph) = quad;
    let object: oxrdf::Term = match object {
        rdf_types::Term::Id(id) => resource(id, skolem)?.into(),
        rdf_types::Term::Literal(l) => literal(l)?.into(),
    };
    let graph = match graph {
        Some(id) => GraphName::from(resource(id, skolem)?),
        None => GraphName::DefaultGraph,
    };
    Ok(Quad::new(
        resource(subject, skolem)?,
        named(predicate.as_str())?,
        object,
        graph,
    ))
}
