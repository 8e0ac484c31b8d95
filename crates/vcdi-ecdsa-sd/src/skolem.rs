//! # Skolemization
//!
//! Node objects without an identifier become blank nodes with whatever name
//! the RDF converter hands out, and those names differ between a credential
//! and any selection taken from it. Giving each such object a temporary
//! identifier from a fresh [`SkolemScheme`] first makes the blank node the
//! same node in both, so canonical labels computed over the full credential
//! can be carried over to the disclosed subset.
//!
//! Not every JSON object is a node: `@json` literals, language maps and index
//! maps are plain JSON to the processor. An identifier is only kept where the
//! skolemized credential still canonicalizes to exactly the N-Quads of the
//! original, so skolemization never changes what the credential says.

use serde_json::{Map, Value};
use vcdi_core::{CanonicalNQuads, Canonicalizer, LabelMap, SkolemScheme};

use crate::error::SuiteError;

/// A credential with skolem identifiers on its anonymous nodes.
#[derive(Debug, Clone)]
pub struct Skolemized {
    /// The credential with `@id`s added.
    pub document: Value,
    /// The scheme the added identifiers belong to.
    pub scheme: SkolemScheme,
    /// Canonical N-Quads, identical to those of the original credential.
    pub nquads: CanonicalNQuads,
    /// Skolem label (`b<k>`) to canonical label.
    pub labels: LabelMap,
}

#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

/// Give the anonymous nodes of `doc` skolem identifiers `b<k>` of a fresh
/// scheme, numbered in document order.
pub fn skolemize(doc: &Value, canonicalizer: &Canonicalizer) -> Result<Skolemized, SuiteError> {
    let reference = canonicalizer.canonicalize(doc)?;
    let scheme = SkolemScheme::random();
    let candidates = candidates(doc);

    let mut all = doc.clone();
    for (k, path) in candidates.iter().enumerate() {
        set_id(&mut all, path, &scheme, k);
    }
    if let Ok((nquads, labels)) = canonicalizer.canonicalize_skolemized(&all, &scheme) {
        if nquads == reference {
            for (k, path) in candidates.iter().enumerate() {
                if !labels.contains_key(&label(k)) {
                    clear_id(&mut all, path);
                }
            }
            return Ok(Skolemized { document: all, scheme, nquads, labels });
        }
    }

    // Some candidate is not a node. Keep identifiers one at a time.
    let mut document = doc.clone();
    let mut kept = 0usize;
    for (k, path) in candidates.iter().enumerate() {
        set_id(&mut document, path, &scheme, k);
        let keep = matches!(
            canonicalizer.canonicalize_skolemized(&document, &scheme),
            Ok((nquads, labels)) if nquads == reference && labels.contains_key(&label(k))
        );
        if keep {
            kept += 1;
        } else {
            clear_id(&mut document, path);
        }
    }
    tracing::debug!(candidates = candidates.len(), kept, "skolemized credential object by object");

    let (nquads, labels) = canonicalizer.canonicalize_skolemized(&document, &scheme)?;
    if nquads != reference {
        return Err(SuiteError::InvalidProof("skolemization changed the credential".into()));
    }
    Ok(Skolemized { document, scheme, nquads, labels })
}

fn label(k: usize) -> String {
    format!("b{k}")
}

/// Paths to objects lacking `id`/`@id`, excluding value objects, `@list` and
/// `@set` objects and anything under `@context`.
fn candidates(doc: &Value) -> Vec<Vec<Step>> {
    let mut out = Vec::new();
    collect(doc, &mut Vec::new(), &mut out);
    out
}

fn collect(value: &Value, path: &mut Vec<Step>, out: &mut Vec<Vec<Step>>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(Step::Index(i));
                collect(item, path, out);
                path.pop();
            }
        }
        Value::Object(map) => {
            if map.contains_key("@value") {
                return;
            }
            let anonymous = !["id", "@id", "@list", "@set"].iter().any(|k| map.contains_key(*k));
            if anonymous {
                out.push(path.clone());
            }
            for (key, child) in map {
                if key != "@context" {
                    path.push(Step::Key(key.clone()));
                    collect(child, path, out);
                    path.pop();
                }
            }
        }
        _ => {}
    }
}

fn object_at<'a>(value: &'a mut Value, path: &[Step]) -> Option<&'a mut Map<String, Value>> {
    let mut current = value;
    for step in path {
        current = match step {
            Step::Key(key) => current.get_mut(key.as_str())?,
            Step::Index(i) => current.get_mut(*i)?,
        };
    }
    current.as_object_mut()
}

fn set_id(doc: &mut Value, path: &[Step], scheme: &SkolemScheme, k: usize) {
    if let Some(map) = object_at(doc, path) {
        map.insert("@id".into(), Value::String(scheme.iri(&label(k))));
    }
}

fn clear_id(doc: &mut Value, path: &[Step]) {
    if let Some(map) = object_at(doc, path) {
        map.remove("@id");
    }
}

/// Remove the identifiers of `scheme` from `value`.
pub fn deskolemize(value: &mut Value, scheme: &SkolemScheme) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(|item| deskolemize(item, scheme)),
        Value::Object(map) => {
            if map.get("@id").and_then(Value::as_str).is_some_and(|id| scheme.contains(id)) {
                map.remove("@id");
            }
            for (key, child) in map.iter_mut() {
                if key != "@context" {
                    deskolemize(child, scheme);
                }
            }
        }
        _ => {}
    }
}

/// Whether a converter blank node label (`b<k>`) came from [`skolemize`].
pub fn is_skolem_label(label: &str) -> bool {
    label
        .strip_prefix('b')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcdi_core::CREDENTIALS_V2_URL;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::with_builtin().unwrap()
    }

    fn is_skolem(value: &Value, scheme: &SkolemScheme) -> bool {
        value.get("@id").and_then(Value::as_str).is_some_and(|id| scheme.contains(id))
    }

    #[test]
    fn identifies_anonymous_nodes_only() {
        let doc = json!({
            "@context": [CREDENTIALS_V2_URL, {"ex": "https://ex.org/", "items": {"@id": "ex:items", "@container": "@list"}}],
            "type": ["VerifiableCredential"],
            "issuer": {"id": "did:example:issuer"},
            "credentialSubject": {
                "name": "Alice",
                "ex:note": {"@value": "hi", "@language": "en"},
                "items": [{"ex:label": "x"}]
            }
        });
        let s = skolemize(&doc, &canonicalizer()).unwrap();
        let out = &s.document;
        assert_eq!(out["@id"], s.scheme.iri("b0"));
        assert!(out["issuer"].get("@id").is_none());
        assert!(is_skolem(&out["credentialSubject"], &s.scheme));
        assert!(out["credentialSubject"]["ex:note"].get("@id").is_none());
        assert!(is_skolem(&out["credentialSubject"]["items"][0], &s.scheme));
        assert!(out["@context"][1].get("@id").is_none());
        assert_eq!(s.nquads, canonicalizer().canonicalize(&doc).unwrap());
        assert!(s.labels.contains_key("b0"));
    }

    #[test]
    fn json_literals_and_maps_are_left_alone() {
        let doc = json!({
            "@context": [CREDENTIALS_V2_URL, {
                "profile": {"@id": "https://example.org/profile", "@type": "@json"},
                "title": {"@id": "https://example.org/title", "@container": "@language"},
                "badges": {"@id": "https://example.org/badge", "@container": "@index"},
                "label": "https://example.org/label"
            }],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": {
                "profile": {"nickname": "Al", "nested": {"x": 1}},
                "title": {"en": "Dr", "fr": "Docteur"},
                "badges": {"gold": {"label": "first"}}
            }
        });
        let s = skolemize(&doc, &canonicalizer()).unwrap();
        let subject = &s.document["credentialSubject"];
        assert!(is_skolem(subject, &s.scheme));
        assert_eq!(subject["profile"], doc["credentialSubject"]["profile"]);
        assert_eq!(subject["title"], doc["credentialSubject"]["title"]);
        assert!(subject["badges"].get("@id").is_none());
        assert!(is_skolem(&subject["badges"]["gold"], &s.scheme));
        assert_eq!(s.nquads, canonicalizer().canonicalize(&doc).unwrap());
    }

    #[test]
    fn author_bnid_identifiers_are_not_skolem() {
        let doc = json!({
            "@context": [CREDENTIALS_V2_URL],
            "id": "urn:bnid:b0",
            "type": ["VerifiableCredential"],
            "credentialSubject": {"name": "Alice"}
        });
        let mut s = skolemize(&doc, &canonicalizer()).unwrap();
        assert!(s.nquads.as_str().contains("<urn:bnid:b0>"));
        assert_eq!(s.labels.len(), 1);
        deskolemize(&mut s.document, &s.scheme);
        assert_eq!(s.document, doc);
    }

    #[test]
    fn schemes_differ_per_call() {
        let doc = json!({"@context": [CREDENTIALS_V2_URL], "type": ["VerifiableCredential"]});
        let c = canonicalizer();
        let a = skolemize(&doc, &c).unwrap();
        let b = skolemize(&doc, &c).unwrap();
        assert_ne!(a.scheme, b.scheme);
        assert_eq!(a.nquads, b.nquads);
    }

    #[test]
    fn deskolemize_restores() {
        let doc = json!({
            "@context": [CREDENTIALS_V2_URL],
            "id": "urn:example:cred",
            "type": ["VerifiableCredential"],
            "credentialSubject": {"name": "Alice", "ex:friends": [{"name": "Bob"}], "@context": {"ex": "https://ex.org/"}}
        });
        let mut s = skolemize(&doc, &canonicalizer()).unwrap();
        assert_ne!(s.document, doc);
        deskolemize(&mut s.document, &s.scheme);
        assert_eq!(s.document, doc);
    }

    #[test]
    fn skolem_labels() {
        assert!(is_skolem_label("b12"));
        assert!(!is_skolem_label("g0"));
        assert!(!is_skolem_label("b"));
    }
}
