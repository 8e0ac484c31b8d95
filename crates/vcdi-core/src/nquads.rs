//! # Canonical N-Quads
//!
//! [`CanonicalNQuads`] holds the output of RDF dataset canonicalization:
//! one statement per line, each terminated by ` .\n`, lines sorted in
//! code-point order with no duplicates.
//!
//! ## Security Invariant
//!
//! The only ways to build a `CanonicalNQuads` are the canonicalizer and
//! [`CanonicalNQuads::from_statements`], which both sort and de-duplicate.
//! Anything hashed or signed downstream is therefore in canonical order.
//!
//! The scanner in this module is token aware: text inside `<IRI>`s and
//! `"literals"` is never mistaken for a blank node label.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

use oxrdf::{GraphNameRef, QuadRef, SubjectRef, TermRef};

use crate::error::CanonicalizationError;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Canonical N-Quads text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CanonicalNQuads(String);

impl CanonicalNQuads {
    /// Build from individual statements.
    ///
    /// Each statement may or may not carry its trailing newline. The result
    /// is sorted and de-duplicated.
    pub fn from_statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: BTreeSet<String> = statements
            .into_iter()
            .map(|s| s.as_ref().trim_end_matches('\n').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let mut out = String::new();
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        Self(out)
    }

    /// The full text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw bytes, as hashed.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consume into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Statements in canonical order, without trailing newlines.
    pub fn statements(&self) -> Vec<&str> {
        self.0.lines().collect()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.0.lines().count()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct graph names used by the statements, as N-Quads terms.
    /// The default graph is not listed.
    pub fn graphs(&self) -> BTreeSet<String> {
        self.0
            .lines()
            .filter_map(|line| terms(line).get(3).map(|g| g.to_string()))
            .collect()
    }

    /// Statements in the given graph. `None` selects the default graph.
    pub fn filter_by_graph(&self, graph: Option<&str>) -> CanonicalNQuads {
        CanonicalNQuads::from_statements(
            self.0
                .lines()
                .filter(|line| terms(line).get(3).copied() == graph),
        )
    }

    /// Blank node labels (with the `_:` prefix) in order of first use.
    pub fn blank_node_labels(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut labels = Vec::new();
        for range in blank_node_ranges(&self.0) {
            let label = &self.0[range];
            if seen.insert(label) {
                labels.push(label.to_string());
            }
        }
        labels
    }
}

impl fmt::Display for CanonicalNQuads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalNQuads {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Byte ranges of every `_:label` token in N-Quads text, skipping IRIs and
/// literals.
pub fn blank_node_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => i = skip_iri(bytes, i),
            b'"' => i = skip_literal(bytes, i),
            b'_' if bytes.get(i + 1) == Some(&b':') => {
                let start = i;
                let mut end = i + 2;
                while end < bytes.len() && is_label_byte(bytes[end]) {
                    end += 1;
                }
                while end > start + 2 && bytes[end - 1] == b'.' {
                    end -= 1;
                }
                if end > start + 2 {
                    ranges.push(start..end);
                }
                i = end.max(i + 2);
            }
            _ => i += 1,
        }
    }
    ranges
}

fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn skip_iri(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    i + 1
}

fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// Split one statement into its terms (subject, predicate, object and the
/// optional graph name). The trailing ` .` is dropped.
pub fn terms(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'.' if i + 1 == bytes.len() => break,
            b'<' => {
                let end = skip_iri(bytes, i).min(bytes.len());
                out.push(&line[i..end]);
                i = end;
            }
            b'"' => {
                let mut end = skip_literal(bytes, i);
                // datatype or language suffix
                if line[end.min(bytes.len())..].starts_with("^^<") {
                    end = skip_iri(bytes, end + 2);
                } else if bytes.get(end) == Some(&b'@') {
                    while end < bytes.len() && bytes[end] != b' ' {
                        end += 1;
                    }
                }
                let end = end.min(bytes.len());
                out.push(&line[i..end]);
                i = end;
            }
            _ => {
                let start = i;
                while i < bytes.len() && bytes[i] != b' ' {
                    i += 1;
                }
                out.push(&line[start..i]);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Format one quad as a canonical N-Quads statement (without newline),
/// renaming blank nodes through `labels`. Unmapped blank nodes keep their
/// label.
pub(crate) fn format_quad(
    quad: QuadRef<'_>,
    labels: &HashMap<String, String>,
) -> Result<String, CanonicalizationError> {
    let mut out = String::new();
    let blank = |id: &str, out: &mut String| {
        out.push_str("_:");
        out.push_str(labels.get(id).map(String::as_str).unwrap_or(id));
    };

    #[allow(unreachable_patterns)]
    match quad.subject {
        SubjectRef::NamedNode(n) => push_iri(&mut out, n.as_str()),
        SubjectRef::BlankNode(b) => blank(b.as_str(), &mut out),
        _ => return Err(CanonicalizationError::Unsupported("quoted triples".into())),
    }
    out.push(' ');
    push_iri(&mut out, quad.predicate.as_str());
    out.push(' ');

    #[allow(unreachable_patterns)]
    match quad.object {
        TermRef::NamedNode(n) => push_iri(&mut out, n.as_str()),
        TermRef::BlankNode(b) => blank(b.as_str(), &mut out),
        TermRef::Literal(l) => {
            out.push('"');
            escape_literal(&mut out, l.value());
            out.push('"');
            if let Some(lang) = l.language() {
                out.push('@');
                out.push_str(lang);
            } else {
                let dt = l.datatype().as_str();
                if dt != XSD_STRING && dt != RDF_LANG_STRING {
                    out.push_str("^^");
                    push_iri(&mut out, dt);
                }
            }
        }
        _ => return Err(CanonicalizationError::Unsupported("quoted triples".into())),
    }

    match quad.graph_name {
        GraphNameRef::DefaultGraph => {}
        GraphNameRef::NamedNode(n) => {
            out.push(' ');
            push_iri(&mut out, n.as_str());
        }
        GraphNameRef::BlankNode(b) => {
            out.push(' ');
            blank(b.as_str(), &mut out);
        }
    }
    out.push_str(" .");
    Ok(out)
}

fn push_iri(out: &mut String, iri: &str) {
    out.push('<');
    out.push_str(iri);
    out.push('>');
}

fn escape_literal(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
}
