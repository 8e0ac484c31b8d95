//! # JSON Pointer Selection
//!
//! RFC 6901 pointers address the parts of a credential a holder discloses.
//! [`select_fields`] copies the addressed values into a fresh document that
//! keeps the source's shape: objects stay objects, arrays stay arrays, and
//! the selected elements of an array keep their relative order.
//!
//! ## Security Invariant
//!
//! Array tokens are strict. `"01"`, `"-"`, `"1e0"` and out-of-range indexes
//! are errors rather than silently mapping onto some other element, so a
//! pointer always addresses exactly one value or fails.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::SuiteError;

/// Keys that identify or type a JSON-LD node object.
const STRUCTURAL_KEYS: [&str; 4] = ["id", "@id", "type", "@type"];

// ---------------------------------------------------------------------------
// Pointer syntax
// ---------------------------------------------------------------------------

/// Check pointer syntax without resolving it.
///
/// The empty pointer is valid and addresses the whole document. Anything
/// else must start with `/`, and every `~` must be followed by `0` or `1`.
pub fn validate_json_pointer(pointer: &str) -> Result<(), SuiteError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(SuiteError::pointer(pointer, "must start with '/'"));
    }
    let mut chars = pointer.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0') | Some('1')) {
            return Err(SuiteError::pointer(pointer, "'~' must be followed by '0' or '1'"));
        }
    }
    Ok(())
}

/// Escape a single reference token (`~` → `~0`, `/` → `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single reference token. `~1` is replaced before `~0`, so
/// `~01` becomes `~1` and not `/`.
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a pointer into unescaped reference tokens.
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, SuiteError> {
    validate_json_pointer(pointer)?;
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(pointer[1..].split('/').map(unescape_token).collect())
}

fn array_index(pointer: &str, token: &str, len: usize) -> Result<usize, SuiteError> {
    if token == "-" {
        return Err(SuiteError::not_found(pointer, "'-' addresses past the end of the array"));
    }
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SuiteError::not_found(pointer, format!("{token:?} is not an array index")));
    }
    if token.len() > 1 && token.starts_with('0') {
        return Err(SuiteError::not_found(pointer, format!("array index {token:?} has leading zeros")));
    }
    let index: usize = token
        .parse()
        .map_err(|_| SuiteError::not_found(pointer, format!("array index {token} is out of range")))?;
    if index >= len {
        return Err(SuiteError::not_found(
            pointer,
            format!("array index {index} out of bounds (length {len})"),
        ));
    }
    Ok(index)
}

fn step<'a>(current: &'a Value, token: &str, pointer: &str) -> Result<&'a Value, SuiteError> {
    match current {
        Value::Object(map) => map
            .get(token)
            .ok_or_else(|| SuiteError::not_found(pointer, format!("no member {token:?}"))),
        Value::Array(items) => Ok(&items[array_index(pointer, token, items.len())?]),
        _ => Err(SuiteError::not_found(
            pointer,
            format!("cannot descend into a scalar with {token:?}"),
        )),
    }
}

/// Resolve `pointer` against `doc`.
pub fn apply_json_pointer<'a>(doc: &'a Value, pointer: &str) -> Result<&'a Value, SuiteError> {
    let mut current = doc;
    for token in parse_pointer(pointer)? {
        current = step(current, &token, pointer)?;
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Partially built selection. Sparse arrays are compacted on output.
enum Node {
    Empty,
    Whole(Value),
    Object(BTreeMap<String, Node>),
    Array(BTreeMap<usize, Node>),
}

impl Node {
    fn insert(&mut self, source: &Value, tokens: &[String], pointer: &str) -> Result<(), SuiteError> {
        let Some((head, rest)) = tokens.split_first() else {
            *self = Node::Whole(source.clone());
            return Ok(());
        };
        if matches!(self, Node::Whole(_)) {
            return Ok(());
        }
        match source {
            Value::Object(map) => {
                let child = map
                    .get(head)
                    .ok_or_else(|| SuiteError::not_found(pointer, format!("no member {head:?}")))?;
                if matches!(self, Node::Empty) {
                    *self = Node::Object(BTreeMap::new());
                }
                if let Node::Object(children) = self {
                    children.entry(head.clone()).or_insert(Node::Empty).insert(child, rest, pointer)?;
                }
            }
            Value::Array(items) => {
                let index = array_index(pointer, head, items.len())?;
                if matches!(self, Node::Empty) {
                    *self = Node::Array(BTreeMap::new());
                }
                if let Node::Array(children) = self {
                    children.entry(index).or_insert(Node::Empty).insert(&items[index], rest, pointer)?;
                }
            }
            _ => {
                return Err(SuiteError::not_found(
                    pointer,
                    format!("cannot descend into a scalar with {head:?}"),
                ))
            }
        }
        Ok(())
    }

    fn into_value(self) -> Value {
        match self {
            Node::Empty => Value::Null,
            Node::Whole(value) => value,
            Node::Object(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::Array(children) => {
                Value::Array(children.into_values().map(Node::into_value).collect())
            }
        }
    }
}

/// Copy the values addressed by `pointers` into a new document with the
/// same paths. An empty pointer list is an error.
pub fn select_fields<S: AsRef<str>>(doc: &Value, pointers: &[S]) -> Result<Value, SuiteError> {
    if pointers.is_empty() {
        return Err(SuiteError::EmptySelection);
    }
    let mut root = Node::Empty;
    for pointer in pointers {
        let pointer = pointer.as_ref();
        let tokens = parse_pointer(pointer)?;
        root.insert(doc, &tokens, pointer)?;
    }
    Ok(root.into_value())
}

/// Pointers to the `@context` and to the `id`/`type` members of every object
/// crossed on the way to each selected value.
///
/// Disclosing these keeps term definitions (type-scoped contexts in
/// particular) and node identity intact in the selected document.
pub fn structural_pointers<S: AsRef<str>>(
    doc: &Value,
    pointers: &[S],
) -> Result<Vec<String>, SuiteError> {
    let mut out = BTreeSet::new();
    if doc.get("@context").is_some() {
        out.insert("/@context".to_string());
    }
    for pointer in pointers {
        let pointer = pointer.as_ref();
        let mut current = doc;
        let mut path = String::new();
        for token in parse_pointer(pointer)? {
            if let Value::Object(map) = current {
                for key in STRUCTURAL_KEYS.iter().filter(|k| map.contains_key(**k)) {
                    out.insert(format!("{path}/{}", escape_token(key)));
                }
            }
            current = step(current, &token, pointer)?;
            path.push('/');
            path.push_str(&escape_token(&token));
        }
    }
    Ok(out.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Pointer set algebra
// ---------------------------------------------------------------------------

/// Whether `pointer` is one of `mandatory` or lies underneath one of them.
pub fn is_mandatory<S: AsRef<str>>(pointer: &str, mandatory: &[S]) -> bool {
    mandatory.iter().any(|m| {
        let m = m.as_ref();
        pointer == m || m.is_empty() || pointer.strip_prefix(m).is_some_and(|rest| rest.starts_with('/'))
    })
}

/// The pointers that are not already covered by `mandatory`, de-duplicated
/// in input order.
pub fn filter_pointers<S: AsRef<str>, T: AsRef<str>>(pointers: &[S], mandatory: &[T]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for p in pointers.iter().map(AsRef::as_ref) {
        if !is_mandatory(p, mandatory) && !out.iter().any(|o| o == p) {
            out.push(p.to_string());
        }
    }
    out
}

/// Mandatory pointers first, then the selective ones, without duplicates.
pub fn merge_pointers<S: AsRef<str>, T: AsRef<str>>(mandatory: &[S], selective: &[T]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(mandatory.len() + selective.len());
    for p in mandatory
        .iter()
        .map(AsRef::as_ref)
        .chain(selective.iter().map(AsRef::as_ref))
    {
        if !out.iter().any(|o| o == p) {
            out.push(p.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "@context": ["https://www.w3.org/ns/credentials/v2"],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": {
                "id": "did:example:alice",
                "name": "Alice",
                "age": 30,
                "skills": ["rust", "go", "sql"],
                "a/b": 1,
                "m~n": 2
            }
        })
    }

    #[test]
    fn empty_pointer_is_whole_document() {
        let d = doc();
        assert_eq!(apply_json_pointer(&d, "").unwrap(), &d);
    }

    #[test]
    fn escaped_tokens_resolve() {
        let d = doc();
        assert_eq!(apply_json_pointer(&d, "/credentialSubject/a~1b").unwrap(), &json!(1));
        assert_eq!(apply_json_pointer(&d, "/credentialSubject/m~0n").unwrap(), &json!(2));
        assert_eq!(unescape_token("~01"), "~1");
        assert_eq!(escape_token("a/~b"), "a~1~0b");
    }

    #[test]
    fn syntax_errors() {
        assert!(validate_json_pointer("credentialSubject").is_err());
        assert!(validate_json_pointer("/a~2").is_err());
        assert!(validate_json_pointer("/a~").is_err());
        assert!(validate_json_pointer("/a~0~1").is_ok());
        assert!(matches!(
            apply_json_pointer(&doc(), "name"),
            Err(SuiteError::InvalidPointer { .. })
        ));
    }

    #[test]
    fn array_index_rules() {
        let d = doc();
        assert_eq!(apply_json_pointer(&d, "/credentialSubject/skills/0").unwrap(), "rust");
        for bad in ["/credentialSubject/skills/3", "/credentialSubject/skills/01",
                    "/credentialSubject/skills/-", "/credentialSubject/skills/x",
                    "/credentialSubject/skills/99999999999999999999999"] {
            assert!(
                matches!(apply_json_pointer(&d, bad), Err(SuiteError::PointerNotFound { .. })),
                "{bad} should not resolve"
            );
        }
    }

    #[test]
    fn missing_member_and_scalar_descent() {
        let d = doc();
        assert!(apply_json_pointer(&d, "/credentialSubject/email").is_err());
        assert!(apply_json_pointer(&d, "/issuer/id").is_err());
    }

    #[test]
    fn select_mirrors_shape() {
        let d = doc();
        let selected = select_fields(
            &d,
            &["/credentialSubject/name", "/credentialSubject/skills/2", "/credentialSubject/skills/0"],
        )
        .unwrap();
        assert_eq!(
            selected,
            json!({"credentialSubject": {"name": "Alice", "skills": ["rust", "sql"]}})
        );
    }

    #[test]
    fn select_whole_subtree_absorbs_children() {
        let d = doc();
        let selected =
            select_fields(&d, &["/credentialSubject/name", "/credentialSubject"]).unwrap();
        assert_eq!(selected["credentialSubject"], d["credentialSubject"]);
        assert_eq!(select_fields(&d, &[""]).unwrap(), d);
    }

    #[test]
    fn select_requires_pointers() {
        let none: [&str; 0] = [];
        assert!(matches!(select_fields(&doc(), &none), Err(SuiteError::EmptySelection)));
        assert!(select_fields(&doc(), &["/nope"]).is_err());
    }

    #[test]
    fn structural_pointers_cover_path() {
        let d = doc();
        let extra = structural_pointers(&d, &["/credentialSubject/name"]).unwrap();
        assert_eq!(extra, vec!["/@context", "/credentialSubject/id", "/type"]);
    }

    #[test]
    fn pointer_algebra() {
        let mandatory = ["/issuer", "/credentialSubject/id"];
        assert!(is_mandatory("/issuer", &mandatory));
        assert!(is_mandatory("/credentialSubject/id/x", &mandatory));
        assert!(!is_mandatory("/credentialSubject/identity", &mandatory));
        assert!(is_mandatory("/anything", &[""]));

        let filtered = filter_pointers(&["/issuer", "/credentialSubject/name", "/credentialSubject/name"], &mandatory);
        assert_eq!(filtered, vec!["/credentialSubject/name"]);

        let merged = merge_pointers(&mandatory, &["/credentialSubject/name", "/issuer"]);
        assert_eq!(merged, vec!["/issuer", "/credentialSubject/id", "/credentialSubject/name"]);
    }
}
