//! # Verification Method Resolution
//!
//! Verifiers look up the issuer's public key from the proof's
//! `verificationMethod`. Resolution is a trait so deployments can plug in DID
//! resolution. Two in-process implementations ship here:
//!
//! - [`StaticKeyResolver`]: a fixed id → key map, for tests and pinned keys.
//! - [`MultikeyDocumentResolver`]: registered `Multikey` verification method
//!   documents, decoded on lookup.
//!
//! Neither performs network I/O.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use vcdi_crypto::{multikey_to_public_key, EcdsaPublicKey};

use crate::error::SuiteError;

/// Resolves a verification method id to a public key.
pub trait VerificationMethodResolver: Send + Sync {
    /// Look up the key for `method_id`.
    fn resolve_public_key(&self, method_id: &str) -> Result<EcdsaPublicKey, SuiteError>;
}

impl<T: VerificationMethodResolver + ?Sized> VerificationMethodResolver for &T {
    fn resolve_public_key(&self, method_id: &str) -> Result<EcdsaPublicKey, SuiteError> {
        (**self).resolve_public_key(method_id)
    }
}

impl<T: VerificationMethodResolver + ?Sized> VerificationMethodResolver for std::sync::Arc<T> {
    fn resolve_public_key(&self, method_id: &str) -> Result<EcdsaPublicKey, SuiteError> {
        (**self).resolve_public_key(method_id)
    }
}

// ---------------------------------------------------------------------------
// Static map
// ---------------------------------------------------------------------------

/// In-memory map from verification method id to key.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, EcdsaPublicKey>,
}

impl StaticKeyResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_key(mut self, method_id: impl Into<String>, key: EcdsaPublicKey) -> Self {
        self.insert(method_id, key);
        self
    }

    /// Register or replace a key.
    pub fn insert(&mut self, method_id: impl Into<String>, key: EcdsaPublicKey) {
        self.keys.insert(method_id.into(), key);
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key is registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl VerificationMethodResolver for StaticKeyResolver {
    fn resolve_public_key(&self, method_id: &str) -> Result<EcdsaPublicKey, SuiteError> {
        self.keys
            .get(method_id)
            .cloned()
            .ok_or_else(|| SuiteError::UnknownVerificationMethod(method_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Multikey documents
// ---------------------------------------------------------------------------

/// Resolves from registered `Multikey` verification method documents:
///
/// ```json
/// {"id": "did:example:issuer#key-1", "type": "Multikey",
///  "controller": "did:example:issuer", "publicKeyMultibase": "zDn..."}
/// ```
///
/// Documents are validated when registered. Registration and lookup may
/// happen concurrently.
#[derive(Debug, Default)]
pub struct MultikeyDocumentResolver {
    documents: RwLock<HashMap<String, Value>>,
}

impl MultikeyDocumentResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver seeded with `documents`.
    pub fn from_documents(documents: impl IntoIterator<Item = Value>) -> Result<Self, SuiteError> {
        let resolver = Self::new();
        for document in documents {
            resolver.register(document)?;
        }
        Ok(resolver)
    }

    /// Validate and register a verification method document, replacing any
    /// document with the same id. Returns the id.
    pub fn register(&self, document: Value) -> Result<String, SuiteError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SuiteError::InvalidVerificationMethod("missing id".into()))?
            .to_string();
        match document.get("type").and_then(Value::as_str) {
            Some("Multikey") => {}
            other => {
                return Err(SuiteError::InvalidVerificationMethod(format!(
                    "{id}: expected type Multikey, got {other:?}"
                )))
            }
        }
        decode_key(&id, &document)?;
        self.documents.write().insert(id.clone(), document);
        Ok(id)
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

fn decode_key(id: &str, document: &Value) -> Result<EcdsaPublicKey, SuiteError> {
    let multikey = document
        .get("publicKeyMultibase")
        .and_then(Value::as_str)
        .ok_or_else(|| SuiteError::InvalidVerificationMethod(format!("{id}: missing publicKeyMultibase")))?;
    Ok(multikey_to_public_key(multikey)?)
}

impl VerificationMethodResolver for MultikeyDocumentResolver {
    fn resolve_public_key(&self, method_id: &str) -> Result<EcdsaPublicKey, SuiteError> {
        let documents = self.documents.read();
        let document = documents
            .get(method_id)
            .ok_or_else(|| SuiteError::UnknownVerificationMethod(method_id.to_string()))?;
        decode_key(method_id, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vcdi_crypto::{generate_key_pair, public_key_to_multikey, Curve};

    #[test]
    fn static_resolver_lookup() {
        let (_, pk) = generate_key_pair(Curve::P256);
        let resolver = StaticKeyResolver::new().with_key("did:example:issuer#key-1", pk.clone());
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve_public_key("did:example:issuer#key-1").unwrap(), pk);
        assert!(matches!(
            resolver.resolve_public_key("did:example:issuer#key-2"),
            Err(SuiteError::UnknownVerificationMethod(_))
        ));
    }

    #[test]
    fn multikey_documents_resolve() {
        let (_, pk) = generate_key_pair(Curve::P384);
        let resolver = MultikeyDocumentResolver::from_documents([json!({
            "id": "did:example:issuer#key-1",
            "type": "Multikey",
            "controller": "did:example:issuer",
            "publicKeyMultibase": public_key_to_multikey(&pk)
        })])
        .unwrap();
        assert_eq!(resolver.resolve_public_key("did:example:issuer#key-1").unwrap(), pk);
        assert!(resolver.resolve_public_key("did:example:other#key-1").is_err());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let resolver = MultikeyDocumentResolver::new();
        assert!(resolver.register(json!({"type": "Multikey", "publicKeyMultibase": "z"})).is_err());
        assert!(resolver
            .register(json!({"id": "did:x#1", "type": "JsonWebKey", "publicKeyMultibase": "z"}))
            .is_err());
        assert!(resolver.register(json!({"id": "did:x#1", "type": "Multikey"})).is_err());
        assert!(resolver
            .register(json!({"id": "did:x#1", "type": "Multikey", "publicKeyMultibase": "zzzz"}))
            .is_err());
        assert!(resolver.is_empty());
    }

    #[test]
    fn resolvers_work_through_references() {
        let (_, pk) = generate_key_pair(Curve::P256);
        let resolver = StaticKeyResolver::new().with_key("k", pk.clone());
        let dynamic: &dyn VerificationMethodResolver = &resolver;
        assert_eq!((&dynamic).resolve_public_key("k").unwrap(), pk);
        let shared = std::sync::Arc::new(resolver);
        assert_eq!(shared.resolve_public_key("k").unwrap(), pk);
    }
}
