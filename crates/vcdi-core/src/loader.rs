//! # Context Loader — Injectable TTL Cache for JSON-LD Contexts
//!
//! JSON-LD documents reference their vocabularies by URL. Canonicalization
//! must never reach for the network implicitly, so every context document
//! comes from an explicitly constructed [`ContextLoader`]:
//!
//! - **Built-in contexts** are embedded in the binary and pinned once
//!   [`ContextLoader::warm()`] runs. They never expire.
//! - **Registered contexts** are added with [`ContextLoader::add_context()`]
//!   and expire after the configured TTL.
//! - **Sourced contexts** come from an optional [`ContextSource`] on a cache
//!   miss or after expiry.
//!
//! The loader is shared through `Arc` by every [`Canonicalizer`] built on it.
//! It is read-mostly after warm-up and safe for concurrent use.
//!
//! [`Canonicalizer`]: crate::canonical::Canonicalizer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContextError;

/// URL of the W3C Verifiable Credentials v2 context.
pub const CREDENTIALS_V2_URL: &str = "https://www.w3.org/ns/credentials/v2";

const CREDENTIALS_V2: &str = include_str!("../contexts/credentials-v2.jsonld");

/// Context documents compiled into the crate, keyed by URL.
pub const BUILTIN_CONTEXTS: &[(&str, &str)] = &[(CREDENTIALS_V2_URL, CREDENTIALS_V2)];

/// Default lifetime of non-pinned cache entries (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Loader configuration, typically read from the CLI configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LoaderConfig {
    /// Lifetime of registered and sourced entries, in seconds.
    pub ttl_secs: u64,
    /// Pin the built-in contexts at construction time.
    pub preload_builtin: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            preload_builtin: true,
        }
    }
}

impl LoaderConfig {
    /// The configured TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// Context source
// ---------------------------------------------------------------------------

/// A provider of context documents consulted on cache misses.
///
/// Implementations decide where documents come from (a directory, a
/// pinned bundle, an HTTP client owned by the application). The loader
/// never calls a source for pinned entries.
pub trait ContextSource: Send + Sync {
    /// Fetch the document published at `url`.
    fn fetch(&self, url: &str) -> Result<Value, ContextError>;
}

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Arc<Value>,
    inserted: Instant,
    pinned: bool,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.pinned || self.inserted.elapsed() < ttl
    }
}

// ---------------------------------------------------------------------------
// ContextLoader
// ---------------------------------------------------------------------------

/// Concurrency-safe, TTL-bounded cache of JSON-LD context documents.
pub struct ContextLoader {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    source: Option<Box<dyn ContextSource>>,
}

impl std::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoader")
            .field("entries", &self.entries.read().len())
            .field("ttl", &self.ttl)
            .field("source", &self.source.is_some())
            .finish()
    }
}

impl Default for ContextLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ContextLoader {
    /// Create an empty loader. Call [`warm()`](Self::warm) to pin the
    /// built-in contexts.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            source: None,
        }
    }

    /// Create a loader from configuration, warming it when requested.
    pub fn from_config(config: &LoaderConfig) -> Result<Self, ContextError> {
        let loader = Self::new(config.ttl());
        if config.preload_builtin {
            loader.warm()?;
        }
        Ok(loader)
    }

    /// Create a warmed loader with the default TTL.
    pub fn with_builtin() -> Result<Self, ContextError> {
        let loader = Self::default();
        loader.warm()?;
        Ok(loader)
    }

    /// Attach a source consulted for misses and expired entries.
    pub fn with_source(mut self, source: impl ContextSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Pin every built-in context. Returns the number of pinned entries.
    ///
    /// Idempotent: warming twice leaves the cache unchanged.
    pub fn warm(&self) -> Result<usize, ContextError> {
        let mut entries = self.entries.write();
        for (url, text) in BUILTIN_CONTEXTS {
            let document: Value =
                serde_json::from_str(text).map_err(|e| ContextError::InvalidDocument {
                    url: (*url).to_string(),
                    reason: e.to_string(),
                })?;
            check_context_document(url, &document)?;
            entries.insert(
                (*url).to_string(),
                CacheEntry {
                    document: Arc::new(document),
                    inserted: Instant::now(),
                    pinned: true,
                },
            );
        }
        tracing::debug!(count = BUILTIN_CONTEXTS.len(), "pinned built-in JSON-LD contexts");
        Ok(BUILTIN_CONTEXTS.len())
    }

    /// Register a context document under `url`. Subject to the TTL.
    pub fn add_context(&self, url: &str, document: Value) -> Result<(), ContextError> {
        check_context_document(url, &document)?;
        self.entries.write().insert(
            url.to_string(),
            CacheEntry {
                document: Arc::new(document),
                inserted: Instant::now(),
                pinned: false,
            },
        );
        Ok(())
    }

    /// Load the context document published at `url`.
    pub fn load(&self, url: &str) -> Result<Arc<Value>, ContextError> {
        if let Some(entry) = self.entries.read().get(url) {
            if entry.is_fresh(self.ttl) {
                return Ok(Arc::clone(&entry.document));
            }
        }

        let Some(source) = &self.source else {
            // Expired entries are dropped when nothing can refresh them.
            self.entries.write().remove(url);
            return Err(ContextError::NotFound(url.to_string()));
        };

        tracing::debug!(url, "fetching JSON-LD context from source");
        let document = source.fetch(url)?;
        check_context_document(url, &document)?;
        let document = Arc::new(document);
        self.entries.write().insert(
            url.to_string(),
            CacheEntry {
                document: Arc::clone(&document),
                inserted: Instant::now(),
                pinned: false,
            },
        );
        Ok(document)
    }

    /// Whether a fresh entry for `url` is cached.
    pub fn contains(&self, url: &str) -> bool {
        self.entries
            .read()
            .get(url)
            .is_some_and(|e| e.is_fresh(self.ttl))
    }

    /// Number of cached entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired, non-pinned entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(self.ttl));
        before - entries.len()
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn check_context_document(url: &str, document: &Value) -> Result<(), ContextError> {
    match document.get("@context") {
        Some(Value::Object(_)) | Some(Value::Array(_)) | Some(Value::String(_)) => Ok(()),
        _ => Err(ContextError::InvalidDocument {
            url: url.to_string(),
            reason: "document has no @context member".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl ContextSource for CountingSource {
        fn fetch(&self, url: &str) -> Result<Value, ContextError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url == "https://example.org/missing" {
                return Err(ContextError::NotFound(url.to_string()));
            }
            Ok(json!({"@context": {"ex": "https://example.org/vocab#"}}))
        }
    }

    #[test]
    fn warm_pins_builtin_contexts() {
        let loader = ContextLoader::default();
        assert!(loader.is_empty());
        assert_eq!(loader.warm().unwrap(), BUILTIN_CONTEXTS.len());
        assert!(loader.contains(CREDENTIALS_V2_URL));
        let doc = loader.load(CREDENTIALS_V2_URL).unwrap();
        assert!(doc["@context"]["VerifiableCredential"].is_object());
    }

    #[test]
    fn warm_is_idempotent() {
        let loader = ContextLoader::default();
        loader.warm().unwrap();
        loader.warm().unwrap();
        assert_eq!(loader.len(), BUILTIN_CONTEXTS.len());
    }

    #[test]
    fn unknown_url_without_source_is_not_found() {
        let loader = ContextLoader::with_builtin().unwrap();
        let err = loader.load("https://example.org/unknown").unwrap_err();
        assert_eq!(err, ContextError::NotFound("https://example.org/unknown".into()));
    }

    #[test]
    fn add_context_rejects_documents_without_context() {
        let loader = ContextLoader::default();
        let err = loader
            .add_context("https://example.org/bad", json!({"foo": 1}))
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidDocument { .. }));
    }

    #[test]
    fn registered_context_is_served_from_cache() {
        let loader = ContextLoader::default();
        loader
            .add_context("https://example.org/ctx", json!({"@context": {"a": "https://a/"}}))
            .unwrap();
        let doc = loader.load("https://example.org/ctx").unwrap();
        assert_eq!(doc["@context"]["a"], "https://a/");
    }

    #[test]
    fn expired_entry_without_source_is_dropped() {
        let loader = ContextLoader::new(Duration::ZERO);
        loader
            .add_context("https://example.org/ctx", json!({"@context": {}}))
            .unwrap();
        assert!(!loader.contains("https://example.org/ctx"));
        assert!(loader.load("https://example.org/ctx").is_err());
        assert!(loader.is_empty());
    }

    #[test]
    fn pinned_entries_survive_zero_ttl() {
        let loader = ContextLoader::new(Duration::ZERO);
        loader.warm().unwrap();
        assert!(loader.load(CREDENTIALS_V2_URL).is_ok());
        assert_eq!(loader.purge_expired(), 0);
    }

    #[test]
    fn source_is_consulted_once_within_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ContextLoader::default().with_source(CountingSource {
            calls: Arc::clone(&calls),
        });
        loader.load("https://example.org/ctx").unwrap();
        loader.load("https://example.org/ctx").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entries_are_refetched_from_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ContextLoader::new(Duration::ZERO).with_source(CountingSource {
            calls: Arc::clone(&calls),
        });
        loader.load("https://example.org/ctx").unwrap();
        loader.load("https://example.org/ctx").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn source_errors_propagate() {
        let loader = ContextLoader::default().with_source(CountingSource {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        assert!(loader.load("https://example.org/missing").is_err());
    }

    #[test]
    fn from_config_respects_preload_flag() {
        let cold = ContextLoader::from_config(&LoaderConfig {
            ttl_secs: 60,
            preload_builtin: false,
        })
        .unwrap();
        assert!(cold.is_empty());
        assert_eq!(cold.ttl(), Duration::from_secs(60));

        let warm = ContextLoader::from_config(&LoaderConfig::default()).unwrap();
        assert!(warm.contains(CREDENTIALS_V2_URL));
    }

    #[test]
    fn concurrent_loads_share_one_cache() {
        let loader = Arc::new(ContextLoader::with_builtin().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                std::thread::spawn(move || loader.load(CREDENTIALS_V2_URL).is_ok())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
