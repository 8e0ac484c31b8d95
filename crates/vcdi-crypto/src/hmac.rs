//! # HMAC Blank Node Randomizer
//!
//! Canonical blank node labels (`_:c14n0`, ...) leak the shape of a
//! credential. Each label is replaced by `_:u` + hex(HMAC-SHA256(key,
//! label)) under a per-credential key, so labels are stable for whoever holds
//! the key and meaningless to everybody else.
//!
//! ## Security Invariant
//!
//! - [`HmacKey`] is exactly 32 bytes, zeroized on drop, and `Debug` never
//!   prints it.
//! - Tag comparison is constant time.
//! - Relabelling is token aware: text inside IRIs and literals is never
//!   rewritten, and `_:c14n1` never matches the prefix of `_:c14n10`.

use std::collections::BTreeMap;
use std::fmt;

use ::hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use vcdi_core::blank_node_ranges;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC key length in bytes.
pub const HMAC_KEY_LENGTH: usize = 32;

/// Canonical label to randomized label, both with the `_:` prefix.
pub type CanonicalIdMap = BTreeMap<String, String>;

/// A 32-byte HMAC-SHA256 key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HmacKey([u8; HMAC_KEY_LENGTH]);

impl HmacKey {
    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; HMAC_KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing key bytes. Any length other than 32 is rejected.
    pub fn new(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; HMAC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHmacKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; HMAC_KEY_LENGTH] {
        &self.0
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.0).expect("BUG: HMAC rejected a 32-byte key")
    }

    /// HMAC-SHA256 of `data`.
    pub fn compute(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Constant-time check of `tag` against HMAC-SHA256 of `data`.
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let expected = self.compute(data);
        tag.len() == expected.len() && bool::from(expected.as_slice().ct_eq(tag))
    }
}

impl PartialEq for HmacKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.as_slice().ct_eq(other.0.as_slice()))
    }
}

impl Eq for HmacKey {}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacKey(<redacted>)")
    }
}

/// HMAC-SHA256 of `data` under `key`.
pub fn compute_hmac(key: &HmacKey, data: &[u8]) -> [u8; 32] {
    key.compute(data)
}

/// Constant-time HMAC verification.
pub fn verify_hmac(key: &HmacKey, data: &[u8], tag: &[u8]) -> bool {
    key.verify(data, tag)
}

/// Randomized form of one label: `_:u` + 64 hex characters.
pub fn randomize_label(key: &HmacKey, label: &str) -> String {
    format!("_:u{}", hex::encode(key.compute(label.as_bytes())))
}

/// Randomized labels for every input label. The HMAC input is the label
/// exactly as given, `_:` prefix included.
pub fn randomize_blank_node_labels<S: AsRef<str>>(key: &HmacKey, labels: &[S]) -> CanonicalIdMap {
    labels
        .iter()
        .map(|l| (l.as_ref().to_string(), randomize_label(key, l.as_ref())))
        .collect()
}

/// Blank node labels in N-Quads text, de-duplicated, in order of first use.
pub fn extract_blank_node_labels(nquads: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for range in blank_node_ranges(nquads) {
        let label = &nquads[range];
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

/// Replace blank node labels according to `map`. Unmapped labels are kept.
pub fn relabel_blank_nodes(nquads: &str, map: &CanonicalIdMap) -> String {
    let mut out = String::with_capacity(nquads.len() + map.len() * 64);
    let mut cursor = 0;
    for range in blank_node_ranges(nquads) {
        out.push_str(&nquads[cursor..range.start]);
        let label = &nquads[range.clone()];
        out.push_str(map.get(label).map(String::as_str).unwrap_or(label));
        cursor = range.end;
    }
    out.push_str(&nquads[cursor..]);
    out
}
