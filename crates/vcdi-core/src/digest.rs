//! # Digests
//!
//! SHA-256 helpers shared by the canonicalizer and the cryptosuite, plus the
//! [`HashAlgorithm`] name table used by `hash_with_algorithm`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CanonicalizationError;

/// Hash algorithm selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256.
    #[serde(rename = "sha256", alias = "SHA-256")]
    Sha256,
}

impl HashAlgorithm {
    /// The lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Digest `data`.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha256 => sha256(data),
        }
    }

    /// Digest `data` as lowercase hex.
    pub fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CanonicalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" | "SHA-256" => Ok(Self::Sha256),
            other => Err(CanonicalizationError::UnsupportedHashAlgorithm(
                other.to_string(),
            )),
        }
    }
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_concat<I, B>(parts: I) -> [u8; 32]
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hasher.finalize().into()
}
