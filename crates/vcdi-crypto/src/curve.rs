//! # Curve Table
//!
//! Sizes and multicodec identifiers for the two NIST curves supported by the
//! `ecdsa-sd-2023` suite.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Curve {
    /// NIST P-256 (secp256r1).
    #[default]
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384 (secp384r1).
    #[serde(rename = "P-384")]
    P384,
}

impl Curve {
    /// All supported curves.
    pub const ALL: [Curve; 2] = [Curve::P256, Curve::P384];

    /// Standard curve name (`P-256`, `P-384`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        }
    }

    /// Size of a field element or scalar in bytes.
    pub fn field_size(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }

    /// Fixed-width `r || s` signature length.
    pub fn signature_length(&self) -> usize {
        2 * self.field_size()
    }

    /// SEC1 compressed point length.
    pub fn compressed_point_length(&self) -> usize {
        1 + self.field_size()
    }

    /// SEC1 uncompressed point length.
    pub fn uncompressed_point_length(&self) -> usize {
        1 + 2 * self.field_size()
    }

    /// Multicodec code of a public key on this curve.
    pub fn public_multicodec(&self) -> u64 {
        match self {
            Self::P256 => 0x1200,
            Self::P384 => 0x1201,
        }
    }

    /// Multicodec code of a private key on this curve.
    pub fn private_multicodec(&self) -> u64 {
        match self {
            Self::P256 => 0x1306,
            Self::P384 => 0x1307,
        }
    }

    /// Curve for a public key multicodec.
    pub fn from_public_multicodec(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.public_multicodec() == code)
    }

    /// Curve for a private key multicodec.
    pub fn from_private_multicodec(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.private_multicodec() == code)
    }

    /// Curve implied by a SEC1 point length, compressed or not.
    pub fn from_point_length(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| {
            c.compressed_point_length() == len || c.uncompressed_point_length() == len
        })
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p-256" | "p256" | "secp256r1" => Ok(Self::P256),
            "p-384" | "p384" | "secp384r1" => Ok(Self::P384),
            _ => Err(format!("unsupported curve {s:?}, expected P-256 or P-384")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(Curve::P256.signature_length(), 64);
        assert_eq!(Curve::P384.signature_length(), 96);
        assert_eq!(Curve::P256.compressed_point_length(), 33);
        assert_eq!(Curve::P384.uncompressed_point_length(), 97);
    }

    #[test]
    fn multicodec_lookup() {
        assert_eq!(Curve::from_public_multicodec(0x1200), Some(Curve::P256));
        assert_eq!(Curve::from_public_multicodec(0x1201), Some(Curve::P384));
        assert_eq!(Curve::from_private_multicodec(0x1307), Some(Curve::P384));
        assert_eq!(Curve::from_public_multicodec(0xed), None);
    }

    #[test]
    fn point_length_lookup() {
        assert_eq!(Curve::from_point_length(33), Some(Curve::P256));
        assert_eq!(Curve::from_point_length(97), Some(Curve::P384));
        assert_eq!(Curve::from_point_length(32), None);
    }

    #[test]
    fn parse_names() {
        assert_eq!("p256".parse::<Curve>().unwrap(), Curve::P256);
        assert_eq!("P-384".parse::<Curve>().unwrap(), Curve::P384);
        assert!("ed25519".parse::<Curve>().is_err());
    }

    #[test]
    fn serde_uses_standard_names() {
        assert_eq!(serde_json::to_string(&Curve::P384).unwrap(), "\"P-384\"");
        let c: Curve = serde_json::from_str("\"P-256\"").unwrap();
        assert_eq!(c, Curve::P256);
    }
}
