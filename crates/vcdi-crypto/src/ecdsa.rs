//! # ECDSA Keys and Signatures (P-256, P-384)
//!
//! Curve-tagged key and signature types over the RustCrypto `p256`/`p384`
//! implementations.
//!
//! ## Security Invariant
//!
//! - Messages are hashed with SHA-256 and signed as a prehash on both
//!   curves. Nonces are deterministic (RFC 6979).
//! - Signatures travel as fixed-width `r || s`. DER is available for
//!   interoperability only.
//! - A key and a signature for different curves never meet: mixing them is
//!   a [`CryptoError::CurveMismatch`], not a failed verification.
//! - Private scalars zeroize on drop and are never printed by `Debug`.

use std::fmt;

use ::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use vcdi_core::digest::sha256;
use zeroize::Zeroizing;

use crate::curve::Curve;
use crate::error::CryptoError;

fn invalid_key(curve: Curve, reason: impl Into<String>) -> CryptoError {
    CryptoError::InvalidKey {
        curve,
        reason: reason.into(),
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

/// An ECDSA public key on one of the supported curves.
#[derive(Clone, PartialEq, Eq)]
pub enum EcdsaPublicKey {
    /// P-256 key.
    P256(p256::PublicKey),
    /// P-384 key.
    P384(p384::PublicKey),
}

impl EcdsaPublicKey {
    /// The key's curve.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
        }
    }

    /// Parse a SEC1 point (compressed or uncompressed) for `curve`.
    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != curve.compressed_point_length()
            && bytes.len() != curve.uncompressed_point_length()
        {
            return Err(invalid_key(
                curve,
                format!(
                    "expected {} or {} bytes, got {}",
                    curve.compressed_point_length(),
                    curve.uncompressed_point_length(),
                    bytes.len()
                ),
            ));
        }
        match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(bytes)
                .map(Self::P256)
                .map_err(|_| invalid_key(curve, "point is not on the curve")),
            Curve::P384 => p384::PublicKey::from_sec1_bytes(bytes)
                .map(Self::P384)
                .map_err(|_| invalid_key(curve, "point is not on the curve")),
        }
    }

    /// Parse a SEC1 point, inferring the curve from its length.
    pub fn from_sec1(bytes: &[u8]) -> Result<Self, CryptoError> {
        let curve = Curve::from_point_length(bytes.len()).ok_or_else(|| {
            CryptoError::InvalidKey {
                curve: Curve::default(),
                reason: format!("no supported curve has {}-byte points", bytes.len()),
            }
        })?;
        Self::from_sec1_bytes(curve, bytes)
    }

    /// SEC1 compressed encoding (`0x02`/`0x03 || X`).
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        match self {
            Self::P256(k) => k.to_encoded_point(true).as_bytes().to_vec(),
            Self::P384(k) => k.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// SEC1 uncompressed encoding (`0x04 || X || Y`).
    pub fn to_uncompressed_bytes(&self) -> Vec<u8> {
        match self {
            Self::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            Self::P384(k) => k.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Verify `signature` over an already hashed message.
    ///
    /// `Ok(false)` when the signature does not match or its scalars are out
    /// of range. Errors only on curve mismatch.
    pub fn verify_prehash(
        &self,
        prehash: &[u8],
        signature: &EcdsaSignature,
    ) -> Result<bool, CryptoError> {
        if signature.curve() != self.curve() {
            return Err(CryptoError::CurveMismatch {
                expected: self.curve(),
                actual: signature.curve(),
            });
        }
        let valid = match self {
            Self::P256(k) => match p256::ecdsa::Signature::from_slice(signature.as_bytes()) {
                Ok(sig) => p256::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(prehash, &sig)
                    .is_ok(),
                Err(_) => false,
            },
            Self::P384(k) => match p384::ecdsa::Signature::from_slice(signature.as_bytes()) {
                Ok(sig) => p384::ecdsa::VerifyingKey::from(k)
                    .verify_prehash(prehash, &sig)
                    .is_ok(),
                Err(_) => false,
            },
        };
        Ok(valid)
    }

    /// Verify `signature` over SHA-256(`message`).
    pub fn verify(&self, message: &[u8], signature: &EcdsaSignature) -> Result<bool, CryptoError> {
        self.verify_prehash(&sha256(message), signature)
    }
}

impl fmt::Debug for EcdsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EcdsaPublicKey({}, {}...)",
            self.curve(),
            hex_prefix(&self.to_compressed_bytes())
        )
    }
}

// ---------------------------------------------------------------------------
// Private keys
// ---------------------------------------------------------------------------

/// An ECDSA private key. Zeroized on drop.
#[derive(Clone)]
pub enum EcdsaPrivateKey {
    /// P-256 key.
    P256(p256::SecretKey),
    /// P-384 key.
    P384(p384::SecretKey),
}

impl EcdsaPrivateKey {
    /// Generate a key from the OS CSPRNG.
    pub fn generate(curve: Curve) -> Self {
        let mut rng = rand::rngs::OsRng;
        match curve {
            Curve::P256 => Self::P256(p256::SecretKey::random(&mut rng)),
            Curve::P384 => Self::P384(p384::SecretKey::random(&mut rng)),
        }
    }

    /// From the big-endian scalar `D`.
    pub fn from_scalar_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != curve.field_size() {
            return Err(invalid_key(
                curve,
                format!("expected {}-byte scalar, got {}", curve.field_size(), bytes.len()),
            ));
        }
        match curve {
            Curve::P256 => p256::SecretKey::from_slice(bytes)
                .map(Self::P256)
                .map_err(|_| invalid_key(curve, "scalar out of range")),
            Curve::P384 => p384::SecretKey::from_slice(bytes)
                .map(Self::P384)
                .map_err(|_| invalid_key(curve, "scalar out of range")),
        }
    }

    /// The big-endian scalar `D`.
    pub fn to_scalar_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::P256(k) => Zeroizing::new(k.to_bytes().to_vec()),
            Self::P384(k) => Zeroizing::new(k.to_bytes().to_vec()),
        }
    }

    /// The key's curve.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
        }
    }

    /// The matching public key.
    pub fn public_key(&self) -> EcdsaPublicKey {
        match self {
            Self::P256(k) => EcdsaPublicKey::P256(k.public_key()),
            Self::P384(k) => EcdsaPublicKey::P384(k.public_key()),
        }
    }

    /// Sign an already hashed message.
    pub fn sign_prehash(&self, prehash: &[u8]) -> Result<EcdsaSignature, CryptoError> {
        let signing = |e: ::ecdsa::Error| CryptoError::Signing(e.to_string());
        let bytes = match self {
            Self::P256(k) => {
                let sig: p256::ecdsa::Signature =
                    p256::ecdsa::SigningKey::from(k).sign_prehash(prehash).map_err(signing)?;
                sig.to_bytes().to_vec()
            }
            Self::P384(k) => {
                let sig: p384::ecdsa::Signature =
                    p384::ecdsa::SigningKey::from(k).sign_prehash(prehash).map_err(signing)?;
                sig.to_bytes().to_vec()
            }
        };
        Ok(EcdsaSignature {
            curve: self.curve(),
            bytes,
        })
    }

    /// Sign SHA-256(`message`).
    pub fn sign(&self, message: &[u8]) -> Result<EcdsaSignature, CryptoError> {
        self.sign_prehash(&sha256(message))
    }
}

impl fmt::Debug for EcdsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcdsaPrivateKey({}, <private>)", self.curve())
    }
}

/// Generate a fresh key pair on `curve`.
pub fn generate_key_pair(curve: Curve) -> (EcdsaPrivateKey, EcdsaPublicKey) {
    let private = EcdsaPrivateKey::generate(curve);
    let public = private.public_key();
    (private, public)
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// A fixed-width `r || s` ECDSA signature.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EcdsaSignature {
    curve: Curve,
    bytes: Vec<u8>,
}

impl EcdsaSignature {
    /// Wrap raw `r || s` bytes. The length must match the curve.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != curve.signature_length() {
            return Err(CryptoError::InvalidSignature(format!(
                "{curve} signatures are {} bytes, got {}",
                curve.signature_length(),
                bytes.len()
            )));
        }
        Ok(Self {
            curve,
            bytes: bytes.to_vec(),
        })
    }

    /// Parse an ASN.1 DER signature.
    pub fn from_der(curve: Curve, der: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |e: ::ecdsa::Error| CryptoError::InvalidSignature(format!("bad DER: {e}"));
        let bytes = match curve {
            Curve::P256 => p256::ecdsa::Signature::from_der(der)
                .map_err(invalid)?
                .to_bytes()
                .to_vec(),
            Curve::P384 => p384::ecdsa::Signature::from_der(der)
                .map_err(invalid)?
                .to_bytes()
                .to_vec(),
        };
        Ok(Self { curve, bytes })
    }

    /// ASN.1 DER encoding. Fails if `r` or `s` is zero or out of range.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        let invalid = |e: ::ecdsa::Error| CryptoError::InvalidSignature(e.to_string());
        Ok(match self.curve {
            Curve::P256 => p256::ecdsa::Signature::from_slice(&self.bytes)
                .map_err(invalid)?
                .to_der()
                .as_bytes()
                .to_vec(),
            Curve::P384 => p384::ecdsa::Signature::from_slice(&self.bytes)
                .map_err(invalid)?
                .to_der()
                .as_bytes()
                .to_vec(),
        })
    }

    /// The signature's curve.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Raw `r || s`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into raw `r || s`.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for EcdsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcdsaSignature({}, {}...)", self.curve, hex_prefix(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_both_curves() {
        for curve in Curve::ALL {
            let (sk, pk) = generate_key_pair(curve);
            let sig = sk.sign(b"statement").unwrap();
            assert_eq!(sig.as_bytes().len(), curve.signature_length());
            assert!(pk.verify(b"statement", &sig).unwrap());
            assert!(!pk.verify(b"statement!", &sig).unwrap());
        }
    }

    #[test]
    fn signatures_are_deterministic() {
        let sk = EcdsaPrivateKey::generate(Curve::P256);
        assert_eq!(sk.sign(b"m").unwrap(), sk.sign(b"m").unwrap());
    }

    #[test]
    fn bit_flip_fails_verification() {
        let (sk, pk) = generate_key_pair(Curve::P384);
        let sig = sk.sign(b"payload").unwrap();
        let mut bytes = sig.as_bytes().to_vec();
        bytes[10] ^= 0x01;
        let flipped = EcdsaSignature::from_bytes(Curve::P384, &bytes).unwrap();
        assert!(!pk.verify(b"payload", &flipped).unwrap());
    }

    #[test]
    fn zero_signature_is_false_not_error() {
        let (_, pk) = generate_key_pair(Curve::P256);
        let zero = EcdsaSignature::from_bytes(Curve::P256, &[0u8; 64]).unwrap();
        assert!(!pk.verify(b"x", &zero).unwrap());
    }

    #[test]
    fn wrong_length_is_error() {
        assert!(matches!(
            EcdsaSignature::from_bytes(Curve::P256, &[1u8; 63]),
            Err(CryptoError::InvalidSignature(_))
        ));
    }

    #[test]
    fn curve_mismatch_is_error() {
        let (_, pk256) = generate_key_pair(Curve::P256);
        let (sk384, _) = generate_key_pair(Curve::P384);
        let sig = sk384.sign(b"x").unwrap();
        assert!(matches!(
            pk256.verify(b"x", &sig),
            Err(CryptoError::CurveMismatch { .. })
        ));
    }

    #[test]
    fn sec1_encodings_parse_to_same_key() {
        for curve in Curve::ALL {
            let (_, pk) = generate_key_pair(curve);
            let compressed = pk.to_compressed_bytes();
            let uncompressed = pk.to_uncompressed_bytes();
            assert_eq!(compressed.len(), curve.compressed_point_length());
            assert_eq!(uncompressed[0], 0x04);
            assert_eq!(EcdsaPublicKey::from_sec1_bytes(curve, &compressed).unwrap(), pk);
            assert_eq!(EcdsaPublicKey::from_sec1(&uncompressed).unwrap(), pk);
        }
    }

    #[test]
    fn off_curve_point_rejected() {
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[0xffu8; 64]);
        assert!(EcdsaPublicKey::from_sec1_bytes(Curve::P256, &bytes).is_err());
    }

    #[test]
    fn scalar_roundtrip_and_range() {
        let sk = EcdsaPrivateKey::generate(Curve::P384);
        let scalar = sk.to_scalar_bytes();
        let back = EcdsaPrivateKey::from_scalar_bytes(Curve::P384, &scalar).unwrap();
        assert_eq!(back.public_key(), sk.public_key());
        assert!(EcdsaPrivateKey::from_scalar_bytes(Curve::P256, &[0u8; 32]).is_err());
        assert!(EcdsaPrivateKey::from_scalar_bytes(Curve::P256, &[1u8; 31]).is_err());
    }

    #[test]
    fn der_roundtrip() {
        let sk = EcdsaPrivateKey::generate(Curve::P256);
        let sig = sk.sign(b"der").unwrap();
        let der = sig.to_der().unwrap();
        assert_eq!(der[0], 0x30);
        assert_eq!(EcdsaSignature::from_der(Curve::P256, &der).unwrap(), sig);
        assert!(EcdsaSignature::from_der(Curve::P256, &[0x30, 0x00]).is_err());
    }

    #[test]
    fn debug_hides_private_scalar() {
        let sk = EcdsaPrivateKey::generate(Curve::P256);
        let hex = hex::encode(sk.to_scalar_bytes().as_slice());
        let debug = format!("{sk:?}");
        assert!(debug.contains("<private>"));
        assert!(!debug.contains(&hex));
    }
}
