//! # Multikey Codec
//!
//! Encodes ECDSA keys as Multikey strings: `z` + base58btc of an unsigned
//! varint multicodec prefix followed by the key bytes.
//!
//! | key              | multicodec | body                          |
//! |------------------|------------|-------------------------------|
//! | P-256 public     | `0x1200`   | SEC1 point                    |
//! | P-384 public     | `0x1201`   | SEC1 point                    |
//! | P-256 private    | `0x1306`   | scalar `D` (32 bytes)         |
//! | P-384 private    | `0x1307`   | scalar `D` (48 bytes)         |
//!
//! Public keys are emitted uncompressed and accepted in either SEC1 form.
//! A private key never carries its public point; it is rederived.

use multibase::Base;

use crate::curve::Curve;
use crate::ecdsa::{EcdsaPrivateKey, EcdsaPublicKey};
use crate::error::CryptoError;

/// Unsigned LEB128 encoding.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Decode an unsigned LEB128 prefix. Returns the value and bytes consumed.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize), CryptoError> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        if i >= 9 {
            return Err(CryptoError::Varint("longer than 9 bytes".into()));
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && *byte == 0 {
                return Err(CryptoError::Varint("not minimally encoded".into()));
            }
            return Ok((value, i + 1));
        }
    }
    Err(CryptoError::Varint("truncated".into()))
}

fn decode_base58(multikey: &str) -> Result<Vec<u8>, CryptoError> {
    let (base, bytes) =
        multibase::decode(multikey).map_err(|e| CryptoError::Multibase(e.to_string()))?;
    if base != Base::Base58Btc {
        return Err(CryptoError::Multibase(format!(
            "expected base58btc ('z'), got {base:?}"
        )));
    }
    Ok(bytes)
}

fn encode_base58(code: u64, body: &[u8]) -> String {
    let mut bytes = encode_varint(code);
    bytes.extend_from_slice(body);
    multibase::encode(Base::Base58Btc, bytes)
}

/// Encode a public key as a Multikey string.
pub fn public_key_to_multikey(key: &EcdsaPublicKey) -> String {
    encode_base58(key.curve().public_multicodec(), &key.to_uncompressed_bytes())
}

/// Decode a public Multikey string, checking codec, length and curve
/// membership.
pub fn multikey_to_public_key(multikey: &str) -> Result<EcdsaPublicKey, CryptoError> {
    let bytes = decode_base58(multikey)?;
    let (code, used) = decode_varint(&bytes)?;
    let curve =
        Curve::from_public_multicodec(code).ok_or(CryptoError::UnsupportedMulticodec(code))?;
    EcdsaPublicKey::from_sec1_bytes(curve, &bytes[used..])
}

/// Encode a private key as a Multikey string.
pub fn private_key_to_multikey(key: &EcdsaPrivateKey) -> String {
    encode_base58(key.curve().private_multicodec(), &key.to_scalar_bytes())
}

/// Decode a private Multikey string.
pub fn multikey_to_private_key(multikey: &str) -> Result<EcdsaPrivateKey, CryptoError> {
    let bytes = zeroize::Zeroizing::new(decode_base58(multikey)?);
    let (code, used) = decode_varint(&bytes)?;
    let curve =
        Curve::from_private_multicodec(code).ok_or(CryptoError::UnsupportedMulticodec(code))?;
    EcdsaPrivateKey::from_scalar_bytes(curve, &bytes[used..])
}
