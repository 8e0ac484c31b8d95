//! # Proof Value Codec
//!
//! `proofValue` strings are multibase base64url (`u`, no padding) over a
//! three byte header followed by one CBOR array:
//!
//! | proof   | header           | CBOR array                                                                    |
//! |---------|------------------|-------------------------------------------------------------------------------|
//! | base    | `d9 5d 00`       | `[signature, hmacKey, publicKey, mandatoryPointers]`                          |
//! | derived | `d9 5d 01`       | `[signature, compressedLabelMap, mandatoryIndexes, selectiveIndexes, presentationHeader]` |
//!
//! ## Security Invariant
//!
//! The header is checked before any CBOR is parsed, and every element is
//! type-checked. Encoding is deterministic: definite lengths, minimal
//! integer heads, map keys in ascending order. Decoding accepts `null` in
//! list positions as the empty list and rejects trailing bytes.

use std::collections::BTreeMap;

use ciborium::value::{Integer, Value};
use multibase::Base;
use serde::Serialize;
use vcdi_crypto::HmacKey;

use crate::error::SuiteError;

/// Header of a base proof value.
pub const BASE_PROOF_HEADER: [u8; 3] = [0xd9, 0x5d, 0x00];

/// Header of a derived proof value.
pub const DERIVED_PROOF_HEADER: [u8; 3] = [0xd9, 0x5d, 0x01];

/// Decoded base proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseProofComponents {
    /// Fixed-width `r || s` signature.
    pub signature: Vec<u8>,
    /// Key used to randomize blank node labels and derive statement salts.
    pub hmac_key: HmacKey,
    /// Compressed SEC1 public key of the issuer.
    pub public_key: Vec<u8>,
    /// Pointers the holder must always disclose.
    pub mandatory_pointers: Vec<String>,
}

/// Decoded derived proof.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivedProofComponents {
    /// The base signature, reused unchanged.
    pub signature: Vec<u8>,
    /// CBOR encoded [`DisclosureData`].
    pub compressed_label_map: Vec<u8>,
    /// Statement indexes disclosed because they are mandatory.
    pub mandatory_indexes: Vec<usize>,
    /// Statement indexes disclosed by the holder's choice.
    pub selective_indexes: Vec<usize>,
    /// SHA-256 binding the disclosed statements to the proof configuration.
    pub presentation_header: [u8; 32],
}

/// What a verifier needs besides the disclosed statements.
///
/// `label_map` maps the index `N` of each canonical label `c14nN` in the
/// disclosed document to the HMAC output that names the node in the full
/// credential. Salts are present only for disclosed statements and digests
/// only for withheld ones, each in ascending statement order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisclosureData {
    /// Disclosed canonical label index to HMAC output.
    pub label_map: BTreeMap<u64, [u8; 32]>,
    /// Salts of the disclosed statements.
    pub disclosed_salts: Vec<[u8; 32]>,
    /// Salted digests of the withheld statements.
    pub withheld_digests: Vec<[u8; 32]>,
}

impl DisclosureData {
    /// Canonical CBOR `[labelMap, disclosedSalts, withheldDigests]`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SuiteError> {
        let map = self
            .label_map
            .iter()
            .map(|(k, v)| (Value::Integer(Integer::from(*k)), Value::Bytes(v.to_vec())))
            .collect();
        let value = Value::Array(vec![
            Value::Map(map),
            byte_list(&self.disclosed_salts),
            byte_list(&self.withheld_digests),
        ]);
        to_cbor(&value)
    }

    /// Decode; empty input is the empty disclosure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SuiteError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let [labels, salts, digests] = fixed_array::<3>(from_cbor(bytes)?, "label map")?;

        let mut label_map = BTreeMap::new();
        match labels {
            Value::Null => {}
            Value::Map(entries) => {
                for (k, v) in entries {
                    let index = match k {
                        Value::Integer(i) => u64::try_from(i)
                            .map_err(|_| SuiteError::proof_value("label map key is negative"))?,
                        other => {
                            return Err(SuiteError::proof_value(format!(
                                "label map key must be an integer, got {}",
                                kind(&other)
                            )))
                        }
                    };
                    let hmac = fixed32(take_bytes(v, "label map value")?, "label map value")?;
                    if label_map.insert(index, hmac).is_some() {
                        return Err(SuiteError::proof_value(format!("duplicate label map key {index}")));
                    }
                }
            }
            other => {
                return Err(SuiteError::proof_value(format!(
                    "label map must be a map, got {}",
                    kind(&other)
                )))
            }
        }

        Ok(Self {
            label_map,
            disclosed_salts: take_digest_list(salts, "disclosed salts")?,
            withheld_digests: take_digest_list(digests, "withheld digests")?,
        })
    }
}

/// Which kind of proof a value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// Issuer-created proof over the whole credential.
    Base,
    /// Holder-created proof over a disclosed subset.
    Derived,
}

// ---------------------------------------------------------------------------
// Public codec
// ---------------------------------------------------------------------------

/// Encode a base proof value.
pub fn serialize_base_proof(components: &BaseProofComponents) -> Result<String, SuiteError> {
    let value = Value::Array(vec![
        Value::Bytes(components.signature.clone()),
        Value::Bytes(components.hmac_key.as_bytes().to_vec()),
        Value::Bytes(components.public_key.clone()),
        Value::Array(
            components
                .mandatory_pointers
                .iter()
                .cloned()
                .map(Value::Text)
                .collect(),
        ),
    ]);
    encode(BASE_PROOF_HEADER, &value)
}

/// Decode a base proof value.
pub fn parse_base_proof(proof_value: &str) -> Result<BaseProofComponents, SuiteError> {
    let body = decode(proof_value, BASE_PROOF_HEADER, SuiteError::InvalidBaseProofHeader)?;
    let [signature, hmac_key, public_key, pointers] = fixed_array::<4>(from_cbor(body)?, "base proof")?;

    Ok(BaseProofComponents {
        signature: take_bytes(signature, "signature")?,
        hmac_key: HmacKey::new(&take_bytes(hmac_key, "HMAC key")?)?,
        public_key: take_bytes(public_key, "public key")?,
        mandatory_pointers: take_text_list(pointers, "mandatory pointers")?,
    })
}

/// Encode a derived proof value.
pub fn serialize_derived_proof(components: &DerivedProofComponents) -> Result<String, SuiteError> {
    let value = Value::Array(vec![
        Value::Bytes(components.signature.clone()),
        Value::Bytes(components.compressed_label_map.clone()),
        index_list(&components.mandatory_indexes),
        index_list(&components.selective_indexes),
        Value::Bytes(components.presentation_header.to_vec()),
    ]);
    encode(DERIVED_PROOF_HEADER, &value)
}

/// Decode a derived proof value.
pub fn parse_derived_proof(proof_value: &str) -> Result<DerivedProofComponents, SuiteError> {
    let body = decode(proof_value, DERIVED_PROOF_HEADER, SuiteError::InvalidDerivedProofHeader)?;
    let [signature, label_map, mandatory, selective, header] =
        fixed_array::<5>(from_cbor(body)?, "derived proof")?;

    Ok(DerivedProofComponents {
        signature: take_bytes(signature, "signature")?,
        compressed_label_map: take_bytes_or_empty(label_map, "compressed label map")?,
        mandatory_indexes: take_index_list(mandatory, "mandatory indexes")?,
        selective_indexes: take_index_list(selective, "selective indexes")?,
        presentation_header: fixed32(take_bytes(header, "presentation header")?, "presentation header")?,
    })
}

/// Classify a proof value by its header.
pub fn proof_kind(proof_value: &str) -> Result<ProofKind, SuiteError> {
    let bytes = decode_multibase(proof_value)?;
    match bytes.get(..3) {
        Some(h) if h == BASE_PROOF_HEADER => Ok(ProofKind::Base),
        Some(h) if h == DERIVED_PROOF_HEADER => Ok(ProofKind::Derived),
        _ => Err(SuiteError::proof_value("header is neither a base nor a derived proof header")),
    }
}

/// Whether a proof value carries the base proof header.
pub fn is_base_proof(proof_value: &str) -> Result<bool, SuiteError> {
    Ok(proof_kind(proof_value)? == ProofKind::Base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_multibase(proof_value: &str) -> Result<Vec<u8>, SuiteError> {
    let (base, bytes) =
        multibase::decode(proof_value).map_err(|e| SuiteError::proof_value(e.to_string()))?;
    if base != Base::Base64Url {
        return Err(SuiteError::proof_value(format!(
            "proof values must be multibase base64url ('u'), got {base:?}"
        )));
    }
    Ok(bytes)
}

fn encode(header: [u8; 3], value: &Value) -> Result<String, SuiteError> {
    let mut bytes = header.to_vec();
    bytes.extend(to_cbor(value)?);
    Ok(multibase::encode(Base::Base64Url, bytes))
}

fn decode(proof_value: &str, header: [u8; 3], wrong_header: SuiteError) -> Result<Vec<u8>, SuiteError> {
    let bytes = decode_multibase(proof_value)?;
    if !bytes.starts_with(&header) {
        return Err(wrong_header);
    }
    Ok(bytes[header.len()..].to_vec())
}

fn to_cbor(value: &Value) -> Result<Vec<u8>, SuiteError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|e| SuiteError::proof_value(format!("CBOR encoding failed: {e}")))?;
    Ok(out)
}

fn from_cbor(bytes: impl AsRef<[u8]>) -> Result<Value, SuiteError> {
    let mut rest = bytes.as_ref();
    let value: Value = ciborium::de::from_reader(&mut rest)
        .map_err(|e| SuiteError::proof_value(format!("CBOR decoding failed: {e}")))?;
    if !rest.is_empty() {
        return Err(SuiteError::proof_value(format!("{} trailing bytes after CBOR item", rest.len())));
    }
    Ok(value)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Float(_) => "float",
        Value::Text(_) => "text string",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tagged value",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown item",
    }
}

fn fixed_array<const N: usize>(value: Value, what: &str) -> Result<[Value; N], SuiteError> {
    match value {
        Value::Array(items) => {
            let len = items.len();
            items.try_into().map_err(|_| {
                SuiteError::proof_value(format!("{what} must have {N} elements, got {len}"))
            })
        }
        other => Err(SuiteError::proof_value(format!(
            "{what} must be an array, got {}",
            kind(&other)
        ))),
    }
}

fn take_bytes(value: Value, what: &str) -> Result<Vec<u8>, SuiteError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        other => Err(SuiteError::proof_value(format!(
            "{what} must be a byte string, got {}",
            kind(&other)
        ))),
    }
}

fn take_bytes_or_empty(value: Value, what: &str) -> Result<Vec<u8>, SuiteError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => take_bytes(other, what),
    }
}

fn fixed32(bytes: Vec<u8>, what: &str) -> Result<[u8; 32], SuiteError> {
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SuiteError::proof_value(format!("{what} must be 32 bytes, got {len}")))
}

fn take_list(value: Value, what: &str) -> Result<Vec<Value>, SuiteError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => Err(SuiteError::proof_value(format!(
            "{what} must be an array, got {}",
            kind(&other)
        ))),
    }
}

fn take_text_list(value: Value, what: &str) -> Result<Vec<String>, SuiteError> {
    take_list(value, what)?
        .into_iter()
        .map(|item| match item {
            Value::Text(s) => Ok(s),
            other => Err(SuiteError::proof_value(format!(
                "{what} entries must be text strings, got {}",
                kind(&other)
            ))),
        })
        .collect()
}

fn take_index_list(value: Value, what: &str) -> Result<Vec<usize>, SuiteError> {
    take_list(value, what)?
        .into_iter()
        .map(|item| match item {
            Value::Integer(i) => u64::try_from(i)
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| SuiteError::proof_value(format!("{what} entries must be unsigned"))),
            other => Err(SuiteError::proof_value(format!(
                "{what} entries must be integers, got {}",
                kind(&other)
            ))),
        })
        .collect()
}

fn take_digest_list(value: Value, what: &str) -> Result<Vec<[u8; 32]>, SuiteError> {
    take_list(value, what)?
        .into_iter()
        .map(|item| fixed32(take_bytes(item, what)?, what))
        .collect()
}

fn index_list(indexes: &[usize]) -> Value {
    Value::Array(
        indexes
            .iter()
            .map(|i| Value::Integer(Integer::from(*i as u64)))
            .collect(),
    )
}

fn byte_list(items: &[[u8; 32]]) -> Value {
    Value::Array(items.iter().map(|b| Value::Bytes(b.to_vec())).collect())
}
