//! # Statement Commitments
//!
//! The base signature has to stay checkable after the holder drops
//! statements. Instead of signing the N-Quads text directly, the issuer
//! commits to each statement separately:
//!
//! ```text
//! salt_i           = HMAC-SHA256(hmacKey, "statement" || u64_be(i))
//! digest_i         = SHA-256(salt_i || statement_i || "\n")
//! statementsDigest = SHA-256(digest_0 || ... || digest_{n-1})
//! mandatoryDigest  = SHA-256(u64_be(m_0) || ... || u64_be(m_{k-1}))
//! message          = SHA-256(proofConfigHash || statementsDigest || mandatoryDigest)
//! ```
//!
//! Statements are the HMAC-relabelled canonical N-Quads of the credential in
//! sorted order. A verifier holding the disclosed statements with their
//! salts plus the digests of the withheld ones rebuilds `statementsDigest`
//! without learning anything about what was withheld. `m_0 < ... < m_{k-1}`
//! are the indexes of the statements selected by the mandatory pointers, so
//! a derived proof that drops or reclassifies one of them no longer matches
//! the signature.
//!
//! ## Security Invariant
//!
//! Salts are keyed by the HMAC key, which only issuer and holder know, so a
//! withheld digest cannot be brute-forced against guessed statements.

use vcdi_core::{sha256, sha256_concat, CanonicalNQuads};
use vcdi_crypto::{randomize_blank_node_labels, relabel_blank_nodes, HmacKey};

/// Domain separation prefix of statement salts.
pub const SALT_DOMAIN: &[u8] = b"statement";

/// HMAC-relabel canonical N-Quads and return the statements in sorted order,
/// without trailing newlines.
pub fn randomize_statements(nquads: &CanonicalNQuads, key: &HmacKey) -> Vec<String> {
    let map = randomize_blank_node_labels(key, &nquads.blank_node_labels());
    let relabeled = relabel_blank_nodes(nquads.as_str(), &map);
    CanonicalNQuads::from_statements(relabeled.lines())
        .statements()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Salt of the statement at `index`.
pub fn statement_salt(key: &HmacKey, index: usize) -> [u8; 32] {
    let mut input = Vec::with_capacity(SALT_DOMAIN.len() + 8);
    input.extend_from_slice(SALT_DOMAIN);
    input.extend_from_slice(&(index as u64).to_be_bytes());
    key.compute(&input)
}

/// Salted digest of one statement.
pub fn statement_digest(salt: &[u8; 32], statement: &str) -> [u8; 32] {
    sha256_concat([&salt[..], statement.as_bytes(), &b"\n"[..]])
}

/// Salted digests of every statement.
pub fn salted_digests<S: AsRef<str>>(key: &HmacKey, statements: &[S]) -> Vec<[u8; 32]> {
    statements
        .iter()
        .enumerate()
        .map(|(i, s)| statement_digest(&statement_salt(key, i), s.as_ref()))
        .collect()
}

/// Digest over all statement digests, in statement order.
pub fn statements_digest(digests: &[[u8; 32]]) -> [u8; 32] {
    sha256_concat(digests)
}

/// Digest over the mandatory statement indexes, sorted ascending.
pub fn mandatory_digest(indexes: &[usize]) -> [u8; 32] {
    let mut sorted = indexes.to_vec();
    sorted.sort_unstable();
    let bytes: Vec<u8> = sorted.iter().flat_map(|&i| (i as u64).to_be_bytes()).collect();
    sha256(&bytes)
}

/// The 32 bytes the base signature is computed over.
pub fn signed_message(
    proof_config_hash: &[u8; 32],
    statements_digest: &[u8; 32],
    mandatory_digest: &[u8; 32],
) -> [u8; 32] {
    sha256_concat([proof_config_hash, statements_digest, mandatory_digest])
}

/// Binds disclosed statements to the proof configuration.
pub fn presentation_header<S: AsRef<str>>(disclosed: &[S], proof_config: &CanonicalNQuads) -> [u8; 32] {
    let mut text = String::new();
    for statement in disclosed {
        text.push_str(statement.as_ref());
        text.push('\n');
    }
    text.push_str(proof_config.as_str());
    sha256(text.as_bytes())
}
