//! # Derived Proof Creation
//!
//! The holder turns a base-signed credential into a smaller one that still
//! verifies against the issuer's signature:
//!
//! 1. Disclosed pointers are the base proof's mandatory pointers plus the
//!    holder's selective pointers, together with the `@context` and the
//!    `id`/`type` of every object on the way to a disclosed value.
//! 2. The credential is skolemized so blank nodes keep their identity across
//!    the selection, then canonicalized and relabelled with the base proof's
//!    HMAC key ([`Commitment`]). This reproduces the issuer's statement list
//!    exactly.
//! 3. The selected document is canonicalized on its own. Each of its
//!    canonical labels is mapped to the HMAC label of the same node in the
//!    full credential, and the relabelled statements are looked up in the
//!    full list to find their indexes. Mandatory indexes are the ones the
//!    mandatory selection produces. The issuer signed the same indexes, so
//!    the holder cannot shrink the mandatory set.
//! 4. Salts for disclosed statements and digests for withheld ones let the
//!    verifier rebuild the signed commitment. The base signature is reused.
//!
//! Blank nodes the converter names itself (list cells, graph containers,
//! `_:` identifiers written in the credential) have no stable identity
//! between full and selected document and cannot be disclosed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vcdi_core::CanonicalNQuads;
use vcdi_crypto::{relabel_blank_nodes, CanonicalIdMap, HmacKey};
use vcdi_vc::{DataIntegrityProof, VerifiableCredential};

use crate::cbor::{
    parse_base_proof, proof_kind, serialize_derived_proof, DerivedProofComponents,
    DisclosureData, ProofKind,
};
use crate::error::SuiteError;
use crate::selection::{merge_pointers, select_fields, structural_pointers, validate_json_pointer};
use crate::skolem::{deskolemize, is_skolem_label, skolemize, Skolemized};
use crate::statements::{presentation_header, randomize_statements, statement_digest, statement_salt};
use crate::suite::{Suite, CRYPTOSUITE};

/// Holder options for a derived proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedProofOptions {
    /// Pointers the holder chooses to reveal on top of the mandatory ones.
    #[serde(default)]
    pub selective_pointers: Vec<String>,
}

impl DerivedProofOptions {
    /// Options revealing `pointers`.
    pub fn new<S: Into<String>>(pointers: impl IntoIterator<Item = S>) -> Self {
        Self {
            selective_pointers: pointers.into_iter().map(Into::into).collect(),
        }
    }
}

/// A selection of the skolemized credential, canonicalized and relabelled
/// with the full credential's HMAC labels.
struct Projection {
    document: Value,
    statements: Vec<String>,
    label_map: BTreeMap<u64, [u8; 32]>,
}

/// A credential as the issuer commits to it: skolemized, canonicalized and
/// relabelled with the HMAC key. Selections are resolved to positions in
/// its statement list.
pub(crate) struct Commitment<'a> {
    suite: &'a Suite,
    key: &'a HmacKey,
    skolemized: Skolemized,
    statements: Vec<String>,
}

impl<'a> Commitment<'a> {
    pub(crate) fn new(suite: &'a Suite, unsecured: &Value, key: &'a HmacKey) -> Result<Self, SuiteError> {
        let skolemized = skolemize(unsecured, suite.canonicalizer())?;
        let statements = randomize_statements(&skolemized.nquads, key);
        Ok(Self { suite, key, skolemized, statements })
    }

    /// The relabelled statements in signing order.
    pub(crate) fn statements(&self) -> &[String] {
        &self.statements
    }

    fn positions(&self) -> HashMap<&str, usize> {
        self.statements
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect()
    }

    /// Sorted statement indexes selected by `pointers`. No pointers select
    /// nothing.
    pub(crate) fn indexes(&self, pointers: &[String]) -> Result<Vec<usize>, SuiteError> {
        if pointers.is_empty() {
            return Ok(Vec::new());
        }
        let projection = self.project(pointers)?;
        indexes_of(&self.positions(), &projection.statements)
    }

    fn project(&self, pointers: &[String]) -> Result<Projection, SuiteError> {
        let skolemized = &self.skolemized.document;
        let mut all = pointers.to_vec();
        all.extend(structural_pointers(skolemized, pointers)?);
        let document = select_fields(skolemized, &all)?;

        let (nquads, local_labels) = self
            .suite
            .canonicalizer()
            .canonicalize_skolemized(&document, &self.skolemized.scheme)?;
        let mut relabel = CanonicalIdMap::new();
        let mut label_map = BTreeMap::new();
        for (input, local) in &local_labels {
            let full = self
                .skolemized
                .labels
                .get(input)
                .filter(|_| is_skolem_label(input))
                .ok_or_else(|| {
                    SuiteError::InvalidProof(format!(
                        "disclosed blank node {input} has no stable identity in the credential"
                    ))
                })?;
            let index = canonical_index(local)?;
            let hmac = self.key.compute(format!("_:{full}").as_bytes());
            relabel.insert(format!("_:{local}"), format!("_:u{}", hex::encode(hmac)));
            label_map.insert(index, hmac);
        }

        let relabeled = relabel_blank_nodes(nquads.as_str(), &relabel);
        let statements = CanonicalNQuads::from_statements(relabeled.lines())
            .statements()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Projection { document, statements, label_map })
    }
}

/// `c14n<N>` → `N`.
pub(crate) fn canonical_index(label: &str) -> Result<u64, SuiteError> {
    label
        .trim_start_matches("_:")
        .strip_prefix("c14n")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| SuiteError::InvalidProof(format!("{label} is not a canonical blank node label")))
}

fn indexes_of(positions: &HashMap<&str, usize>, statements: &[String]) -> Result<Vec<usize>, SuiteError> {
    let mut out = statements
        .iter()
        .map(|s| {
            positions.get(s.as_str()).copied().ok_or_else(|| {
                SuiteError::InvalidProof("disclosed statement is not part of the signed credential".into())
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_unstable();
    Ok(out)
}

impl Suite {
    /// Derive a proof revealing the mandatory pointers of `base_proof` and
    /// `options.selective_pointers`. Returns the disclosed credential
    /// (without proof) and the derived proof.
    pub fn create_derived_proof(
        &self,
        credential: &VerifiableCredential,
        base_proof: &DataIntegrityProof,
        options: &DerivedProofOptions,
    ) -> Result<(VerifiableCredential, DataIntegrityProof), SuiteError> {
        base_proof.validate(CRYPTOSUITE)?;
        let base = parse_base_proof(&base_proof.proof_value)?;
        for pointer in &options.selective_pointers {
            validate_json_pointer(pointer)?;
        }
        let mut disclosed_pointers = merge_pointers(&base.mandatory_pointers, &options.selective_pointers);
        disclosed_pointers.sort();
        if disclosed_pointers.is_empty() {
            return Err(SuiteError::EmptySelection);
        }

        let unsecured = credential.without_proof().into_value();
        let commitment = Commitment::new(self, &unsecured, &base.hmac_key)?;
        let statements = commitment.statements();

        let disclosed = commitment.project(&disclosed_pointers)?;
        let disclosed_indexes = indexes_of(&commitment.positions(), &disclosed.statements)?;

        let mandatory: BTreeSet<usize> =
            commitment.indexes(&base.mandatory_pointers)?.into_iter().collect();
        let disclosed_set: BTreeSet<usize> = disclosed_indexes.iter().copied().collect();
        if !mandatory.is_subset(&disclosed_set) {
            return Err(SuiteError::InvalidProof("mandatory statements are not all disclosed".into()));
        }
        let (mandatory_indexes, selective_indexes): (Vec<usize>, Vec<usize>) =
            disclosed_indexes.iter().copied().partition(|i| mandatory.contains(i));

        let disclosed_statements: Vec<&str> =
            disclosed_indexes.iter().map(|&i| statements[i].as_str()).collect();
        let disclosure = DisclosureData {
            label_map: disclosed.label_map,
            disclosed_salts: disclosed_indexes
                .iter()
                .map(|&i| statement_salt(&base.hmac_key, i))
                .collect(),
            withheld_digests: (0..statements.len())
                .filter(|i| !disclosed_set.contains(i))
                .map(|i| statement_digest(&statement_salt(&base.hmac_key, i), &statements[i]))
                .collect(),
        };

        let config = base_proof.configuration();
        let config_nquads = self.canonical_proof_config(&config, unsecured.get("@context"))?;
        let components = DerivedProofComponents {
            signature: base.signature,
            compressed_label_map: disclosure.to_bytes()?,
            mandatory_indexes,
            selective_indexes,
            presentation_header: presentation_header(&disclosed_statements, &config_nquads),
        };
        let proof = config.with_proof_value(serialize_derived_proof(&components)?);

        tracing::debug!(
            disclosed = disclosed_indexes.len(),
            withheld = statements.len() - disclosed_indexes.len(),
            mandatory = components.mandatory_indexes.len(),
            "created derived proof"
        );

        let mut document = disclosed.document;
        deskolemize(&mut document, &commitment.skolemized.scheme);
        Ok((VerifiableCredential::from_value(document)?, proof))
    }

    /// Derive from the first `ecdsa-sd-2023` base proof on `credential` and
    /// return the disclosed credential carrying the derived proof.
    pub fn add_derived_proof(
        &self,
        credential: &VerifiableCredential,
        options: &DerivedProofOptions,
    ) -> Result<VerifiableCredential, SuiteError> {
        let base_proof = credential
            .proofs()?
            .into_iter()
            .find(|p| {
                p.cryptosuite == CRYPTOSUITE
                    && matches!(proof_kind(&p.proof_value), Ok(ProofKind::Base))
            })
            .ok_or_else(|| SuiteError::InvalidProof(format!("credential has no {CRYPTOSUITE} base proof")))?;
        let (disclosed, proof) = self.create_derived_proof(credential, &base_proof, options)?;
        Ok(disclosed.with_proof(proof)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::parse_derived_proof;
    use crate::suite::ProofOptions;
    use serde_json::json;
    use vcdi_core::{Canonicalizer, CREDENTIALS_V2_URL};

    fn suite() -> Suite {
        Suite::new(Canonicalizer::with_builtin().unwrap())
    }

    fn signed(mandatory: &[&str]) -> (Suite, VerifiableCredential) {
        let s = suite();
        let (sk, _) = s.generate_key_pair();
        let vc = VerifiableCredential::from_value(json!({
            "@context": [CREDENTIALS_V2_URL],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": {
                "id": "did:example:alice",
                "name": "Alice",
                "age": 30
            }
        }))
        .unwrap();
        let options = ProofOptions::new("did:example:issuer#key-1")
            .with_mandatory_pointers(mandatory.iter().copied());
        let signed = s.add_base_proof(&vc, &sk, &options).unwrap();
        (s, signed)
    }

    #[test]
    fn disclosed_credential_contains_selection_and_mandatory_fields() {
        let (s, vc) = signed(&["/issuer"]);
        let out = s
            .add_derived_proof(&vc, &DerivedProofOptions::new(["/credentialSubject/name"]))
            .unwrap();
        assert_eq!(out.get("issuer").unwrap(), "did:example:issuer");
        let subject = out.credential_subject().unwrap();
        assert_eq!(subject["name"], "Alice");
        assert_eq!(subject["id"], "did:example:alice");
        assert!(subject.get("age").is_none());
        assert!(out.context().is_some());
        assert_eq!(out.types(), vec!["VerifiableCredential"]);
        assert!(out.get("@id").is_none());
    }

    #[test]
    fn indexes_are_partitioned_structurally() {
        let (s, vc) = signed(&["/issuer"]);
        let base = vc.proofs().unwrap().remove(0);
        let (_, proof) = s
            .create_derived_proof(&vc, &base, &DerivedProofOptions::new(["/credentialSubject/name"]))
            .unwrap();
        let d = parse_derived_proof(&proof.proof_value).unwrap();
        assert!(!d.mandatory_indexes.is_empty());
        assert!(!d.selective_indexes.is_empty());
        assert!(d.mandatory_indexes.iter().all(|i| !d.selective_indexes.contains(i)));

        let data = DisclosureData::from_bytes(&d.compressed_label_map).unwrap();
        let disclosed = d.mandatory_indexes.len() + d.selective_indexes.len();
        assert_eq!(data.disclosed_salts.len(), disclosed);
        // five statements in total, only the age is withheld
        assert_eq!(data.withheld_digests.len(), 1);
        assert_eq!(proof.verification_method, base.verification_method);
        assert_eq!(proof.created, base.created);
    }

    #[test]
    fn needs_a_base_proof_and_a_selection() {
        let (s, vc) = signed(&[]);
        assert!(matches!(
            s.add_derived_proof(&vc, &DerivedProofOptions::default()),
            Err(SuiteError::EmptySelection)
        ));
        assert!(s
            .add_derived_proof(&vc.without_proof(), &DerivedProofOptions::new(["/issuer"]))
            .is_err());
        assert!(matches!(
            s.add_derived_proof(&vc, &DerivedProofOptions::new(["credentialSubject"])),
            Err(SuiteError::InvalidPointer { .. })
        ));
    }

    #[test]
    fn canonical_index_parsing() {
        assert_eq!(canonical_index("c14n12").unwrap(), 12);
        assert_eq!(canonical_index("_:c14n0").unwrap(), 0);
        assert!(canonical_index("b0").is_err());
    }
}
