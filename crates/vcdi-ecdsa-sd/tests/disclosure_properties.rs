//! Property tests for pointer handling and selective disclosure.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use vcdi_core::{Canonicalizer, CREDENTIALS_V2_URL};
use vcdi_ecdsa_sd::selection::parse_pointer;
use vcdi_ecdsa_sd::{
    apply_json_pointer, escape_token, merge_pointers, select_fields, unescape_token,
    DerivedProofOptions, ProofOptions, StaticKeyResolver, Suite,
};
use vcdi_vc::VerifiableCredential;

const VM: &str = "did:example:issuer#key-1";
const FIELDS: [&str; 4] = ["givenName", "familyName", "nationality", "employer"];

fn object_keys() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-z~/]{1,6}", any::<i64>(), 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unescape_inverts_escape(token in ".*") {
        prop_assert_eq!(unescape_token(&escape_token(&token)), token);
    }

    #[test]
    fn escaped_keys_parse_back(keys in prop::collection::vec("[a-z~/]{0,6}", 1..4)) {
        let pointer: String = keys.iter().map(|k| format!("/{}", escape_token(k))).collect();
        prop_assert_eq!(parse_pointer(&pointer).unwrap(), keys);
    }

    #[test]
    fn selecting_one_member_keeps_exactly_it(entries in object_keys(), pick in any::<prop::sample::Index>()) {
        let doc = Value::Object(entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect::<Map<_, _>>());
        let (key, value) = entries.iter().nth(pick.index(entries.len())).unwrap();
        let pointer = format!("/{}", escape_token(key));

        prop_assert_eq!(apply_json_pointer(&doc, &pointer).unwrap(), &json!(value));
        let expected = Value::Object(Map::from_iter([(key.clone(), json!(value))]));
        prop_assert_eq!(select_fields(&doc, &[pointer]).unwrap(), expected);
    }

    #[test]
    fn merged_pointers_are_mandatory_first_without_duplicates(
        mandatory in prop::collection::vec("/[a-c]{1,2}", 0..4),
        selective in prop::collection::vec("/[a-c]{1,2}", 0..4),
    ) {
        let merged = merge_pointers(&mandatory, &selective);
        let mut seen = std::collections::HashSet::new();
        prop_assert!(merged.iter().all(|p| seen.insert(p.clone())));
        prop_assert!(mandatory.iter().chain(&selective).all(|p| merged.contains(p)));
        let first_selective_only = merged.iter().position(|p| !mandatory.contains(p)).unwrap_or(merged.len());
        prop_assert!(merged[first_selective_only..].iter().all(|p| !mandatory.contains(p)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn any_disclosed_subset_verifies(
        values in prop::collection::vec("[A-Za-z ]{1,12}", FIELDS.len()),
        mask in 1u8..16,
    ) {
        let suite = Suite::new(Canonicalizer::with_builtin().unwrap());
        let (key, public) = suite.generate_key_pair();
        let subject: Map<String, Value> = FIELDS
            .iter()
            .zip(&values)
            .map(|(field, value)| (field.to_string(), json!(value)))
            .collect();
        let credential = VerifiableCredential::from_value(json!({
            "@context": [CREDENTIALS_V2_URL],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": subject
        }))
        .unwrap();
        let signed = suite
            .add_base_proof(&credential, &key, &ProofOptions::new(VM).with_mandatory_pointers(["/issuer"]))
            .unwrap();

        let revealed: Vec<&str> = FIELDS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, field)| *field)
            .collect();
        let pointers: Vec<String> = revealed.iter().map(|f| format!("/credentialSubject/{f}")).collect();
        let disclosed = suite
            .add_derived_proof(&signed, &DerivedProofOptions::new(pointers))
            .unwrap();

        let shown = disclosed.credential_subject().unwrap().as_object().unwrap();
        let mut shown_fields: Vec<&str> = shown.keys().map(String::as_str).collect();
        shown_fields.sort_unstable();
        let mut expected = revealed.clone();
        expected.sort_unstable();
        prop_assert_eq!(shown_fields, expected);

        let resolver = StaticKeyResolver::new().with_key(VM, public);
        prop_assert!(suite.verify_credential_with_proof(&disclosed, Some(&resolver)).unwrap());
    }
}
