//! Property tests for the key codecs and the label randomizer.

use proptest::prelude::*;
use vcdi_crypto::{
    extract_blank_node_labels, generate_key_pair, multikey_to_public_key,
    public_key_to_multikey, randomize_blank_node_labels, relabel_blank_nodes, Curve,
    EcdsaSignature, HmacKey,
};

fn curve() -> impl Strategy<Value = Curve> {
    prop_oneof![Just(Curve::P256), Just(Curve::P384)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn multikey_roundtrip(curve in curve()) {
        let (_, pk) = generate_key_pair(curve);
        let decoded = multikey_to_public_key(&public_key_to_multikey(&pk)).unwrap();
        prop_assert_eq!(decoded, pk);
    }

    #[test]
    fn any_single_bit_flip_breaks_the_signature(
        curve in curve(),
        message in prop::collection::vec(any::<u8>(), 0..128),
        bit in 0usize..768,
    ) {
        let (sk, pk) = generate_key_pair(curve);
        let sig = sk.sign(&message).unwrap();
        prop_assert!(pk.verify(&message, &sig).unwrap());

        let mut bytes = sig.as_bytes().to_vec();
        let bit = bit % (bytes.len() * 8);
        bytes[bit / 8] ^= 1 << (bit % 8);
        let flipped = EcdsaSignature::from_bytes(curve, &bytes).unwrap();
        prop_assert!(!pk.verify(&message, &flipped).unwrap());
    }

    #[test]
    fn randomization_is_a_pure_function(key in any::<[u8; 32]>(), n in 0usize..40) {
        let key = HmacKey::new(&key).unwrap();
        let label = format!("_:c14n{n}");
        let a = randomize_blank_node_labels(&key, &[label.clone()]);
        let b = randomize_blank_node_labels(&key, &[label.clone()]);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a[&label].len(), 67);
    }

    #[test]
    fn relabelling_replaces_every_blank_node(count in 1usize..12) {
        let key = HmacKey::generate();
        let nquads: String = (0..count)
            .map(|i| format!("_:c14n{i} <https://ex.org/next> _:c14n{} .\n", i + 1))
            .collect();
        let labels = extract_blank_node_labels(&nquads);
        prop_assert_eq!(labels.len(), count + 1);

        let map = randomize_blank_node_labels(&key, &labels);
        let out = relabel_blank_nodes(&nquads, &map);
        prop_assert!(!out.contains("_:c14n"));
        prop_assert_eq!(extract_blank_node_labels(&out).len(), count + 1);
    }
}
