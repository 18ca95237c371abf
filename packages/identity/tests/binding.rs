//! Integration tests for private key to certificate binding

mod common;

use common::{Fixture, Hierarchy, Profile};
use cryypt_identity::binding::{find_leaf, matches};
use cryypt_identity::{ReasonCode, parse_private_key};

#[test]
fn test_key_matches_own_certificate() {
    let fixture = Fixture::self_signed(&Profile::leaf("match.test"));
    let key = parse_private_key(&fixture.key_blob(), None).expect("Key");
    assert!(matches(&key, &fixture.parsed()).expect("Comparable"));
}

#[test]
fn test_ed25519_and_p384_keys_match() {
    for alg in [&rcgen::PKCS_ED25519, &rcgen::PKCS_ECDSA_P384_SHA384] {
        let fixture = Fixture::self_signed(&Profile::leaf("alg.test").algorithm(alg));
        let key = parse_private_key(&fixture.key_blob(), None).expect("Key");
        assert!(matches(&key, &fixture.parsed()).expect("Comparable"));
    }
}

#[test]
fn test_independent_key_does_not_match() {
    let fixture = Fixture::self_signed(&Profile::leaf("match.test"));
    let other = Fixture::self_signed(&Profile::leaf("other.test"));
    let key = parse_private_key(&other.key_blob(), None).expect("Key");
    assert!(!matches(&key, &fixture.parsed()).expect("Comparable"));
}

#[test]
fn test_other_curve_does_not_match() {
    let p256 = Fixture::self_signed(&Profile::leaf("p256.test"));
    let p384 = Fixture::self_signed(
        &Profile::leaf("p384.test").algorithm(&rcgen::PKCS_ECDSA_P384_SHA384),
    );
    let key = parse_private_key(&p384.key_blob(), None).expect("Key");
    assert!(!matches(&key, &p256.parsed()).expect("Same family"));
}

#[test]
fn test_other_family_is_unsupported() {
    let ec = Fixture::self_signed(&Profile::leaf("ec.test"));
    let ed = Fixture::self_signed(&Profile::leaf("ed.test").algorithm(&rcgen::PKCS_ED25519));
    let key = parse_private_key(&ed.key_blob(), None).expect("Key");

    let err = matches(&key, &ec.parsed()).expect_err("Different families");
    assert_eq!(err.reason(), ReasonCode::UnsupportedAlgorithm);
}

#[test]
fn test_find_leaf_in_unordered_pool() {
    let h = Hierarchy::new();
    let pool = vec![h.root.parsed(), h.intermediate.parsed(), h.leaf.parsed()];
    let key = parse_private_key(&h.leaf.key_blob(), None).expect("Key");
    assert_eq!(find_leaf(&key, &pool).expect("Leaf found"), 2);

    let key = parse_private_key(&h.intermediate.key_blob(), None).expect("Key");
    assert_eq!(find_leaf(&key, &pool).expect("Intermediate found"), 1);
}

#[test]
fn test_find_leaf_without_match() {
    let h = Hierarchy::new();
    let stranger = Fixture::self_signed(&Profile::leaf("stranger.test"));
    let pool = vec![h.leaf.parsed(), h.intermediate.parsed()];

    let key = parse_private_key(&stranger.key_blob(), None).expect("Key");
    let err = find_leaf(&key, &pool).expect_err("No certificate belongs to the key");
    assert_eq!(err.reason(), ReasonCode::KeyMismatch);

    let ed = Fixture::self_signed(&Profile::leaf("ed.test").algorithm(&rcgen::PKCS_ED25519));
    let key = parse_private_key(&ed.key_blob(), None).expect("Key");
    let err = find_leaf(&key, &pool).expect_err("No certificate of the key's family");
    assert_eq!(err.reason(), ReasonCode::UnsupportedAlgorithm);
}
