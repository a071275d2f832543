mod common;

use smt::{
    proof::{self, KeyOutOfScope, ProofVerificationError},
    Options, Sha2Hasher, Tree,
};

type H = Sha2Hasher;

fn filled(n: u64, key_length: usize) -> Tree<H> {
    let mut t = common::tree(key_length);
    for id in 0..n {
        t.update(&common::key(id, key_length), &common::value(id))
            .unwrap();
    }
    t
}

#[test]
fn single_proofs_are_sound() {
    common::init_logging();
    let t = filled(500, 32);
    let root = t.root();

    for id in 0..600 {
        let key = common::key(id, 32);
        let p = t.generate_single_proof(&key).unwrap();
        assert!(proof::verify::<H>(&[&key], &p, &root, 32));

        let verified = proof::verify_proof::<H>(&[&key], &p, &root, 32).unwrap();
        if id < 500 {
            assert_eq!(verified.confirm_value(&key, &common::value(id)), Ok(true));
            assert_eq!(verified.confirm_nonexistence(&key), Ok(false));
        } else {
            assert_eq!(verified.confirm_nonexistence(&key), Ok(true));
            assert_eq!(verified.confirm_value(&key, &common::value(id)), Ok(false));
        }
    }
}

#[test]
fn multi_proofs_are_sound_and_compact() {
    let t = filled(1000, 32);
    let root = t.root();

    // a mix of present and absent keys.
    let keys: Vec<Vec<u8>> = (900..1100).map(|id| common::key(id, 32)).collect();
    let p = t.generate_multi_proof(&keys).unwrap();
    assert_eq!(p.queries.len(), keys.len());
    assert!(proof::verify::<H>(&keys, &p, &root, 32));

    let singles: usize = keys
        .iter()
        .map(|key| t.generate_single_proof(key).unwrap().sibling_hashes.len())
        .sum();
    // 200 keys among 1000 share the top levels of the tree.
    assert!(p.sibling_hashes.len() < singles);

    let verified = proof::verify_proof::<H>(&keys, &p, &root, 32).unwrap();
    for (id, key) in (900..1100).zip(&keys) {
        let present = id < 1000;
        assert_eq!(verified.confirm_value(key, &common::value(id)), Ok(present));
        assert_eq!(verified.confirm_nonexistence(key), Ok(!present));
    }
}

#[test]
fn duplicate_requested_keys() {
    let t = filled(100, 32);
    let key = common::key(3, 32);
    let keys = vec![key.clone(), common::key(4, 32), key];
    let p = t.generate_multi_proof(&keys).unwrap();
    assert_eq!(p.queries.len(), 3);
    assert_eq!(p.queries[0], p.queries[2]);
    assert!(proof::verify::<H>(&keys, &p, &t.root(), 32));
}

#[test]
fn tampering_is_detected() {
    let t = filled(200, 32);
    let root = t.root();
    let keys: Vec<Vec<u8>> = [5, 17, 250].iter().map(|id| common::key(*id, 32)).collect();
    let p = t.generate_multi_proof(&keys).unwrap();
    assert!(proof::verify::<H>(&keys, &p, &root, 32));

    for i in 0..p.sibling_hashes.len() {
        for byte in [0, 31] {
            let mut tampered = p.clone();
            tampered.sibling_hashes[i][byte] ^= 0x01;
            assert!(!proof::verify::<H>(&keys, &tampered, &root, 32));
        }
    }

    for i in 0..p.queries.len() {
        let mut tampered = p.clone();
        tampered.queries[i].key[0] ^= 0x80;
        assert!(!proof::verify::<H>(&keys, &tampered, &root, 32));

        // present keys only: an absent key's value is empty.
        if !p.queries[i].value.is_empty() {
            let mut tampered = p.clone();
            tampered.queries[i].value[0] ^= 0x01;
            assert!(!proof::verify::<H>(&keys, &tampered, &root, 32));
        }
    }

    let mut tampered = p.clone();
    tampered.sibling_hashes.pop();
    assert_eq!(
        proof::verify_proof::<H>(&keys, &tampered, &root, 32).unwrap_err(),
        ProofVerificationError::NotEnoughSiblings
    );

    let mut tampered = p.clone();
    tampered.sibling_hashes.push([0; 32]);
    assert_eq!(
        proof::verify_proof::<H>(&keys, &tampered, &root, 32).unwrap_err(),
        ProofVerificationError::TooManySiblings
    );
}

#[test]
fn wrong_root_or_key_count_fails() {
    let t = filled(50, 32);
    let keys = vec![common::key(1, 32), common::key(2, 32)];
    let p = t.generate_multi_proof(&keys).unwrap();

    assert!(!proof::verify::<H>(&keys, &p, &[0; 32], 32));
    assert!(!proof::verify::<H>(&keys[..1], &p, &t.root(), 32));
    assert!(!proof::verify::<H>(&keys, &p, &t.root(), 31));
}

#[test]
fn exclusion_needs_divergence_check() {
    let t = filled(50, 32);
    let absent = common::key(1000, 32);
    let p = t.generate_single_proof(&absent).unwrap();

    // the proof is valid for any requested key, since only the count is checked.
    let unrelated = common::key(2000, 32);
    assert!(proof::verify::<H>(&[&unrelated], &p, &t.root(), 32));

    let verified = proof::verify_proof::<H>(&[&unrelated], &p, &t.root(), 32).unwrap();
    assert_eq!(verified.confirm_nonexistence(&absent), Ok(true));
    let in_scope = verified.find_index_for(&unrelated).is_ok();
    if !in_scope {
        assert_eq!(verified.confirm_nonexistence(&unrelated), Err(KeyOutOfScope));
    }
}

#[test]
fn empty_slot_key_is_bound_to_resolved_bits() {
    let t = filled(50, 32);
    let root = t.root();

    let (key, p) = (1000..2000)
        .map(|id| common::key(id, 32))
        .map(|key| {
            let p = t.generate_single_proof(&key).unwrap();
            (key, p)
        })
        .find(|(_, p)| p.queries[0].value.is_empty())
        .unwrap();
    let height = p.queries[0].bitmap.len();
    assert!(height < 8 * 31);

    // bits below the resolved position are not committed to.
    let mut tampered = p.clone();
    tampered.queries[0].key[31] ^= 0x01;
    assert!(proof::verify::<H>(&[&key], &tampered, &root, 32));

    // every bit on the path is.
    for bit in 0..height {
        let mut tampered = p.clone();
        tampered.queries[0].key[bit / 8] ^= 0x80 >> (bit % 8);
        assert!(!proof::verify::<H>(&[&key], &tampered, &root, 32));
    }
}

#[test]
fn proofs_against_retained_roots() {
    let mut o = Options::new();
    o.retain_history(true);
    let mut t = Tree::<H>::in_memory(o).unwrap();

    for id in 0..100 {
        t.update(&common::key(id, 32), &common::value(id)).unwrap();
    }
    let old_root = t.root();
    for id in 0..50 {
        t.remove(&common::key(id, 32)).unwrap();
    }
    assert_ne!(t.root(), old_root);

    let keys = vec![common::key(10, 32), common::key(60, 32)];
    let p = t.generate_multi_proof_at(old_root, &keys).unwrap();
    let verified = proof::verify_proof::<H>(&keys, &p, &old_root, 32).unwrap();
    assert_eq!(verified.confirm_value(&keys[0], &common::value(10)), Ok(true));

    let p = t.generate_multi_proof(&keys).unwrap();
    let verified = proof::verify_proof::<H>(&keys, &p, &t.root(), 32).unwrap();
    assert_eq!(verified.confirm_nonexistence(&keys[0]), Ok(true));
    assert_eq!(verified.confirm_value(&keys[1], &common::value(60)), Ok(true));
}

#[test]
fn pruned_roots_cannot_be_proven() {
    let mut t = filled(20, 32);
    let old_root = t.root();
    t.update(&common::key(0, 32), b"changed").unwrap();
    assert!(t
        .generate_multi_proof_at(old_root, &[common::key(0, 32)])
        .is_err());
}

#[test]
fn short_keys() {
    let mut t = common::tree(1);
    for key in 0..=255u8 {
        if key % 3 == 0 {
            t.update(&[key], &[key, 0xff]).unwrap();
        }
    }

    let keys: Vec<[u8; 1]> = (0..=255u8).map(|k| [k]).collect();
    let p = t.generate_multi_proof(&keys).unwrap();
    assert!(proof::verify::<H>(&keys, &p, &t.root(), 1));

    let verified = proof::verify_proof::<H>(&keys, &p, &t.root(), 1).unwrap();
    for key in 0..=255u8 {
        assert_eq!(verified.confirm_value(&[key], &[key, 0xff]), Ok(key % 3 == 0));
    }
}

#[test]
fn long_keys() {
    let t = filled(300, 38);
    let keys: Vec<Vec<u8>> = (250..350).map(|id| common::key(id, 38)).collect();
    let p = t.generate_multi_proof(&keys).unwrap();
    assert!(proof::verify::<H>(&keys, &p, &t.root(), 38));
    assert!(!proof::verify::<H>(&keys, &p, &t.root(), 32));
}

#[test]
fn proofs_counted_in_metrics() {
    let t = filled(10, 32);
    t.generate_single_proof(&common::key(1, 32)).unwrap();
    t.generate_multi_proof(&[common::key(1, 32), common::key(2, 32)])
        .unwrap();
    assert_eq!(t.metrics().get(smt::Metric::ProofsGenerated), Some(2));
}
