#![no_main]

mod common;

use std::collections::BTreeMap;

use common::Op;
use libfuzzer_sys::fuzz_target;
use smt::{proof, Options, Sha2Hasher, Tree};

fuzz_target!(|ops: Vec<Op>| {
    let mut o = Options::new();
    o.key_length(2);
    let mut tree = Tree::<Sha2Hasher>::in_memory(o).unwrap();
    let mut model = BTreeMap::new();

    for op in ops {
        match op {
            Op::Update { key, value } => {
                tree.update(&key, &value).unwrap();
                if value.is_empty() {
                    model.remove(&key);
                } else {
                    model.insert(key, value);
                }
            }
            Op::Remove { key } => {
                let outcome = tree.remove(&key).unwrap();
                assert_eq!(outcome.previous, model.remove(&key));
            }
            Op::Prove { keys } => {
                if keys.is_empty() {
                    continue;
                }
                let p = tree.generate_multi_proof(&keys).unwrap();
                let verified =
                    proof::verify_proof::<Sha2Hasher>(&keys, &p, &tree.root(), 2).unwrap();
                for key in &keys {
                    match model.get(key) {
                        Some(value) => assert_eq!(verified.confirm_value(key, value), Ok(true)),
                        None => assert_eq!(verified.confirm_nonexistence(key), Ok(true)),
                    }
                }
            }
        }
    }

    for (key, value) in &model {
        assert_eq!(tree.get(key).unwrap().as_ref(), Some(value));
    }
    if model.is_empty() {
        assert!(tree.is_empty());
        assert!(tree.store().is_empty());
    }
});
