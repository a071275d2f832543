#![no_main]

mod common;

use common::UntrustedProof;
use libfuzzer_sys::fuzz_target;
use smt::{proof, Sha2Hasher};

fuzz_target!(|run: UntrustedProof| {
    let UntrustedProof {
        key_length,
        query_keys,
        proof,
        root,
    } = run;

    // must never panic, whatever the input.
    let accepted = proof::verify::<Sha2Hasher>(&query_keys, &proof, &root, key_length);
    let calculated = proof::calculate_root::<Sha2Hasher>(
        &proof.sibling_hashes,
        &proof.queries,
        key_length,
    );

    if accepted {
        assert_eq!(calculated, Ok(root));
        let verified = proof::verify_proof::<Sha2Hasher>(&query_keys, &proof, &root, key_length)
            .expect("verify accepted the proof");
        for key in &query_keys {
            let _ = verified.confirm_nonexistence(key);
        }
    }
});
