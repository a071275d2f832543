use sha2::{Digest as _, Sha256};
use smt::{Options, Sha2Hasher, Tree, Value};
use std::collections::BTreeMap;

const ENV_NAME: &str = "SMT_LOG";

/// Install a `tracing` subscriber filtered by `SMT_LOG`, once per test binary.
#[allow(dead_code)]
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env(ENV_NAME).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

#[allow(dead_code)]
pub fn key(id: u64, key_length: usize) -> Vec<u8> {
    // Keys must be uniformly distributed, but we don't want to spend time on a good hash. So
    // the next best option is to use a PRNG seeded with the id.
    use rand::{RngCore as _, SeedableRng as _};
    let mut seed = [0; 16];
    seed[0..8].copy_from_slice(&id.to_le_bytes());
    let mut rng = rand_pcg::Lcg64Xsh32::from_seed(seed);
    let mut key = vec![0; key_length];
    rng.fill_bytes(&mut key);
    key
}

#[allow(dead_code)]
pub fn value(id: u64) -> Value {
    format!("value {id}").into_bytes()
}

#[allow(dead_code)]
pub fn tree(key_length: usize) -> Tree<Sha2Hasher> {
    let mut o = Options::new();
    o.key_length(key_length);
    o.metrics(true);
    Tree::in_memory(o).unwrap()
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compute the root of a set of entries from scratch, without the tree.
#[allow(dead_code)]
pub fn expected_root(entries: &BTreeMap<Vec<u8>, Value>) -> [u8; 32] {
    let entries: Vec<_> = entries.iter().collect();
    return subtree_root(&entries, 0);

    fn subtree_root(entries: &[(&Vec<u8>, &Value)], depth: usize) -> [u8; 32] {
        match entries {
            [] => sha256(&[]),
            [(key, value)] => sha256(&[&[0x00u8], key.as_slice(), value.as_slice()]),
            _ => {
                // sorted, so the entries going left come first.
                let split = entries.partition_point(|(key, _)| !bit(key, depth));
                let left = subtree_root(&entries[..split], depth + 1);
                let right = subtree_root(&entries[split..], depth + 1);
                sha256(&[&[0x01u8], &left, &right])
            }
        }
    }

    fn bit(key: &[u8], depth: usize) -> bool {
        key[depth / 8] & (0x80 >> (depth % 8)) != 0
    }
}
