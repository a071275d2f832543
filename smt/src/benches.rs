#![cfg(feature = "benchmarks")]

use criterion::{BenchmarkId, Criterion, Throughput};
use rand::RngCore;

use crate::{Options, Sha2Hasher, Tree};

pub fn tree_benchmark(c: &mut Criterion) {
    update_benchmark(c);
    multi_proof_benchmark(c);
    verify_benchmark(c);
}

// returns `n` random keys of 32 bytes
pub fn get_keys(n: usize) -> Vec<[u8; 32]> {
    let mut rand = rand::thread_rng();
    (0..n)
        .map(|_| {
            let mut key = [0; 32];
            rand.fill_bytes(&mut key);
            key
        })
        .collect()
}

fn filled_tree(keys: &[[u8; 32]]) -> Tree<Sha2Hasher> {
    let mut t = Tree::in_memory(Options::new()).unwrap();
    for key in keys {
        t.update(key, &key[..8]).unwrap();
    }
    t
}

pub fn update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    for size in [1_000, 10_000, 100_000] {
        let t = filled_tree(&get_keys(size));
        let writes = get_keys(100);

        group.throughput(Throughput::Elements(writes.len() as u64));
        group.bench_function(BenchmarkId::new("tree_size", size), |b| {
            b.iter_batched(
                || {
                    let mut o = Options::new();
                    o.root(t.root());
                    Tree::<Sha2Hasher>::open(o, t.store().clone()).unwrap()
                },
                |mut t| {
                    for key in &writes {
                        t.update(key, &key[..8]).unwrap();
                    }
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

pub fn multi_proof_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_multi_proof");
    let keys = get_keys(10_000);
    let t = filled_tree(&keys);

    for n in [1, 16, 256] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("keys", n), |b| {
            b.iter(|| t.generate_multi_proof(&keys[..n]).unwrap())
        });
    }

    group.finish();
}

pub fn verify_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");
    let keys = get_keys(10_000);
    let t = filled_tree(&keys);
    let root = t.root();

    for n in [1, 16, 256] {
        let proof = t.generate_multi_proof(&keys[..n]).unwrap();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("keys", n), |b| {
            b.iter(|| assert!(crate::proof::verify::<Sha2Hasher>(&keys[..n], &proof, &root, 32)))
        });
    }

    group.finish();
}
