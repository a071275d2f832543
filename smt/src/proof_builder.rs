//! Proof generation.
//!
//! Every requested key is walked independently, recording the siblings met along its path. The
//! walks are then merged by hashing the queries up with [`hash_up`], the same routine the verifier
//! runs. Whenever the merge asks for an explicit sibling, the recorded hash is emitted, so the
//! sibling hashes come out in exactly the order a verifier consumes them and siblings derived from
//! other queries are never emitted.

use anyhow::Context as _;
use bitvec::prelude::*;
use fxhash::FxHashMap;
use smt_core::{
    hasher::NodeHasher,
    proof::{hash_up, Proof, QueryProof},
    trie::NodeHash,
    Bitmap,
};

use crate::{walk::Terminal, Metric, NodeStore, Tree};

impl<H: NodeHasher, S: NodeStore> Tree<H, S> {
    /// Generate a proof for a single key against the current root.
    ///
    /// This proves inclusion if the key is present, and exclusion otherwise.
    pub fn generate_single_proof(&self, key: &[u8]) -> anyhow::Result<Proof> {
        self.generate_multi_proof(&[key])
    }

    /// Generate a proof for several keys against the current root.
    ///
    /// The proof holds one query per requested key, in the order requested.
    pub fn generate_multi_proof(&self, keys: &[impl AsRef<[u8]>]) -> anyhow::Result<Proof> {
        self.generate_multi_proof_at(self.root, keys)
    }

    /// Generate a proof for several keys against the given root.
    ///
    /// Roots other than the current one are only provable while history is retained.
    pub fn generate_multi_proof_at(
        &self,
        root: NodeHash,
        keys: &[impl AsRef<[u8]>],
    ) -> anyhow::Result<Proof> {
        anyhow::ensure!(!keys.is_empty(), "no keys to prove");
        let _timer = self.metrics.record(Metric::ProofTime);

        let mut queries = Vec::with_capacity(keys.len());
        // explicit siblings by the path of the node they are the sibling of.
        let mut siblings: FxHashMap<BitVec<u8, Msb0>, NodeHash> = FxHashMap::default();

        for key in keys {
            let key = key.as_ref();
            self.check_key(key)?;

            let walk = self.walk(root, key)?;
            let path = key.view_bits::<Msb0>();
            for (depth, sibling) in walk.siblings.iter().enumerate() {
                if *sibling != H::empty() {
                    siblings.insert(path[..=depth].to_bitvec(), *sibling);
                }
            }

            let bitmap = Bitmap::from_root_first(walk.siblings.iter().map(|s| *s != H::empty()));
            let query = match walk.terminal {
                Terminal::Empty => QueryProof {
                    key: key.to_vec(),
                    value: Vec::new(),
                    bitmap,
                },
                Terminal::Leaf { leaf, .. } => QueryProof {
                    key: leaf.key,
                    value: leaf.value,
                    bitmap,
                },
            };
            queries.push(query);
        }

        let mut sibling_hashes = Vec::new();
        let calculated = hash_up::<H>(&queries, self.key_length, |path, height| {
            let sibling = siblings.get(&path[..height]).copied();
            sibling_hashes.extend(sibling);
            sibling
        })
        .context("failed to assemble proof")?;

        anyhow::ensure!(
            calculated == root,
            "proof reproduces root {} instead of {}",
            hex::encode(calculated),
            hex::encode(root)
        );

        self.metrics.count(Metric::ProofsGenerated);
        tracing::debug!(
            keys = keys.len(),
            siblings = sibling_hashes.len(),
            root = %hex::encode(root),
            "generated proof"
        );

        Ok(Proof {
            sibling_hashes,
            queries,
        })
    }
}
