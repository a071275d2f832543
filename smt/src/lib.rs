//! A sparse merkle tree with compact multi-proofs.
//!
//! The tree commits to a map from fixed-length keys to non-empty values under a single root hash.
//! Every entry is a leaf placed at the shallowest depth where its key path is distinguishable from
//! all other keys, so that the tree stays compact no matter how sparse the key space is.
//!
//! [`Tree`] owns the authoritative tree. It is mutated with [`Tree::update`] and [`Tree::remove`],
//! and proves any set of keys with [`Tree::generate_multi_proof`]. Proofs are checked without
//! access to the tree with [`proof::verify`].

use std::marker::PhantomData;

use bitvec::prelude::*;
use fxhash::FxHashSet;
use smt_core::{
    hasher::NodeHasher,
    key_path::shared_bits,
    trie::{leaf_data, BranchData, NodeHash},
};
use walk::Terminal;

pub use metrics::{Metric, Metrics};
pub use options::Options;
pub use smt_core::{
    hasher,
    key_path::{self, KeyPath},
    proof,
    trie::{self, LeafData, Node},
    Bitmap,
};
pub use store::{MemoryStore, NodeStore};

#[cfg(feature = "blake3-hasher")]
pub use smt_core::hasher::Blake3Hasher;
#[cfg(feature = "sha2-hasher")]
pub use smt_core::hasher::Sha2Hasher;

pub mod benches;
mod metrics;
mod options;
mod proof_builder;
mod store;
mod walk;

/// A value stored in the tree. Never empty.
pub type Value = Vec<u8>;

/// The result of a [`Tree::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// The root after the removal. Unchanged if the key was absent.
    pub root: NodeHash,
    /// The removed value, or `None` if the key was absent.
    pub previous: Option<Value>,
}

impl RemoveOutcome {
    /// Whether a value was removed.
    pub fn removed(&self) -> bool {
        self.previous.is_some()
    }
}

/// A sparse merkle tree over a [`NodeStore`].
///
/// Mutations take `&mut self`, so there is a single writer at any time. Reads and proof generation
/// take `&self`.
pub struct Tree<H, S = MemoryStore> {
    store: S,
    root: NodeHash,
    key_length: usize,
    retain_history: bool,
    metrics: Metrics,
    _marker: PhantomData<H>,
}

impl<H: NodeHasher> Tree<H, MemoryStore> {
    /// Open a tree over a fresh in-memory store.
    ///
    /// Fails if the options name a root, as a fresh store cannot hold it.
    pub fn in_memory(o: Options) -> anyhow::Result<Self> {
        Self::open(o, MemoryStore::new())
    }
}

impl<H: NodeHasher, S: NodeStore> Tree<H, S> {
    /// Open a tree over the given store.
    pub fn open(o: Options, store: S) -> anyhow::Result<Self> {
        anyhow::ensure!(o.key_length > 0, "key length must be more than 0");

        let root = o.root.unwrap_or_else(H::empty);
        if root != H::empty() && store.get(&root)?.is_none() {
            anyhow::bail!("root {} not found in store", hex::encode(root));
        }

        tracing::debug!(
            root = %hex::encode(root),
            key_length = o.key_length,
            retain_history = o.retain_history,
            "opened tree"
        );

        Ok(Self {
            store,
            root,
            key_length: o.key_length,
            retain_history: o.retain_history,
            metrics: Metrics::new(o.metrics),
            _marker: PhantomData,
        })
    }

    /// Returns the current root of the tree.
    pub fn root(&self) -> NodeHash {
        self.root
    }

    /// Returns true if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root == H::empty()
    }

    /// The length of every key, in bytes.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// The metrics collected by this tree.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the tree, returning the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Read the value of a key.
    pub fn get(&self, key: &[u8]) -> anyhow::Result<Option<Value>> {
        self.get_at(self.root, key)
    }

    /// Read the value of a key as of the given root.
    ///
    /// Roots other than the current one are only readable while history is retained.
    pub fn get_at(&self, root: NodeHash, key: &[u8]) -> anyhow::Result<Option<Value>> {
        self.check_key(key)?;
        match self.walk(root, key)?.terminal {
            Terminal::Leaf { leaf, .. } if leaf.key == key => Ok(Some(leaf.value)),
            _ => Ok(None),
        }
    }

    /// Set the value of a key, returning the new root.
    ///
    /// An empty value removes the key.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> anyhow::Result<NodeHash> {
        self.check_key(key)?;
        if value.is_empty() {
            return self.remove(key).map(|outcome| outcome.root);
        }

        let metrics = self.metrics.clone();
        let _timer = metrics.record(Metric::UpdateTime);

        let walk = self.walk(self.root, key)?;
        let mut stale = walk.branches;
        let mut siblings = walk.siblings;

        match walk.terminal {
            Terminal::Empty => {}
            Terminal::Leaf { hash, leaf } if leaf.key == key => {
                if leaf.value == value {
                    return Ok(self.root);
                }
                stale.push(hash);
            }
            Terminal::Leaf { hash, leaf } => {
                // split: a chain of branches down to the depth where the two keys diverge.
                let depth = siblings.len();
                let diverge = shared_bits(key.view_bits::<Msb0>(), leaf.key.view_bits::<Msb0>());
                anyhow::ensure!(
                    diverge >= depth,
                    "leaf {} misplaced at depth {depth}",
                    hex::encode(&leaf.key)
                );
                siblings.resize(diverge, H::empty());
                siblings.push(hash);
            }
        }

        let leaf_hash = H::hash_leaf(key, value);
        let mut fresh = vec![(leaf_hash, leaf_data(key, value))];
        let root = rehash::<H>(key.view_bits::<Msb0>(), leaf_hash, &siblings, &mut fresh);
        self.commit(root, stale, fresh)?;

        tracing::debug!(
            key = %hex::encode(key),
            depth = siblings.len(),
            root = %hex::encode(root),
            "updated"
        );
        Ok(root)
    }

    /// Remove a key. Removing an absent key leaves the tree untouched and is not an error.
    pub fn remove(&mut self, key: &[u8]) -> anyhow::Result<RemoveOutcome> {
        self.check_key(key)?;

        let metrics = self.metrics.clone();
        let _timer = metrics.record(Metric::UpdateTime);

        let walk = self.walk(self.root, key)?;
        let (leaf_hash, previous) = match walk.terminal {
            Terminal::Leaf { hash, leaf } if leaf.key == key => (hash, leaf.value),
            _ => {
                tracing::debug!(key = %hex::encode(key), "remove of absent key");
                return Ok(RemoveOutcome {
                    root: self.root,
                    previous: None,
                });
            }
        };

        let mut stale = walk.branches;
        stale.push(leaf_hash);
        let mut siblings = walk.siblings;

        // a leaf left alone under a branch is lifted until it has a non-empty sibling.
        let mut hash = H::empty();
        if let Some(&sibling) = siblings.last() {
            anyhow::ensure!(
                sibling != H::empty(),
                "leaf {} has an empty sibling",
                hex::encode(key)
            );
            if self.load(&sibling)?.is_leaf() {
                hash = sibling;
                siblings.pop();
                while siblings.last() == Some(&H::empty()) {
                    siblings.pop();
                }
            }
        }

        let mut fresh = Vec::new();
        let root = rehash::<H>(key.view_bits::<Msb0>(), hash, &siblings, &mut fresh);
        self.commit(root, stale, fresh)?;

        tracing::debug!(
            key = %hex::encode(key),
            root = %hex::encode(root),
            "removed"
        );
        Ok(RemoveOutcome {
            root,
            previous: Some(previous),
        })
    }

    /// Apply a batch of writes, returning the new root. `None` removes a key.
    ///
    /// Writes are applied in ascending key order. Of several writes to the same key, the last one
    /// wins. Every key is checked before anything is written.
    pub fn apply(
        &mut self,
        batch: impl IntoIterator<Item = (Vec<u8>, Option<Value>)>,
    ) -> anyhow::Result<NodeHash> {
        let mut batch: Vec<_> = batch.into_iter().collect();
        for (key, _) in &batch {
            self.check_key(key)?;
        }
        batch.sort_by(|(a, _), (b, _)| a.cmp(b));

        tracing::debug!(writes = batch.len(), "applying batch");
        for (key, value) in batch {
            match value {
                Some(value) => {
                    self.update(&key, &value)?;
                }
                None => {
                    self.remove(&key)?;
                }
            }
        }

        Ok(self.root)
    }

    fn check_key(&self, key: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            key.len() == self.key_length,
            "key of {} bytes, expected {}",
            key.len(),
            self.key_length
        );
        Ok(())
    }

    // Write the fresh nodes and drop the stale ones, unless history is kept. A node may be both,
    // e.g. a leaf moved to another depth.
    fn commit(
        &mut self,
        root: NodeHash,
        stale: Vec<NodeHash>,
        fresh: Vec<(NodeHash, Vec<u8>)>,
    ) -> anyhow::Result<()> {
        let written: FxHashSet<NodeHash> = fresh.iter().map(|(hash, _)| *hash).collect();

        self.metrics.count_n(Metric::NodeWrites, fresh.len() as u64);
        for (hash, encoded) in fresh {
            self.store.insert(hash, encoded)?;
        }

        if !self.retain_history {
            let mut pruned = 0;
            for hash in stale.iter().filter(|hash| !written.contains(*hash)) {
                self.store.remove(hash)?;
                pruned += 1;
            }
            self.metrics.count_n(Metric::NodesPruned, pruned);
        }

        self.root = root;
        Ok(())
    }
}

// Hash a node up through the given siblings, root first, recording every new branch.
fn rehash<H: NodeHasher>(
    path: &BitSlice<u8, Msb0>,
    mut hash: NodeHash,
    siblings: &[NodeHash],
    fresh: &mut Vec<(NodeHash, Vec<u8>)>,
) -> NodeHash {
    for (depth, sibling) in siblings.iter().enumerate().rev() {
        let branch = BranchData::from_child(path[depth], hash, *sibling);
        hash = H::hash_branch(&branch);
        fresh.push((hash, branch.encode()));
    }
    hash
}

#[cfg(all(test, feature = "sha2-hasher"))]
mod tests {
    use super::*;
    use smt_core::hasher::Sha2Hasher;

    fn tree(key_length: usize) -> Tree<Sha2Hasher> {
        let mut o = Options::new();
        o.key_length(key_length);
        Tree::in_memory(o).unwrap()
    }

    #[test]
    fn empty_tree_has_empty_root() {
        let t = tree(32);
        assert!(t.is_empty());
        assert_eq!(t.root(), Sha2Hasher::empty());
        assert!(t.store().is_empty());
    }

    #[test]
    fn first_leaf_is_the_root() {
        let mut t = tree(1);
        let root = t.update(&[0x33], b"value").unwrap();
        assert_eq!(root, Sha2Hasher::hash_leaf(&[0x33], b"value"));
        assert_eq!(t.store().len(), 1);
    }

    #[test]
    fn split_builds_chain_to_divergence() {
        let mut t = tree(1);
        t.update(&[0b0011_0011], b"a").unwrap();
        let root = t.update(&[0b0011_1000], b"b").unwrap();

        // the keys share 4 bits: 4 branches with an empty sibling, then one holding both leaves.
        let a = Sha2Hasher::hash_leaf(&[0b0011_0011], b"a");
        let b = Sha2Hasher::hash_leaf(&[0b0011_1000], b"b");
        let e = Sha2Hasher::empty();
        let mut expected = Sha2Hasher::hash_branch(&BranchData { left: a, right: b });
        for bit in [true, true, false, false] {
            expected = Sha2Hasher::hash_branch(&BranchData::from_child(bit, expected, e));
        }
        assert_eq!(root, expected);
        assert_eq!(t.store().len(), 7);
    }

    #[test]
    fn remove_lifts_leaf_back_to_the_root() {
        let mut t = tree(1);
        t.update(&[0b0011_0011], b"a").unwrap();
        t.update(&[0b0011_1000], b"b").unwrap();

        let outcome = t.remove(&[0b0011_1000]).unwrap();
        assert_eq!(outcome.previous, Some(b"b".to_vec()));
        assert_eq!(outcome.root, Sha2Hasher::hash_leaf(&[0b0011_0011], b"a"));
        assert_eq!(t.store().len(), 1);

        let outcome = t.remove(&[0b0011_0011]).unwrap();
        assert!(outcome.removed());
        assert!(t.is_empty());
        assert!(t.store().is_empty());
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut t = tree(1);
        t.update(&[0x10], b"a").unwrap();
        let root = t.root();
        let outcome = t.remove(&[0x11]).unwrap();
        assert_eq!(outcome.root, root);
        assert!(!outcome.removed());
    }

    #[test]
    fn empty_value_removes() {
        let mut t = tree(1);
        t.update(&[0x10], b"a").unwrap();
        t.update(&[0x10], b"").unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn wrong_key_length_is_rejected_before_mutation() {
        let mut t = tree(2);
        t.update(&[1, 2], b"a").unwrap();
        let root = t.root();
        assert!(t.update(&[1], b"b").is_err());
        assert!(t.remove(&[1, 2, 3]).is_err());
        assert!(t
            .apply(vec![(vec![0, 1], Some(b"c".to_vec())), (vec![0], None)])
            .is_err());
        assert_eq!(t.root(), root);
    }

    #[test]
    fn history_is_kept_on_request() {
        let mut o = Options::new();
        o.key_length(1);
        o.retain_history(true);
        let mut t = Tree::<Sha2Hasher>::in_memory(o).unwrap();

        let first = t.update(&[0x01], b"a").unwrap();
        t.update(&[0x01], b"b").unwrap();
        assert_eq!(t.get_at(first, &[0x01]).unwrap(), Some(b"a".to_vec()));
        assert_eq!(t.get(&[0x01]).unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn open_rejects_unknown_root() {
        let mut o = Options::new();
        o.root([7; 32]);
        assert!(Tree::<Sha2Hasher>::in_memory(o).is_err());

        let mut o = Options::new();
        o.key_length(0);
        assert!(Tree::<Sha2Hasher>::in_memory(o).is_err());
    }
}
