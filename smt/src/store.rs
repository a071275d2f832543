//! Node storage.
//!
//! Nodes are content-addressed: every encoded node is stored under its own hash. The empty
//! sub-tree is never stored.

use fxhash::FxHashMap;
use smt_core::trie::NodeHash;

/// A store of encoded nodes, keyed by node hash.
pub trait NodeStore {
    /// Load the encoded node with the given hash, if present.
    fn get(&self, hash: &NodeHash) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store an encoded node under its hash. Storing the same node twice is not an error.
    fn insert(&mut self, hash: NodeHash, encoded: Vec<u8>) -> anyhow::Result<()>;

    /// Remove the node with the given hash. Removing an absent node is not an error.
    fn remove(&mut self, hash: &NodeHash) -> anyhow::Result<()>;
}

/// A [`NodeStore`] held entirely in memory.
#[derive(Default, Clone)]
pub struct MemoryStore {
    nodes: FxHashMap<NodeHash, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of nodes held.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, hash: &NodeHash) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.nodes.get(hash).cloned())
    }

    fn insert(&mut self, hash: NodeHash, encoded: Vec<u8>) -> anyhow::Result<()> {
        self.nodes.insert(hash, encoded);
        Ok(())
    }

    fn remove(&mut self, hash: &NodeHash) -> anyhow::Result<()> {
        self.nodes.remove(hash);
        Ok(())
    }
}

impl<S: NodeStore + ?Sized> NodeStore for &mut S {
    fn get(&self, hash: &NodeHash) -> anyhow::Result<Option<Vec<u8>>> {
        (**self).get(hash)
    }

    fn insert(&mut self, hash: NodeHash, encoded: Vec<u8>) -> anyhow::Result<()> {
        (**self).insert(hash, encoded)
    }

    fn remove(&mut self, hash: &NodeHash) -> anyhow::Result<()> {
        (**self).remove(hash)
    }
}
