//! Walking the tree along a key path.

use anyhow::Context as _;
use bitvec::prelude::*;
use smt_core::{
    hasher::NodeHasher,
    trie::{LeafData, Node, NodeHash},
};

use crate::{Metric, NodeStore, Tree};

/// Where a walk ended.
pub(crate) enum Terminal {
    /// An empty sub-tree: no key with this path prefix is stored.
    Empty,
    /// A leaf, which may be for a different key sharing the path prefix.
    Leaf { hash: NodeHash, leaf: LeafData },
}

/// The branches descended along a key path, and the terminal found below them.
pub(crate) struct Walk {
    /// The hashes of the branches descended, root first.
    pub branches: Vec<NodeHash>,
    /// The sibling of the child taken at each branch, root first.
    pub siblings: Vec<NodeHash>,
    pub terminal: Terminal,
}

impl<H: NodeHasher, S: NodeStore> Tree<H, S> {
    /// Load and decode a stored node.
    pub(crate) fn load(&self, hash: &NodeHash) -> anyhow::Result<Node> {
        self.metrics.count(Metric::NodeReads);
        let encoded = self
            .store
            .get(hash)?
            .with_context(|| format!("missing node {}", hex::encode(hash)))?;
        Node::decode(&encoded, self.key_length)
            .with_context(|| format!("corrupt node {}", hex::encode(hash)))
    }

    /// Walk from `root` along the path of `key` until an empty sub-tree or a leaf.
    ///
    /// The key must be `key_length` bytes.
    pub(crate) fn walk(&self, root: NodeHash, key: &[u8]) -> anyhow::Result<Walk> {
        let path = key.view_bits::<Msb0>();
        let mut walk = Walk {
            branches: Vec::new(),
            siblings: Vec::new(),
            terminal: Terminal::Empty,
        };

        let mut current = root;
        while current != H::empty() {
            match self.load(&current)? {
                Node::Leaf(leaf) => {
                    walk.terminal = Terminal::Leaf {
                        hash: current,
                        leaf,
                    };
                    break;
                }
                Node::Branch(branch) => {
                    let depth = walk.siblings.len();
                    anyhow::ensure!(
                        depth < path.len(),
                        "branch {} below the last level",
                        hex::encode(current)
                    );

                    let (child, sibling) = branch.child_and_sibling(path[depth]);
                    tracing::trace!(depth, node = %hex::encode(current), "descend");

                    walk.branches.push(current);
                    walk.siblings.push(sibling);
                    current = child;
                }
            }
        }

        Ok(walk)
    }
}
