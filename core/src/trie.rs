//! This module defines the node types of a sparse binary merkle tree and their byte encodings.
//!
//! There are two kinds of stored nodes.
//!   1. Leaf nodes, which carry a single key and its value. A leaf sits at the shallowest depth at
//!      which its key path is distinguishable from every other stored key, not necessarily at the
//!      full depth of the key path.
//!   2. Branch nodes, which carry the hashes of their left and right children.
//!
//! A third kind of node is never stored: the empty sub-tree, which stands in for a missing child
//! at any height. Its hash is [`NodeHasher::empty`](crate::hasher::NodeHasher::empty).
//!
//! Encodings are tagged so that a leaf and a branch preimage can never collide:
//!
//! ```text
//! leaf   = LEAF_TAG   ++ key  ++ value
//! branch = BRANCH_TAG ++ left ++ right
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::hasher::NodeHasher;

/// The hash of a node. Always 256 bits.
pub type NodeHash = [u8; 32];

/// The length in bytes of a [`NodeHash`].
pub const HASH_LEN: usize = 32;

/// The tag byte prefixed to every encoded leaf.
pub const LEAF_TAG: u8 = 0x00;

/// The tag byte prefixed to every encoded branch.
pub const BRANCH_TAG: u8 = 0x01;

/// The data of a branch node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchData {
    /// The hash of the left child of this node.
    pub left: NodeHash,
    /// The hash of the right child of this node.
    pub right: NodeHash,
}

impl BranchData {
    /// Build branch data from a child and its sibling, placing `node` on the side given by `bit`.
    pub fn from_child(bit: bool, node: NodeHash, sibling: NodeHash) -> Self {
        if bit {
            BranchData {
                left: sibling,
                right: node,
            }
        } else {
            BranchData {
                left: node,
                right: sibling,
            }
        }
    }

    /// Get the child on the side given by `bit`, followed by its sibling.
    pub fn child_and_sibling(&self, bit: bool) -> (NodeHash, NodeHash) {
        if bit {
            (self.right, self.left)
        } else {
            (self.left, self.right)
        }
    }

    /// Encode this branch. See [`branch_data`].
    pub fn encode(&self) -> Vec<u8> {
        branch_data(&self.left, &self.right)
    }
}

/// The data of a leaf node.
#[derive(Default, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub struct LeafData {
    /// The full key of the entry.
    ///
    /// The actual location of this node may be anywhere along the key's path, depending on the
    /// other data within the tree.
    pub key: Vec<u8>,
    /// The value carried in this leaf.
    pub value: Vec<u8>,
}

impl LeafData {
    /// Encode this leaf. See [`leaf_data`].
    pub fn encode(&self) -> Vec<u8> {
        leaf_data(&self.key, &self.value)
    }
}

impl fmt::Debug for LeafData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafData")
            .field("key", &hex::encode(&self.key))
            .field("value", &hex::encode(&self.value))
            .finish()
    }
}

/// A stored node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf, carrying a single entry.
    Leaf(LeafData),
    /// A branch with two children, at most one of which is the empty sub-tree.
    Branch(BranchData),
}

impl Node {
    /// Encode the node into its tagged byte representation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Leaf(leaf) => leaf.encode(),
            Node::Branch(branch) => branch.encode(),
        }
    }

    /// Decode a node from its tagged byte representation.
    pub fn decode(bytes: &[u8], key_length: usize) -> Result<Self, DecodeError> {
        match bytes.first() {
            None => Err(DecodeError::Empty),
            Some(&LEAF_TAG) => parse_leaf_data(bytes, key_length).map(Node::Leaf),
            Some(&BRANCH_TAG) => parse_branch_data(bytes).map(Node::Branch),
            Some(&tag) => Err(DecodeError::UnknownTag(tag)),
        }
    }

    /// Hash the node with the given hasher.
    pub fn hash<H: NodeHasher>(&self) -> NodeHash {
        match self {
            Node::Leaf(leaf) => H::hash_leaf(&leaf.key, &leaf.value),
            Node::Branch(branch) => H::hash_branch(branch),
        }
    }

    /// Whether this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

/// Errors when decoding a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No bytes were given.
    Empty,
    /// The tag byte is neither [`LEAF_TAG`] nor [`BRANCH_TAG`].
    UnknownTag(u8),
    /// The tag byte does not match the node kind being decoded.
    TagMismatch {
        /// The tag expected for this kind.
        expected: u8,
        /// The tag found.
        found: u8,
    },
    /// The encoding is too short or too long.
    BadLength(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty node encoding"),
            DecodeError::UnknownTag(tag) => write!(f, "unknown node tag {tag:#04x}"),
            DecodeError::TagMismatch { expected, found } => {
                write!(f, "expected node tag {expected:#04x}, found {found:#04x}")
            }
            DecodeError::BadLength(len) => write!(f, "bad node encoding length {len}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Encode a leaf: `LEAF_TAG ++ key ++ value`.
pub fn leaf_data(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + key.len() + value.len());
    buf.push(LEAF_TAG);
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf
}

/// Encode a branch: `BRANCH_TAG ++ left ++ right`.
pub fn branch_data(left: &NodeHash, right: &NodeHash) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 2 * HASH_LEN);
    buf.push(BRANCH_TAG);
    buf.extend_from_slice(left);
    buf.extend_from_slice(right);
    buf
}

/// Whether the encoded node is a leaf. Only the tag byte is inspected.
pub fn is_leaf(bytes: &[u8]) -> bool {
    bytes.first() == Some(&LEAF_TAG)
}

/// Decode an encoded leaf. The split between key and value is at `key_length`.
pub fn parse_leaf_data(bytes: &[u8], key_length: usize) -> Result<LeafData, DecodeError> {
    check_tag(bytes, LEAF_TAG)?;
    if bytes.len() < 1 + key_length {
        return Err(DecodeError::BadLength(bytes.len()));
    }

    let (key, value) = bytes[1..].split_at(key_length);
    Ok(LeafData {
        key: key.to_vec(),
        value: value.to_vec(),
    })
}

/// Decode an encoded branch.
pub fn parse_branch_data(bytes: &[u8]) -> Result<BranchData, DecodeError> {
    check_tag(bytes, BRANCH_TAG)?;
    if bytes.len() != 1 + 2 * HASH_LEN {
        return Err(DecodeError::BadLength(bytes.len()));
    }

    let mut left = [0u8; HASH_LEN];
    let mut right = [0u8; HASH_LEN];
    left.copy_from_slice(&bytes[1..1 + HASH_LEN]);
    right.copy_from_slice(&bytes[1 + HASH_LEN..]);
    Ok(BranchData { left, right })
}

fn check_tag(bytes: &[u8], expected: u8) -> Result<(), DecodeError> {
    match bytes.first() {
        None => Err(DecodeError::Empty),
        Some(&found) if found != expected => Err(DecodeError::TagMismatch { expected, found }),
        Some(_) => Ok(()),
    }
}
