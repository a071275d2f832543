//! Hashers (feature-gated) and utilities for implementing them.

use crate::trie::{BranchData, NodeHash, BRANCH_TAG, LEAF_TAG};

/// A tree node hash function.
///
/// A node hasher must domain-separate leaf and branch preimages. The [`BinaryHasher`] does so by
/// hashing the tagged encodings of [`crate::trie`].
pub trait NodeHasher {
    /// Hash a leaf carrying `key` and `value`.
    fn hash_leaf(key: &[u8], value: &[u8]) -> NodeHash;

    /// Hash a branch node.
    fn hash_branch(data: &BranchData) -> NodeHash;

    /// The hash standing in for an empty sub-tree at any height.
    fn empty() -> NodeHash;

    /// Hash a query terminal: a leaf when `value` is non-empty, otherwise the empty sub-tree.
    fn hash_terminal(key: &[u8], value: &[u8]) -> NodeHash {
        if value.is_empty() {
            Self::empty()
        } else {
            Self::hash_leaf(key, value)
        }
    }
}

/// A simple trait for representing binary hash functions.
pub trait BinaryHash {
    /// Given a bit-string, produce a 32-byte hash.
    fn hash(input: &[u8]) -> [u8; 32];

    /// An optional specialization of `hash` over the concatenation of several parts.
    fn hash_concat(parts: &[&[u8]]) -> [u8; 32] {
        let len = parts.iter().map(|p| p.len()).sum();
        let mut buf = alloc::vec::Vec::with_capacity(len);
        for part in parts {
            buf.extend_from_slice(part);
        }
        Self::hash(&buf)
    }
}

/// A node hasher constructed from a simple binary hasher.
///
/// Node hashes are `hash(encode(node))` with the tagged encodings of [`crate::trie`], and the empty
/// sub-tree is the hash of the empty string.
///
/// Functions like Sha2/Blake3/Keccak all meet the requirements of the wrapped hash.
pub struct BinaryHasher<H>(core::marker::PhantomData<H>);

impl<H: BinaryHash> NodeHasher for BinaryHasher<H> {
    fn hash_leaf(key: &[u8], value: &[u8]) -> NodeHash {
        H::hash_concat(&[&[LEAF_TAG], key, value])
    }

    fn hash_branch(data: &BranchData) -> NodeHash {
        H::hash_concat(&[&[BRANCH_TAG], &data.left, &data.right])
    }

    fn empty() -> NodeHash {
        H::hash(&[])
    }
}

/// Hash an encoded node with the given binary hash.
pub fn node_hash<H: BinaryHash>(encoded: &[u8]) -> NodeHash {
    H::hash(encoded)
}

#[cfg(feature = "blake3-hasher")]
pub use self::blake3::Blake3Hasher;

/// A node hasher making use of blake3.
#[cfg(feature = "blake3-hasher")]
pub mod blake3 {
    use super::{BinaryHash, BinaryHasher};

    /// A [`BinaryHash`] implementation for Blake3.
    pub struct Blake3BinaryHasher;

    /// A wrapper around Blake3 for use in the tree.
    pub type Blake3Hasher = BinaryHasher<Blake3BinaryHasher>;

    impl BinaryHash for Blake3BinaryHasher {
        fn hash(value: &[u8]) -> [u8; 32] {
            blake3::hash(value).into()
        }

        fn hash_concat(parts: &[&[u8]]) -> [u8; 32] {
            let mut hasher = blake3::Hasher::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().into()
        }
    }
}

#[cfg(feature = "sha2-hasher")]
pub use self::sha2::Sha2Hasher;

/// A node hasher making use of sha2-256.
#[cfg(feature = "sha2-hasher")]
pub mod sha2 {
    use super::{BinaryHash, BinaryHasher};
    use sha2::{Digest, Sha256};

    /// A [`BinaryHash`] implementation for Sha2.
    pub struct Sha2BinaryHasher;

    /// A wrapper around sha2-256 for use in the tree.
    pub type Sha2Hasher = BinaryHasher<Sha2BinaryHasher>;

    impl BinaryHash for Sha2BinaryHasher {
        fn hash(value: &[u8]) -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(value);
            hasher.finalize().into()
        }

        fn hash_concat(parts: &[&[u8]]) -> [u8; 32] {
            let mut hasher = Sha256::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().into()
        }
    }
}
