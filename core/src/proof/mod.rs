//! Tree proofs and proof verification.
//!
//! The sparse merkle tree is an authenticated data structure, which means that it permits
//! efficient proving against the root. This module exposes the types and functions needed to
//! handle these proofs without access to the tree itself.
//!
//! A [`Proof`] covers one or many keys. Each requested key is answered by a [`QueryProof`]
//! carrying the terminal found along the key's path (a leaf, or the empty sub-tree) and a
//! [`Bitmap`](crate::Bitmap) telling which levels above it consume an explicit sibling hash.
//! Siblings shared by several queries are supplied only once, and siblings that are themselves
//! derived from other queries are not supplied at all.
//!
//! Proof construction and verification hash queries up towards the root in the same order,
//! defined by [`sort_by_bitmap_and_key`], so that the order of sibling hashes is implied.

pub use multi_proof::{
    calculate_root, hash_up, verify, verify as verify_multi_proof, verify_proof, KeyOutOfScope,
    ProofVerificationError, VerifiedProof,
};
pub use query::{
    are_sibling_queries, filter_queries, sort_by_bitmap_and_key, Proof, QueryProof,
};

mod multi_proof;
mod query;
