//! Hashing queries up to the root, and verifying proofs against an expected root.

use alloc::{
    collections::{BTreeSet, VecDeque},
    vec::Vec,
};
use bitvec::prelude::*;
use core::fmt;

use super::query::{
    filter_queries, paths_are_siblings, query_order, same_position, Proof, QueryProof,
};
use crate::{
    hasher::NodeHasher,
    trie::{BranchData, NodeHash},
};

/// Errors in proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofVerificationError {
    /// The proof contains no queries.
    EmptyProof,
    /// The number of requested keys differs from the number of queries in the proof.
    QueryCountMismatch,
    /// A query carries a key of the wrong length.
    KeyLengthMismatch,
    /// A query's bitmap is longer than the key path.
    BitmapTooLong,
    /// A bitmap asked for more sibling hashes than were provided.
    NotEnoughSiblings,
    /// Extra sibling hashes were provided.
    TooManySiblings,
    /// Two queries reached the same position in the tree with different hashes.
    ConflictingQueries,
    /// Root hash mismatched at the end of the verification.
    RootMismatch,
}

impl fmt::Display for ProofVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ProofVerificationError::EmptyProof => "proof has no queries",
            ProofVerificationError::QueryCountMismatch => "query count mismatch",
            ProofVerificationError::KeyLengthMismatch => "query key has the wrong length",
            ProofVerificationError::BitmapTooLong => "query bitmap longer than key path",
            ProofVerificationError::NotEnoughSiblings => "not enough sibling hashes",
            ProofVerificationError::TooManySiblings => "too many sibling hashes",
            ProofVerificationError::ConflictingQueries => "conflicting queries",
            ProofVerificationError::RootMismatch => "root mismatch",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProofVerificationError {}

/// The key is not covered by any query of the proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutOfScope;

impl fmt::Display for KeyOutOfScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key out of scope of proof")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KeyOutOfScope {}

// A query on its way up to the root. `bitmap` holds the levels not yet hashed, so its length is
// the current height.
struct Pending<'a> {
    key: &'a [u8],
    path: &'a BitSlice<u8, Msb0>,
    bitmap: &'a BitSlice<u8, Msb0>,
    hash: NodeHash,
}

impl Pending<'_> {
    fn height(&self) -> usize {
        self.bitmap.len()
    }

    fn order(&self, other: &Pending<'_>) -> core::cmp::Ordering {
        query_order(self.height(), self.key, other.height(), other.key)
    }

    fn same_position(&self, other: &Pending<'_>) -> bool {
        self.height() == other.height() && same_position(self.path, other.path, self.height())
    }

    fn is_sibling_of(&self, other: &Pending<'_>) -> bool {
        self.height() == other.height() && paths_are_siblings(self.path, other.path, self.height())
    }
}

// Insert keeping the queue sorted. A query landing on an occupied position is dropped if it
// agrees with the occupant.
fn insert_pending<'a>(
    queue: &mut VecDeque<Pending<'a>>,
    pending: Pending<'a>,
) -> Result<(), ProofVerificationError> {
    let idx = match queue.binary_search_by(|other| other.order(&pending)) {
        Ok(idx) | Err(idx) => idx,
    };

    let neighbors = [idx.checked_sub(1), Some(idx)];
    for other in neighbors.into_iter().flatten().filter_map(|i| queue.get(i)) {
        if other.same_position(&pending) {
            return if other.hash == pending.hash {
                Ok(())
            } else {
                Err(ProofVerificationError::ConflictingQueries)
            };
        }
    }

    queue.insert(idx, pending);
    Ok(())
}

/// Hash a set of queries up to the root.
///
/// Queries are processed deepest first, smaller key first among equals. At every level, the
/// sibling of a query is taken from:
///   1. the next query in order, if the two are siblings. Both merge into one.
///   2. `next_sibling`, if the query's bitmap bit for the level is set. It is called with the
///      query's key path and current height, and returns `None` when no sibling is available.
///   3. the empty sub-tree otherwise.
///
/// The order of calls to `next_sibling` is the order in which a proof lists its sibling hashes.
/// Queries resolving to the same position are collapsed.
pub fn hash_up<H: NodeHasher>(
    queries: &[QueryProof],
    key_length: usize,
    mut next_sibling: impl FnMut(&BitSlice<u8, Msb0>, usize) -> Option<NodeHash>,
) -> Result<NodeHash, ProofVerificationError> {
    if queries.is_empty() {
        return Err(ProofVerificationError::EmptyProof);
    }

    for query in queries {
        if query.key.len() != key_length {
            return Err(ProofVerificationError::KeyLengthMismatch);
        }
        if query.bitmap.len() > key_length * 8 {
            return Err(ProofVerificationError::BitmapTooLong);
        }
    }

    // sorted and collapsed already, so the queue starts in order.
    let mut queue: VecDeque<Pending> = filter_queries(queries)?
        .into_iter()
        .map(|query| Pending {
            key: &query.key,
            path: query.key.view_bits::<Msb0>(),
            bitmap: query.bitmap.as_bitslice(),
            hash: H::hash_terminal(&query.key, &query.value),
        })
        .collect();

    while let Some(mut current) = queue.pop_front() {
        let height = current.height();
        if height == 0 {
            return if queue.is_empty() {
                Ok(current.hash)
            } else {
                Err(ProofVerificationError::ConflictingQueries)
            };
        }

        let sibling = if queue.front().map_or(false, |next| current.is_sibling_of(next)) {
            // UNWRAP: just checked.
            queue.pop_front().unwrap().hash
        } else if current.bitmap[0] {
            next_sibling(current.path, height).ok_or(ProofVerificationError::NotEnoughSiblings)?
        } else {
            H::empty()
        };

        let bit = current.path[height - 1];
        current.hash = H::hash_branch(&BranchData::from_child(bit, current.hash, sibling));
        current.bitmap = &current.bitmap[1..];
        insert_pending(&mut queue, current)?;
    }

    // the queue only empties through the return at height 0.
    Err(ProofVerificationError::EmptyProof)
}

/// Calculate the root implied by a set of queries and the sibling hashes they consume.
///
/// All sibling hashes must be consumed.
pub fn calculate_root<H: NodeHasher>(
    sibling_hashes: &[NodeHash],
    queries: &[QueryProof],
    key_length: usize,
) -> Result<NodeHash, ProofVerificationError> {
    let mut siblings = sibling_hashes.iter();
    let root = hash_up::<H>(queries, key_length, |_, _| siblings.next().copied())?;

    if siblings.next().is_some() {
        return Err(ProofVerificationError::TooManySiblings);
    }

    Ok(root)
}

/// Verify a proof for the given requested keys against an expected root.
///
/// The number of requested keys must equal the number of queries. Note that a query's key is not
/// required to equal the requested key: an exclusion proof carries the leaf actually found on the
/// requested key's path. Use [`verify_proof`] and the checks of [`VerifiedProof`] to confirm what
/// the proof says about a specific key.
///
/// The key of an empty-terminal query is not hashed, so only its first `bitmap.len()` bits are
/// bound by the root. Changing the bits below the resolved position still verifies.
pub fn verify<H: NodeHasher>(
    query_keys: &[impl AsRef<[u8]>],
    proof: &Proof,
    root: &NodeHash,
    key_length: usize,
) -> bool {
    verify_proof::<H>(query_keys, proof, root, key_length).is_ok()
}

/// Verify a proof for the given requested keys against an expected root, returning a
/// [`VerifiedProof`] on success.
pub fn verify_proof<H: NodeHasher>(
    query_keys: &[impl AsRef<[u8]>],
    proof: &Proof,
    root: &NodeHash,
    key_length: usize,
) -> Result<VerifiedProof, ProofVerificationError> {
    if query_keys.len() != proof.queries.len() {
        return Err(ProofVerificationError::QueryCountMismatch);
    }

    // each distinct position answers at least one distinct requested key.
    let distinct_keys: BTreeSet<&[u8]> = query_keys.iter().map(|key| key.as_ref()).collect();
    if filter_queries(&proof.queries)?.len() > distinct_keys.len() {
        return Err(ProofVerificationError::QueryCountMismatch);
    }

    let calculated = calculate_root::<H>(&proof.sibling_hashes, &proof.queries, key_length)?;
    if &calculated != root {
        return Err(ProofVerificationError::RootMismatch);
    }

    Ok(VerifiedProof {
        queries: proof.queries.clone(),
        root: calculated,
    })
}

/// A verified proof.
///
/// Each query can be used to check up to two kinds of statements:
///   1. That a single key has a specific value.
///   2. That a key does not have a value.
///
/// Statement (1) is true when the query's terminal is a leaf with the key and value.
///
/// Statement (2) is true for any key whose path passes through the query's resolved position,
/// where the terminal is either the empty sub-tree or a leaf for a different key.
#[derive(Debug, Clone)]
pub struct VerifiedProof {
    queries: Vec<QueryProof>,
    root: NodeHash,
}

impl VerifiedProof {
    /// The root this proof was verified against.
    pub fn root(&self) -> NodeHash {
        self.root
    }

    /// The verified queries.
    pub fn queries(&self) -> &[QueryProof] {
        &self.queries
    }

    /// Find the index of the query, if any, which proves the value of the given key.
    ///
    /// A query carrying exactly this key is preferred. Otherwise, the first query whose resolved
    /// path is a prefix of the key's path is returned.
    ///
    /// Runtime is O(n) in the number of queries.
    pub fn find_index_for(&self, key: &[u8]) -> Result<usize, KeyOutOfScope> {
        if let Some(idx) = self.queries.iter().position(|q| q.key == key) {
            return Ok(idx);
        }

        self.queries
            .iter()
            .position(|q| in_scope(q, key))
            .ok_or(KeyOutOfScope)
    }

    /// Check whether this proves that a key has no value in the tree.
    ///
    /// A return value of `Ok(true)` confirms that the key indeed has no value in the tree.
    /// A return value of `Ok(false)` means that the key definitely exists within the tree.
    ///
    /// Fails if the key is out of the scope of this proof.
    pub fn confirm_nonexistence(&self, key: &[u8]) -> Result<bool, KeyOutOfScope> {
        let index = self.find_index_for(key)?;
        let query = &self.queries[index];
        Ok(query.is_empty_terminal() || query.key != key)
    }

    /// Check whether this proves that a key has the given value.
    ///
    /// A return value of `Ok(true)` confirms that this key indeed has this value in the tree.
    /// A return value of `Ok(false)` means that this key has a different value or does not exist.
    ///
    /// Fails if the key is out of the scope of this proof.
    pub fn confirm_value(&self, key: &[u8], value: &[u8]) -> Result<bool, KeyOutOfScope> {
        let index = self.find_index_for(key)?;
        let query = &self.queries[index];
        Ok(!query.is_empty_terminal() && query.key == key && query.value == value)
    }
}

fn in_scope(query: &QueryProof, key: &[u8]) -> bool {
    key.len() == query.key.len()
        && query.height() <= key.len() * 8
        && same_position(
            query.key.view_bits::<Msb0>(),
            key.view_bits::<Msb0>(),
            query.height(),
        )
}
