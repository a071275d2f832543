//! Query records and the ordering rules shared by proof construction and verification.

use alloc::vec::Vec;
use bitvec::prelude::*;
use core::{cmp::Ordering, fmt};

use super::multi_proof::ProofVerificationError;
use crate::{bitmap::Bitmap, trie::NodeHash};

/// The record answering a single requested key within a [`Proof`].
///
/// For an inclusion proof, `key` and `value` are the requested entry. For an exclusion proof,
/// they are either a different leaf found on the requested key's path, or the requested key with
/// an empty value when the path ends in an empty sub-tree.
#[derive(Default, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub struct QueryProof {
    /// The key of the terminal.
    pub key: Vec<u8>,
    /// The value of the terminal, empty for the empty sub-tree.
    pub value: Vec<u8>,
    /// One bit per level from the terminal up to the root, deepest first.
    pub bitmap: Bitmap,
}

impl QueryProof {
    /// The depth at which this query resolved.
    pub fn height(&self) -> usize {
        self.bitmap.len()
    }

    /// Whether this query ends in the empty sub-tree.
    pub fn is_empty_terminal(&self) -> bool {
        self.value.is_empty()
    }

    /// The bits of the key path leading to this query's terminal.
    ///
    /// Panics if the bitmap is longer than the key path.
    pub fn resolved_path(&self) -> &BitSlice<u8, Msb0> {
        &self.key.view_bits::<Msb0>()[..self.height()]
    }
}

impl fmt::Debug for QueryProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryProof")
            .field("key", &hex::encode(&self.key))
            .field("value", &hex::encode(&self.value))
            .field("bitmap", &self.bitmap)
            .finish()
    }
}

/// A proof of the values of one or many keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshDeserialize, borsh::BorshSerialize)
)]
pub struct Proof {
    /// The explicit sibling hashes, in the order they are consumed while hashing up.
    pub sibling_hashes: Vec<NodeHash>,
    /// One query per requested key, in the order the keys were requested.
    pub queries: Vec<QueryProof>,
}

/// The order in which queries are hashed up: deeper queries first, and among queries at the same
/// depth, the smaller key first.
pub fn sort_by_bitmap_and_key(a: &QueryProof, b: &QueryProof) -> Ordering {
    query_order(a.height(), &a.key, b.height(), &b.key)
}

pub(super) fn query_order(
    a_height: usize,
    a_key: &[u8],
    b_height: usize,
    b_key: &[u8],
) -> Ordering {
    b_height.cmp(&a_height).then_with(|| a_key.cmp(b_key))
}

/// Whether two queries are siblings: they resolve at the same height, agree on every bit above
/// it, and differ on the last one. The hash of each is then the sibling of the other.
pub fn are_sibling_queries(a: &QueryProof, b: &QueryProof) -> bool {
    a.height() == b.height()
        && paths_are_siblings(
            a.key.view_bits::<Msb0>(),
            b.key.view_bits::<Msb0>(),
            a.height(),
        )
}

pub(super) fn paths_are_siblings(
    a: &BitSlice<u8, Msb0>,
    b: &BitSlice<u8, Msb0>,
    height: usize,
) -> bool {
    if height == 0 || a.len() < height || b.len() < height {
        return false;
    }
    a[..height - 1] == b[..height - 1] && a[height - 1] != b[height - 1]
}

pub(super) fn same_position(
    a: &BitSlice<u8, Msb0>,
    b: &BitSlice<u8, Msb0>,
    height: usize,
) -> bool {
    a.len() >= height && b.len() >= height && a[..height] == b[..height]
}

/// Collapse queries which resolve to the same position in the tree, keeping the first of each.
///
/// The result is sorted by [`sort_by_bitmap_and_key`]. Queries sharing a position must carry the
/// same terminal, otherwise this fails with [`ProofVerificationError::ConflictingQueries`].
/// Queries whose bitmap is longer than their key path are dropped.
pub fn filter_queries(
    queries: &[QueryProof],
) -> Result<Vec<&QueryProof>, ProofVerificationError> {
    let mut sorted: Vec<&QueryProof> = queries
        .iter()
        .filter(|q| q.height() <= q.key.len() * 8)
        .collect();
    sorted.sort_by(|a, b| sort_by_bitmap_and_key(a, b));

    let mut filtered: Vec<&QueryProof> = Vec::with_capacity(sorted.len());
    for query in sorted {
        match filtered.last() {
            Some(prev) if same_query_position(prev, query) => {
                if !same_terminal(prev, query) {
                    return Err(ProofVerificationError::ConflictingQueries);
                }
            }
            _ => filtered.push(query),
        }
    }
    Ok(filtered)
}

fn same_query_position(a: &QueryProof, b: &QueryProof) -> bool {
    a.height() == b.height()
        && same_position(
            a.key.view_bits::<Msb0>(),
            b.key.view_bits::<Msb0>(),
            a.height(),
        )
}

// every empty terminal hashes alike, whatever its key.
fn same_terminal(a: &QueryProof, b: &QueryProof) -> bool {
    (a.is_empty_terminal() && b.is_empty_terminal()) || (a.key == b.key && a.value == b.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn query(key: u8, bitmap: &str) -> QueryProof {
        QueryProof {
            key: vec![key],
            value: vec![1],
            bitmap: bitmap.parse().unwrap(),
        }
    }

    #[test]
    fn deeper_queries_sort_first() {
        let mut queries = vec![
            query(0b1000_0000, "1"),
            query(0b0110_0000, "111"),
            query(0b0100_0000, "111"),
            query(0b0000_0000, "11"),
        ];
        queries.sort_by(sort_by_bitmap_and_key);
        let keys: Vec<u8> = queries.iter().map(|q| q.key[0]).collect();
        assert_eq!(keys, vec![0b0100_0000, 0b0110_0000, 0b0000_0000, 0b1000_0000]);
    }

    #[test]
    fn siblings_differ_only_in_last_bit() {
        assert!(are_sibling_queries(
            &query(0b0100_0000, "111"),
            &query(0b0110_0000, "101"),
        ));
        // same position, not siblings.
        assert!(!are_sibling_queries(
            &query(0b0100_0000, "111"),
            &query(0b0101_0000, "111"),
        ));
        // differ above the last bit.
        assert!(!are_sibling_queries(
            &query(0b0100_0000, "111"),
            &query(0b1110_0000, "111"),
        ));
        // different heights.
        assert!(!are_sibling_queries(
            &query(0b0100_0000, "111"),
            &query(0b0110_0000, "11"),
        ));
        // the root has no sibling.
        assert!(!are_sibling_queries(&query(0, ""), &query(0xff, "")));
    }

    fn empty_slot(key: u8, bitmap: &str) -> QueryProof {
        QueryProof {
            value: vec![],
            ..query(key, bitmap)
        }
    }

    #[test]
    fn filter_collapses_same_position() {
        let queries = vec![
            empty_slot(0b0100_0000, "111"),
            empty_slot(0b0101_1111, "111"),
            query(0b0110_0000, "111"),
            query(0b0110_0000, "111"),
            query(0b0100_0000, "11"),
        ];
        let filtered = filter_queries(&queries).unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0].key, vec![0b0100_0000]);
        assert_eq!(filtered[1].key, vec![0b0110_0000]);
        assert_eq!(filtered[2].height(), 2);
    }

    #[test]
    fn filter_rejects_two_terminals_at_one_position() {
        // two different leaves cannot share a position.
        let queries = vec![query(0b0100_0000, "111"), query(0b0101_1111, "111")];
        assert_eq!(
            filter_queries(&queries),
            Err(ProofVerificationError::ConflictingQueries)
        );

        // nor can a leaf and the empty sub-tree.
        let queries = vec![query(0b0100_0000, "111"), empty_slot(0b0101_1111, "111")];
        assert_eq!(
            filter_queries(&queries),
            Err(ProofVerificationError::ConflictingQueries)
        );
    }

    #[test]
    fn resolved_path_is_bitmap_long() {
        let q = query(0b1010_0000, "101");
        assert_eq!(q.resolved_path().len(), 3);
        assert!(q.resolved_path()[0]);
        assert!(!q.resolved_path()[1]);
    }
}
