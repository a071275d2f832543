//! Query bitmaps.
//!
//! A bitmap carries one bit per tree level between a query's resolved position and the root. The
//! first bit belongs to the deepest level. A set bit means the sibling at that level is supplied
//! explicitly in the proof; an unset bit means the sibling is the empty sub-tree.
//!
//! The length of the bitmap is the depth at which the query resolved, so it is carried alongside
//! the packed bytes.

use alloc::{string::String, vec::Vec};
use bitvec::prelude::*;
use core::{fmt, str::FromStr};

use crate::key_path::{self, InvalidBinaryString};

/// A bit string with its true length.
#[derive(Default, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap(BitVec<u8, Msb0>);

impl Bitmap {
    /// Create an empty bitmap, i.e. one for a query resolved at the root.
    pub fn new() -> Self {
        Bitmap(BitVec::new())
    }

    /// Build a bitmap from levels given root-first. The result is ordered deepest-first.
    pub fn from_root_first(levels: impl DoubleEndedIterator<Item = bool>) -> Self {
        Bitmap(levels.rev().collect())
    }

    /// Decode a bitmap from left-padded bytes and its bit length.
    pub fn from_bytes(bytes: &[u8], bit_len: usize) -> Result<Self, InvalidBinaryString> {
        key_path::bytes_to_bits(bytes, bit_len).map(Bitmap)
    }

    /// Encode the bitmap as left-padded big-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        key_path::bits_to_bytes(&self.0)
    }

    /// The number of levels covered, equal to the depth at which the query resolved.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the query resolved at the root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The bit for the level `i` steps above the resolved position.
    pub fn get(&self, i: usize) -> Option<bool> {
        self.0.get(i).map(|b| *b)
    }

    /// The number of explicit siblings this bitmap consumes.
    pub fn set_bits(&self) -> usize {
        self.0.count_ones()
    }

    /// The bits, deepest level first.
    pub fn as_bitslice(&self) -> &BitSlice<u8, Msb0> {
        &self.0
    }
}

impl FromStr for Bitmap {
    type Err = InvalidBinaryString;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(InvalidBinaryString),
            })
            .collect::<Result<BitVec<u8, Msb0>, _>>()
            .map(Bitmap)
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self
            .0
            .iter()
            .by_vals()
            .map(|b| if b { '1' } else { '0' })
            .collect();
        f.write_str(&s)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({self})")
    }
}

#[cfg(feature = "borsh")]
impl borsh::BorshSerialize for Bitmap {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> borsh::io::Result<()> {
        let len = u16::try_from(self.len()).map_err(|_| {
            borsh::io::Error::new(borsh::io::ErrorKind::InvalidData, "bitmap too long")
        })?;
        borsh::BorshSerialize::serialize(&len, writer)?;
        writer.write_all(&self.to_bytes())
    }
}

#[cfg(feature = "borsh")]
impl borsh::BorshDeserialize for Bitmap {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Self> {
        let len = <u16 as borsh::BorshDeserialize>::deserialize_reader(reader)? as usize;
        let mut bytes = alloc::vec![0u8; (len + 7) / 8];
        reader.read_exact(&mut bytes)?;
        Bitmap::from_bytes(&bytes, len).map_err(|_| {
            borsh::io::Error::new(borsh::io::ErrorKind::InvalidData, "bitmap padding bits set")
        })
    }
}
