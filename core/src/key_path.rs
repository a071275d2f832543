//! Key paths: the bit-level view of keys used to navigate the tree, and conversions between
//! binary strings and bytes.

use alloc::{string::String, vec::Vec};
use bitvec::prelude::*;
use core::fmt;

/// A view of a key as a path of bits, most significant bit first.
pub type KeyPath = BitSlice<u8, Msb0>;

/// Expand a key into its bit path of exactly `8 * key_length` bits.
///
/// Panics if the key is not `key_length` bytes long.
pub fn binary_expansion(key: &[u8], key_length: usize) -> &KeyPath {
    assert_eq!(
        key.len(),
        key_length,
        "key of {} bytes, expected {key_length}",
        key.len()
    );
    key.view_bits::<Msb0>()
}

/// The number of leading bits shared by two bit paths.
pub fn shared_bits(a: &BitSlice<u8, Msb0>, b: &BitSlice<u8, Msb0>) -> usize {
    a.iter().zip(b.iter()).take_while(|(a, b)| a == b).count()
}

/// The longest common prefix of two sequences. This is empty if they differ in their first
/// element, and never longer than the shorter of the two.
pub fn overlapping_prefix<'a, T: PartialEq>(a: &'a [T], b: &[T]) -> &'a [T] {
    let len = a.iter().zip(b.iter()).take_while(|(a, b)| a == b).count();
    &a[..len]
}

/// The longest common prefix of two bit paths. Its length is the depth at which the paths
/// diverge.
pub fn overlapping_bits<'a>(
    a: &'a BitSlice<u8, Msb0>,
    b: &BitSlice<u8, Msb0>,
) -> &'a BitSlice<u8, Msb0> {
    &a[..shared_bits(a, b)]
}

/// A string contained characters other than `0` and `1`, or did not fit the requested length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBinaryString;

impl fmt::Display for InvalidBinaryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid binary string")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidBinaryString {}

/// Convert a string of `0`s and `1`s into bytes.
///
/// The string is read as a big-endian binary numeral and left-padded with zero bits to a whole
/// number of bytes, e.g. `"101"` becomes `[0x05]` and `"100000000"` becomes `[0x01, 0x00]`.
pub fn binary_string_to_bytes(s: &str) -> Result<Vec<u8>, InvalidBinaryString> {
    let mut bits = BitVec::<u8, Msb0>::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '0' => bits.push(false),
            '1' => bits.push(true),
            _ => return Err(InvalidBinaryString),
        }
    }
    Ok(bits_to_bytes(&bits))
}

/// Convert bytes back into a string of `bit_len` binary digits.
///
/// This is the inverse of [`binary_string_to_bytes`] when given the original string length. The
/// padding bits above `bit_len` must be zero.
pub fn bytes_to_binary_string(bytes: &[u8], bit_len: usize) -> Result<String, InvalidBinaryString> {
    let bits = bytes_to_bits(bytes, bit_len)?;
    Ok(bits.iter().by_vals().map(|b| if b { '1' } else { '0' }).collect())
}

/// Pack bits into bytes, left-padding with zero bits to a multiple of 8.
pub fn bits_to_bytes(bits: &BitSlice<u8, Msb0>) -> Vec<u8> {
    let byte_len = (bits.len() + 7) / 8;
    let mut bytes = alloc::vec![0u8; byte_len];
    let pad = byte_len * 8 - bits.len();
    bytes.view_bits_mut::<Msb0>()[pad..].copy_from_bitslice(bits);
    bytes
}

/// Unpack `bit_len` bits from left-padded bytes. Fails if the byte length does not match the bit
/// length or a padding bit is set.
pub fn bytes_to_bits(bytes: &[u8], bit_len: usize) -> Result<BitVec<u8, Msb0>, InvalidBinaryString> {
    if bytes.len() != (bit_len + 7) / 8 {
        return Err(InvalidBinaryString);
    }

    let view = bytes.view_bits::<Msb0>();
    let pad = view.len() - bit_len;
    if view[..pad].any() {
        return Err(InvalidBinaryString);
    }

    Ok(view[pad..].to_bitvec())
}
