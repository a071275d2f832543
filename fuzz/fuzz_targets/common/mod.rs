#![allow(dead_code)]

use arbitrary::Arbitrary;
use bitvec::{order::Msb0, view::BitView};
use smt::{
    proof::{Proof, QueryProof},
    Bitmap,
};

/// Two keys sharing exactly `prefix_bit_len` leading bits.
#[derive(Debug)]
pub struct Run {
    pub prefix_bit_len: usize,
    pub a: [u8; 32],
    pub b: [u8; 32],
}

impl<'a> Arbitrary<'a> for Run {
    fn arbitrary(input: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let prefix_bit_len = input.int_in_range(0..=256)?;
        let mut a = [0; 32];
        let mut b = [0; 32];
        input.fill_buffer(&mut a)?;
        input.fill_buffer(&mut b)?;
        b.view_bits_mut::<Msb0>()[0..prefix_bit_len]
            .copy_from_bitslice(&a.view_bits::<Msb0>()[0..prefix_bit_len]);
        if prefix_bit_len < 256 {
            let flipped = !a.view_bits::<Msb0>()[prefix_bit_len];
            b.view_bits_mut::<Msb0>().set(prefix_bit_len, flipped);
        }

        Ok(Self {
            prefix_bit_len,
            a,
            b,
        })
    }
}

/// A proof built from raw fuzzer input, with no guarantee of consistency.
#[derive(Debug)]
pub struct UntrustedProof {
    pub key_length: usize,
    pub query_keys: Vec<Vec<u8>>,
    pub proof: Proof,
    pub root: [u8; 32],
}

impl<'a> Arbitrary<'a> for UntrustedProof {
    fn arbitrary(input: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let key_length = input.int_in_range(1..=4)?;

        let mut queries = Vec::new();
        for _ in 0..input.int_in_range(0..=8)? {
            // mostly well-formed keys and bitmaps, sometimes not.
            let key_len = if input.ratio(1, 8)? {
                input.int_in_range(0..=5)?
            } else {
                key_length
            };
            let mut key = vec![0; key_len];
            input.fill_buffer(&mut key)?;

            let value_len = input.int_in_range(0..=4)?;
            let mut value = vec![0; value_len];
            input.fill_buffer(&mut value)?;

            let bits: Vec<bool> = (0..input.int_in_range(0..=key_length * 8 + 1)?)
                .map(|_| input.arbitrary())
                .collect::<arbitrary::Result<_>>()?;
            let bitmap = Bitmap::from_root_first(bits.into_iter());

            queries.push(QueryProof { key, value, bitmap });
        }

        let sibling_hashes = input.arbitrary::<Vec<[u8; 32]>>()?;
        let query_keys = (0..queries.len() + usize::from(input.ratio(1, 8)?))
            .map(|_| input.arbitrary::<Vec<u8>>())
            .collect::<arbitrary::Result<_>>()?;

        Ok(Self {
            key_length,
            query_keys,
            proof: Proof {
                sibling_hashes,
                queries,
            },
            root: input.arbitrary()?,
        })
    }
}

/// An operation on a tree with two-byte keys.
#[derive(Debug, Arbitrary)]
pub enum Op {
    Update { key: [u8; 2], value: Vec<u8> },
    Remove { key: [u8; 2] },
    Prove { keys: Vec<[u8; 2]> },
}
