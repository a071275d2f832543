#![no_main]

mod common;

use bitvec::{order::Msb0, view::BitView};
use common::Run;
use libfuzzer_sys::fuzz_target;
use smt::key_path::{overlapping_bits, shared_bits};

fuzz_target!(|run: Run| {
    let Run {
        prefix_bit_len,
        a,
        b,
    } = run;

    let a = a.view_bits::<Msb0>();
    let b = b.view_bits::<Msb0>();
    assert_eq!(prefix_bit_len, shared_bits(a, b));
    assert_eq!(overlapping_bits(a, b), &a[..prefix_bit_len]);
});
