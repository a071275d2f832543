//! Core operations and types of a sparse merkle tree with compact multi-proofs.
//!
//! This crate defines the schema of the tree (node encodings, key paths, bitmaps) and the
//! stateless half of the proof system: calculating a root from a proof and verifying it. Building
//! and mutating a tree is the job of a backend holding the nodes.
//!
//! The core types and proof verification routines of this crate do not require the
//! standard library, but do require Rust's alloc crate.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

pub mod bitmap;
pub mod hasher;
pub mod key_path;
pub mod proof;
pub mod trie;

pub use bitmap::Bitmap;
