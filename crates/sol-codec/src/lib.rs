//! Descriptor-driven binary codec for Solana program ABIs.
//!
//! Program instruction and account layouts are described as [`TypeNode`]
//! trees (numbers, strings, tuples, structs, enums, options, maps, offset
//! adjustments, constants). [`Codec::new`] compiles a tree into a paired
//! encode/decode function over [`Value`], satisfying the round-trip contract
//! `decode(encode(v)) == v` for every value the tree accepts.
//!
//! The crate also carries the wire primitives the message layer builds on:
//! the compact-length ("shortvec") integer encoding and bounds-checked
//! byte cursors.

pub mod codec;
pub mod cursor;
pub mod error;
pub mod node;
pub mod shortvec;
pub mod value;

// Re-export key public types for ergonomic imports.
pub use codec::Codec;
pub use cursor::{Reader, Writer};
pub use error::CodecError;
pub use node::{Adjust, Count, Endian, Field, IntWidth, Len, TypeNode, Variant, VariantShape};
pub use shortvec::{decode_shortvec, encode_shortvec};
pub use value::Value;
