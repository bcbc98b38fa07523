//! Solana addresses and program-derived-address (PDA) search.
//!
//! An address is a Base58-encoded 32-byte value — usually an Ed25519 public
//! key, or for PDAs a SHA-256 digest deliberately chosen to sit off the
//! signing curve so no private key can ever control it.

pub mod address;
pub mod curve;
pub mod error;
pub mod pda;

// Re-export key public types for ergonomic imports.
pub use address::{Address, Hash};
pub use curve::is_on_curve;
pub use error::KeyError;
pub use pda::{derive_address, find_program_address, try_create_program_address};
