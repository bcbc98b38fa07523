//! Solana transaction and message wire codec.
//!
//! Callers build typed [`Instruction`] lists and a fee payer; the
//! canonicalizer deduplicates and orders account keys by privilege, the
//! message codec serializes the legacy or versioned wire layout (including
//! address-lookup-table compression), and the transaction codec wraps the
//! result in signature slots. Decoding runs the inverse and restores per-key
//! privileges from the message header.
//!
//! The wire format is built entirely by hand — no `solana-sdk` dependency.

pub mod account;
pub mod canonical;
pub mod error;
pub mod lookup;
pub mod message;
pub mod registry;
pub mod system;
pub mod token;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use account::{AccountMeta, AddressRef, Instruction};
pub use canonical::{canonicalize, privileges, MessageHeader, StaticKey};
pub use error::TxError;
pub use lookup::{compress, resolve, LookupTable};
pub use message::{Message, RawInstruction, RawLookup, RawMessage, Version};
pub use registry::ProgramRegistry;
pub use transaction::{Transaction, PACKET_DATA_SIZE};
