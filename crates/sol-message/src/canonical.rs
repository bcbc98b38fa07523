//! Canonical ordering and deduplication of account keys.
//!
//! The encode path accumulates per-address privileges across every
//! instruction (the fee payer is forced writable-signer, program ids are
//! recorded read-only unless also used as data keys) and partitions the
//! result into four buckets: writable signers, read-only signers, writable
//! non-signers, read-only non-signers. The decode path reconstructs each
//! key's privileges from the three header counts alone.
//!
//! The exact order within a bucket follows encounter order and is an
//! implementation detail: two logically-equal messages may serialize to
//! different bytes. Byte-exact round-trips are only guaranteed on the raw
//! message form.

use sol_keys::Address;

use crate::account::{AddressRef, Instruction};
use crate::error::TxError;

/// The three privilege counts carried at the front of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub required_signatures: u8,
    pub readonly_signed: u8,
    pub readonly_unsigned: u8,
}

/// One entry of the canonical static key list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticKey {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Order and deduplicate every literal address the instructions reference.
///
/// The fee payer is always index 0. Lookup references are ignored here (the
/// message codec sections them separately), but a lookup reference marked as
/// a signer is rejected: tables cannot hold signing authority.
pub fn canonicalize(
    fee_payer: &Address,
    instructions: &[Instruction],
) -> Result<(Vec<StaticKey>, MessageHeader), TxError> {
    let mut entries: Vec<StaticKey> = Vec::new();

    // Upsert with privilege OR, keeping first-encounter order.
    fn upsert(entries: &mut Vec<StaticKey>, address: Address, signer: bool, writable: bool) {
        if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(StaticKey {
                address,
                is_signer: signer,
                is_writable: writable,
            });
        }
    }

    upsert(&mut entries, *fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            match meta.address {
                AddressRef::Literal(address) => {
                    upsert(&mut entries, address, meta.is_signer, meta.is_writable)
                }
                AddressRef::Lookup { table, index } => {
                    if meta.is_signer {
                        return Err(TxError::Value(format!(
                            "signer behind lookup table {table}:{index}"
                        )));
                    }
                }
            }
        }
        // Program ids are non-signer read-only; an address used both as a
        // program and as a data key keeps its data-key privilege.
        upsert(&mut entries, ix.program, false, false);
    }

    // Stable sort keeps encounter order within a bucket; the fee payer's
    // bucket is the first, so it stays at index 0.
    entries[1..].sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > 256 {
        return Err(TxError::Value(format!(
            "{} account keys exceed the 256-key limit",
            entries.len()
        )));
    }

    let required = entries.iter().filter(|e| e.is_signer).count() as u8;
    let readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    Ok((
        entries,
        MessageHeader {
            required_signatures: required,
            readonly_signed,
            readonly_unsigned,
        },
    ))
}

/// The decode-direction inverse: privileges of the key at position `i` in a
/// `total`-key list, given the header counts.
pub fn privileges(header: &MessageHeader, total: usize, i: usize) -> (bool, bool) {
    let required = header.required_signatures as usize;
    let readonly_signed = header.readonly_signed as usize;
    let readonly_unsigned = header.readonly_unsigned as usize;

    let is_signer = i < required;
    let is_writable = i < required.saturating_sub(readonly_signed)
        || (required <= i && i < total.saturating_sub(readonly_unsigned));
    (is_signer, is_writable)
}
