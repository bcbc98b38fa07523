//! Address-lookup-table resolution and compression.
//!
//! Table contents live on the ledger and are supplied by the caller; the
//! transaction only carries table addresses plus indexes. `resolve` turns
//! lookup references back into literal addresses, `compress` rewrites
//! eligible literal addresses into references to shrink the on-wire key
//! list. The fee payer, signers and program ids are never compressed:
//! lookup tables cannot hold signing authority and cannot supply program
//! ids.

use sol_keys::Address;

use crate::account::AddressRef;
use crate::error::TxError;
use crate::message::Message;

/// One lookup table's on-ledger contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub address: Address,
    pub entries: Vec<Address>,
}

/// Replace every lookup reference with the literal address the tables hold.
///
/// Every reference in a message is dereferenced by an instruction, so an
/// unknown table or out-of-range index is always fatal.
pub fn resolve(message: &Message, tables: &[LookupTable]) -> Result<Message, TxError> {
    let mut resolved = message.clone();
    for ix in &mut resolved.instructions {
        for meta in &mut ix.accounts {
            let AddressRef::Lookup { table, index } = meta.address else {
                continue;
            };
            let contents = tables
                .iter()
                .find(|t| t.address == table)
                .ok_or_else(|| TxError::UnknownLookup(format!("table {table} not supplied")))?;
            let address = contents.entries.get(index as usize).ok_or_else(|| {
                TxError::UnknownLookup(format!(
                    "table {table} has no entry {index} (len {})",
                    contents.entries.len()
                ))
            })?;
            meta.address = AddressRef::Literal(*address);
        }
    }
    Ok(resolved)
}

/// Rewrite eligible literal addresses into lookup references, preferring the
/// earliest supplied table that contains the address.
///
/// Protected from compression: the fee payer, every signer, and every
/// program id. The result is a versioned message (the lookup section only
/// exists in versioned framing).
pub fn compress(message: &Message, tables: &[LookupTable]) -> Result<Message, TxError> {
    let mut protected: Vec<Address> = vec![message.fee_payer];
    for ix in &message.instructions {
        protected.push(ix.program);
        for meta in &ix.accounts {
            if meta.is_signer {
                if let AddressRef::Literal(address) = meta.address {
                    protected.push(address);
                }
            }
        }
    }

    let locate = |address: &Address| -> Option<(Address, u8)> {
        for table in tables {
            if let Some(pos) = table.entries.iter().position(|e| e == address) {
                // Table entries index with u8 on the wire.
                if let Ok(index) = u8::try_from(pos) {
                    return Some((table.address, index));
                }
            }
        }
        None
    };

    let mut compressed = message.clone();
    compressed.version = crate::message::Version::Number(0);
    for ix in &mut compressed.instructions {
        for meta in &mut ix.accounts {
            let AddressRef::Literal(address) = meta.address else {
                continue;
            };
            if protected.contains(&address) {
                continue;
            }
            if let Some((table, index)) = locate(&address) {
                meta.address = AddressRef::Lookup { table, index };
            }
        }
    }
    Ok(compressed)
}
