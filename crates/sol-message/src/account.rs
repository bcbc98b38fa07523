//! Instructions and the accounts they reference.

use sol_keys::Address;

/// How an instruction names an account: a literal address, or an index into
/// an address lookup table. Lookup references exist only in the in-memory
/// message; the wire carries numeric indexes into the message's lookup
/// section instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRef {
    Literal(Address),
    Lookup { table: Address, index: u8 },
}

impl AddressRef {
    /// The literal address, if this reference is not behind a table.
    pub fn literal(&self) -> Option<&Address> {
        match self {
            AddressRef::Literal(address) => Some(address),
            AddressRef::Lookup { .. } => None,
        }
    }
}

impl From<Address> for AddressRef {
    fn from(address: Address) -> Self {
        AddressRef::Literal(address)
    }
}

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: AddressRef,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable_signer(address: Address) -> Self {
        AccountMeta {
            address: address.into(),
            is_signer: true,
            is_writable: true,
        }
    }

    pub fn readonly_signer(address: Address) -> Self {
        AccountMeta {
            address: address.into(),
            is_signer: true,
            is_writable: false,
        }
    }

    pub fn writable(address: Address) -> Self {
        AccountMeta {
            address: address.into(),
            is_signer: false,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address) -> Self {
        AccountMeta {
            address: address.into(),
            is_signer: false,
            is_writable: false,
        }
    }
}

/// An instruction before compilation into a message: the program to invoke,
/// the accounts it touches, and its opaque payload bytes. Immutable once
/// built; the program address is always literal (lookup tables cannot
/// supply program ids).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}
