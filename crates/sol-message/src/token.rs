//! SPL Token instruction catalog and associated token addresses.
//!
//! Token instructions use a single-byte discriminant, unlike the system
//! program's four bytes. Optional fields (mint authorities) carry a one-byte
//! presence flag.

use sol_codec::{Codec, CodecError, Field, IntWidth, Len, TypeNode, Value, Variant};
use sol_keys::{find_program_address, Address, KeyError};

use crate::account::{AccountMeta, Instruction};
use crate::error::TxError;

/// `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

fn address_node() -> TypeNode {
    TypeNode::Bytes(Len::Fixed(32))
}

fn optional_address() -> TypeNode {
    TypeNode::Option {
        prefix: IntWidth::W1,
        fixed: false,
        inner: Box::new(address_node()),
    }
}

/// Descriptor for the token program's instruction payloads, variants in
/// discriminant order.
pub fn instruction_schema() -> TypeNode {
    TypeNode::Enum {
        disc: IntWidth::W1,
        variants: vec![
            Variant::strukt(
                "InitializeMint",
                vec![
                    Field::new("decimals", TypeNode::u8()),
                    Field::new("mint_authority", address_node()),
                    Field::new("freeze_authority", optional_address()),
                ],
            ),
            Variant::unit("InitializeAccount"),
            Variant::strukt("InitializeMultisig", vec![Field::new("m", TypeNode::u8())]),
            Variant::strukt("Transfer", vec![Field::new("amount", TypeNode::u64_le())]),
            Variant::strukt("Approve", vec![Field::new("amount", TypeNode::u64_le())]),
            Variant::unit("Revoke"),
            Variant::strukt(
                "SetAuthority",
                vec![
                    Field::new("authority_type", TypeNode::u8()),
                    Field::new("new_authority", optional_address()),
                ],
            ),
            Variant::strukt("MintTo", vec![Field::new("amount", TypeNode::u64_le())]),
            Variant::strukt("Burn", vec![Field::new("amount", TypeNode::u64_le())]),
            Variant::unit("CloseAccount"),
            Variant::unit("FreezeAccount"),
            Variant::unit("ThawAccount"),
            Variant::strukt(
                "TransferChecked",
                vec![
                    Field::new("amount", TypeNode::u64_le()),
                    Field::new("decimals", TypeNode::u8()),
                ],
            ),
        ],
    }
}

pub fn instruction_codec() -> Result<Codec, CodecError> {
    Codec::new(instruction_schema())
}

/// Build a `Transfer` moving `amount` base units between token accounts.
///
/// `owner` signs; `source` and `destination` are token accounts, not
/// wallets.
pub fn transfer(
    source: &Address,
    destination: &Address,
    owner: &Address,
    amount: u64,
) -> Result<Instruction, TxError> {
    if amount == 0 {
        return Err(TxError::Value("amount must be > 0".into()));
    }

    let payload = Value::variant(
        "Transfer",
        Value::Struct(vec![("amount".into(), Value::Num(amount))]),
    );
    let data = instruction_codec()?.encode(&payload)?;

    Ok(Instruction {
        program: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*source),
            AccountMeta::writable(*destination),
            AccountMeta::readonly_signer(*owner),
        ],
        data,
    })
}

/// Derive the canonical associated token account for `wallet` and `mint`.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<(Address, u8), KeyError> {
    find_program_address(
        &[
            wallet.as_bytes(),
            TOKEN_PROGRAM_ID.as_bytes(),
            mint.as_bytes(),
        ],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}
