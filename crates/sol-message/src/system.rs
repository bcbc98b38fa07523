//! System program instruction catalog.
//!
//! The layouts are plain data over the descriptor codec: a u32
//! little-endian discriminant followed by the variant payload. Only the
//! variants this library builds are listed; the discriminant positions
//! match the runtime's enum.

use sol_codec::{Codec, CodecError, Field, IntWidth, Len, TypeNode, Value, Variant};
use sol_keys::Address;

use crate::account::{AccountMeta, Instruction};
use crate::error::TxError;

/// The System Program: 32 zero bytes, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Address = Address([0u8; 32]);

/// Descriptor for the system program's instruction payloads.
pub fn instruction_schema() -> TypeNode {
    TypeNode::Enum {
        disc: IntWidth::W4,
        variants: vec![
            Variant::strukt(
                "CreateAccount",
                vec![
                    Field::new("lamports", TypeNode::u64_le()),
                    Field::new("space", TypeNode::u64_le()),
                    Field::new("owner", TypeNode::Bytes(Len::Fixed(32))),
                ],
            ),
            Variant::strukt(
                "Assign",
                vec![Field::new("owner", TypeNode::Bytes(Len::Fixed(32)))],
            ),
            Variant::strukt(
                "Transfer",
                vec![Field::new("lamports", TypeNode::u64_le())],
            ),
        ],
    }
}

pub fn instruction_codec() -> Result<Codec, CodecError> {
    Codec::new(instruction_schema())
}

/// Build a `Transfer` instruction moving `lamports` from `from` to `to`.
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Result<Instruction, TxError> {
    if lamports == 0 {
        return Err(TxError::Value("lamports must be > 0".into()));
    }

    let payload = Value::variant(
        "Transfer",
        Value::Struct(vec![("lamports".into(), Value::Num(lamports))]),
    );
    let data = instruction_codec()?.encode(&payload)?;

    Ok(Instruction {
        program: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable_signer(*from),
            AccountMeta::writable(*to),
        ],
        data,
    })
}

/// Build a `CreateAccount` instruction funding `new_account` with `lamports`
/// and `space` bytes of data owned by `owner`.
pub fn create_account(
    from: &Address,
    new_account: &Address,
    lamports: u64,
    space: u64,
    owner: &Address,
) -> Result<Instruction, TxError> {
    let payload = Value::variant(
        "CreateAccount",
        Value::Struct(vec![
            ("lamports".into(), Value::Num(lamports)),
            ("space".into(), Value::Num(space)),
            ("owner".into(), Value::Bytes(owner.as_bytes().to_vec())),
        ]),
    );
    let data = instruction_codec()?.encode(&payload)?;

    Ok(Instruction {
        program: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable_signer(*from),
            AccountMeta::writable_signer(*new_account),
        ],
        data,
    })
}
