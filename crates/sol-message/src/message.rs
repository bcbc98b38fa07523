//! Message wire format: legacy and versioned framing.
//!
//! ```text
//! Message (legacy):
//!   num_required_sigs       u8   (high bit always clear)
//!   num_readonly_signed     u8
//!   num_readonly_unsigned   u8
//!   num_account_keys        shortvec
//!   account_keys            32 bytes each
//!   recent_blockhash        32 bytes
//!   num_instructions        shortvec
//!   instructions[]          (program index u8, shortvec key indexes,
//!                            shortvec data)
//!
//! Message (versioned): one marker byte (0x80 | version) first; version 0
//! appends the address-lookup section:
//!   num_lookups             shortvec
//!   lookups[]               (table 32 bytes, shortvec writable indexes,
//!                            shortvec readonly indexes)
//! ```
//!
//! Keys loaded through lookup tables extend the static key index space:
//! first every table's writable entries in lookup order, then every table's
//! readonly entries.

use sol_codec::{Reader, Writer};
use sol_keys::{Address, Hash};

use crate::account::{AccountMeta, AddressRef, Instruction};
use crate::canonical::{canonicalize, privileges, MessageHeader};
use crate::error::TxError;

/// Message framing version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Legacy,
    Number(u8),
}

/// A compiled instruction: account references replaced by indexes into the
/// message's key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub program_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

/// One entry of the address-lookup section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLookup {
    pub table: Address,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// The wire-level message shape. Key order is an implementation detail of
/// the encode path; this form exists so callers needing byte-exact
/// round-trips can operate below the canonicalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub version: Version,
    pub header: MessageHeader,
    pub keys: Vec<Address>,
    pub blockhash: Hash,
    pub instructions: Vec<RawInstruction>,
    pub lookups: Vec<RawLookup>,
}

impl RawMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        let mut w = Writer::new();

        match self.version {
            Version::Legacy => {
                if !self.lookups.is_empty() {
                    return Err(TxError::Value(
                        "legacy message cannot carry an address-lookup section".into(),
                    ));
                }
            }
            Version::Number(n) => {
                if n > 0x7f {
                    return Err(TxError::Value(format!("message version {n} exceeds 127")));
                }
                if n != 0 {
                    return Err(TxError::Value(format!("unsupported message version {n}")));
                }
                w.write_u8(0x80 | n);
            }
        }

        w.write_u8(self.header.required_signatures);
        w.write_u8(self.header.readonly_signed);
        w.write_u8(self.header.readonly_unsigned);

        w.write_shortvec(self.keys.len() as u32);
        for key in &self.keys {
            w.write(key.as_bytes());
        }

        w.write(self.blockhash.as_bytes());

        w.write_shortvec(self.instructions.len() as u32);
        for ix in &self.instructions {
            w.write_u8(ix.program_index);
            w.write_shortvec(ix.account_indexes.len() as u32);
            w.write(&ix.account_indexes);
            w.write_shortvec(ix.data.len() as u32);
            w.write(&ix.data);
        }

        if matches!(self.version, Version::Number(_)) {
            w.write_shortvec(self.lookups.len() as u32);
            for lookup in &self.lookups {
                w.write(lookup.table.as_bytes());
                w.write_shortvec(lookup.writable_indexes.len() as u32);
                w.write(&lookup.writable_indexes);
                w.write_shortvec(lookup.readonly_indexes.len() as u32);
                w.write(&lookup.readonly_indexes);
            }
        }

        Ok(w.finish())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut r = Reader::new(bytes);

        // Legacy messages start with the required-signature count, which
        // never has its high bit set; a set high bit is the version marker.
        let first = r.read_u8("message version")?;
        let (version, required_signatures) = if first & 0x80 != 0 {
            let n = first & 0x7f;
            if n != 0 {
                return Err(TxError::Format(format!("unsupported message version {n}")));
            }
            (Version::Number(n), r.read_u8("message header")?)
        } else {
            (Version::Legacy, first)
        };

        let header = MessageHeader {
            required_signatures,
            readonly_signed: r.read_u8("message header")?,
            readonly_unsigned: r.read_u8("message header")?,
        };

        let key_count = r.read_shortvec()? as usize;
        // Validate claimed counts against the input before reserving; a
        // five-byte compact count can claim u32::MAX elements.
        if key_count > r.remaining() / 32 {
            return Err(TxError::Format(format!(
                "{key_count} account keys cannot fit in {} remaining bytes",
                r.remaining()
            )));
        }
        let mut keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            keys.push(Address::try_from_slice(r.take(32, "account key")?)?);
        }
        if keys.is_empty() {
            return Err(TxError::Format("empty account key list".into()));
        }

        let blockhash = Hash::try_from_slice(r.take(32, "blockhash")?)?;

        let ix_count = r.read_shortvec()? as usize;
        // Each instruction occupies at least three bytes on the wire.
        if ix_count > r.remaining() / 3 {
            return Err(TxError::Format(format!(
                "{ix_count} instructions cannot fit in {} remaining bytes",
                r.remaining()
            )));
        }
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_index = r.read_u8("program index")?;
            let index_count = r.read_shortvec()?;
            let account_indexes = r.take(index_count as usize, "account indexes")?.to_vec();
            let data_len = r.read_shortvec()?;
            let data = r.take(data_len as usize, "instruction data")?.to_vec();
            instructions.push(RawInstruction {
                program_index,
                account_indexes,
                data,
            });
        }

        let mut lookups = Vec::new();
        if matches!(version, Version::Number(_)) {
            let lookup_count = r.read_shortvec()?;
            for _ in 0..lookup_count {
                let table = Address::try_from_slice(r.take(32, "lookup table address")?)?;
                let writable_count = r.read_shortvec()?;
                let writable_indexes = r.take(writable_count as usize, "writable indexes")?.to_vec();
                let readonly_count = r.read_shortvec()?;
                let readonly_indexes = r.take(readonly_count as usize, "readonly indexes")?.to_vec();
                lookups.push(RawLookup {
                    table,
                    writable_indexes,
                    readonly_indexes,
                });
            }
        }

        if r.remaining() > 0 {
            return Err(TxError::Format(format!(
                "{} trailing bytes after message",
                r.remaining()
            )));
        }

        Ok(RawMessage {
            version,
            header,
            keys,
            blockhash,
            instructions,
            lookups,
        })
    }
}

/// The in-memory message: a fee payer, a blockhash, and typed instructions.
///
/// Account references may be literal or behind lookup tables; the latter only
/// survive compilation in versioned messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: Version,
    pub fee_payer: Address,
    pub blockhash: Hash,
    pub instructions: Vec<Instruction>,
}

impl Message {
    pub fn legacy(fee_payer: Address, blockhash: Hash, instructions: Vec<Instruction>) -> Self {
        Message {
            version: Version::Legacy,
            fee_payer,
            blockhash,
            instructions,
        }
    }

    pub fn v0(fee_payer: Address, blockhash: Hash, instructions: Vec<Instruction>) -> Self {
        Message {
            version: Version::Number(0),
            fee_payer,
            blockhash,
            instructions,
        }
    }

    /// Canonicalize keys and compile instructions into the wire shape.
    pub fn compile(&self) -> Result<RawMessage, TxError> {
        let (static_keys, header) = canonicalize(&self.fee_payer, &self.instructions)?;

        // Collect lookup references per table in encounter order. An index
        // referenced both writable and readonly is promoted to writable,
        // mirroring the privilege OR on static keys.
        let mut tables: Vec<RawLookup> = Vec::new();
        for ix in &self.instructions {
            for meta in &ix.accounts {
                let AddressRef::Lookup { table, index } = meta.address else {
                    continue;
                };
                let pos = match tables.iter().position(|t| t.table == table) {
                    Some(pos) => pos,
                    None => {
                        tables.push(RawLookup {
                            table,
                            writable_indexes: vec![],
                            readonly_indexes: vec![],
                        });
                        tables.len() - 1
                    }
                };
                let entry = &mut tables[pos];
                if meta.is_writable {
                    if !entry.writable_indexes.contains(&index) {
                        entry.writable_indexes.push(index);
                    }
                    entry.readonly_indexes.retain(|&i| i != index);
                } else if !entry.writable_indexes.contains(&index)
                    && !entry.readonly_indexes.contains(&index)
                {
                    entry.readonly_indexes.push(index);
                }
            }
        }

        if self.version == Version::Legacy && !tables.is_empty() {
            return Err(TxError::Value(
                "lookup references require a versioned message".into(),
            ));
        }

        // Message index space: static keys, then every table's writable
        // entries, then every table's readonly entries.
        let mut loaded: Vec<(Address, u8)> = Vec::new();
        for table in &tables {
            for &index in &table.writable_indexes {
                loaded.push((table.table, index));
            }
        }
        for table in &tables {
            for &index in &table.readonly_indexes {
                loaded.push((table.table, index));
            }
        }

        let total = static_keys.len() + loaded.len();
        if total > 256 {
            return Err(TxError::Value(format!(
                "{total} account keys exceed the 256-key limit"
            )));
        }

        let index_of = |address: &AddressRef| -> Result<u8, TxError> {
            match address {
                AddressRef::Literal(a) => static_keys
                    .iter()
                    .position(|k| k.address == *a)
                    .map(|i| i as u8)
                    .ok_or_else(|| TxError::Value(format!("address {a} not in key list"))),
                AddressRef::Lookup { table, index } => loaded
                    .iter()
                    .position(|(t, i)| t == table && i == index)
                    .map(|i| (static_keys.len() + i) as u8)
                    .ok_or_else(|| {
                        TxError::Value(format!("lookup {table}:{index} not collected"))
                    }),
            }
        };

        let mut instructions = Vec::with_capacity(self.instructions.len());
        for ix in &self.instructions {
            let program_index = index_of(&AddressRef::Literal(ix.program))?;
            let mut account_indexes = Vec::with_capacity(ix.accounts.len());
            for meta in &ix.accounts {
                account_indexes.push(index_of(&meta.address)?);
            }
            instructions.push(RawInstruction {
                program_index,
                account_indexes,
                data: ix.data.clone(),
            });
        }

        Ok(RawMessage {
            version: self.version,
            header,
            keys: static_keys.iter().map(|k| k.address).collect(),
            blockhash: self.blockhash,
            instructions,
            lookups: tables,
        })
    }

    /// Rebuild the typed message from the wire shape, restoring per-key
    /// privileges from the header counts.
    pub fn decompile(raw: &RawMessage) -> Result<Message, TxError> {
        let static_total = raw.keys.len();
        if static_total == 0 {
            return Err(TxError::Format("empty account key list".into()));
        }
        if raw.header.required_signatures as usize > static_total {
            return Err(TxError::Format(format!(
                "{} required signatures exceed the {static_total}-key list",
                raw.header.required_signatures
            )));
        }

        let mut loaded: Vec<(AddressRef, bool)> = Vec::new();
        for lookup in &raw.lookups {
            for &index in &lookup.writable_indexes {
                loaded.push((
                    AddressRef::Lookup {
                        table: lookup.table,
                        index,
                    },
                    true,
                ));
            }
        }
        for lookup in &raw.lookups {
            for &index in &lookup.readonly_indexes {
                loaded.push((
                    AddressRef::Lookup {
                        table: lookup.table,
                        index,
                    },
                    false,
                ));
            }
        }

        let mut instructions = Vec::with_capacity(raw.instructions.len());
        for ix in &raw.instructions {
            // Programs must live in the static key list; tables cannot
            // supply program ids.
            let program = *raw
                .keys
                .get(ix.program_index as usize)
                .ok_or_else(|| {
                    TxError::Format(format!("program index {} out of bounds", ix.program_index))
                })?;

            let mut accounts = Vec::with_capacity(ix.account_indexes.len());
            for &index in &ix.account_indexes {
                let i = index as usize;
                let meta = if i < static_total {
                    let (is_signer, is_writable) = privileges(&raw.header, static_total, i);
                    AccountMeta {
                        address: AddressRef::Literal(raw.keys[i]),
                        is_signer,
                        is_writable,
                    }
                } else {
                    let (address, is_writable) =
                        *loaded.get(i - static_total).ok_or_else(|| {
                            TxError::Format(format!("account index {index} out of bounds"))
                        })?;
                    AccountMeta {
                        address,
                        is_signer: false,
                        is_writable,
                    }
                };
                accounts.push(meta);
            }

            instructions.push(Instruction {
                program,
                accounts,
                data: ix.data.clone(),
            });
        }

        Ok(Message {
            version: raw.version,
            fee_payer: raw.keys[0],
            blockhash: raw.blockhash,
            instructions,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        self.compile()?.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Message, TxError> {
        Message::decompile(&RawMessage::from_bytes(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountMeta;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    fn transfer_like(fee_payer: Address) -> Vec<Instruction> {
        vec![Instruction {
            program: addr(0),
            accounts: vec![
                AccountMeta::writable_signer(fee_payer),
                AccountMeta::writable(addr(2)),
            ],
            data: vec![2, 0, 0, 0, 100, 0, 0, 0, 0, 0, 0, 0],
        }]
    }

    #[test]
    fn legacy_wire_layout() {
        let msg = Message::legacy(addr(1), Hash::new([0xbb; 32]), transfer_like(addr(1)));
        let bytes = msg.to_bytes().unwrap();

        // Header: 1 required signature, 0 readonly signed, 1 readonly
        // unsigned (the program).
        assert_eq!(&bytes[..3], &[1, 0, 1]);
        // Three deduplicated keys.
        assert_eq!(bytes[3], 3);
        // Blockhash after 3 header + 1 count + 96 key bytes.
        assert_eq!(&bytes[100..132], &[0xbb; 32]);
        // High bit of the first byte clear: legacy framing.
        assert_eq!(bytes[0] & 0x80, 0);
    }

    #[test]
    fn versioned_marker_byte() {
        let msg = Message::v0(addr(1), Hash::new([0; 32]), transfer_like(addr(1)));
        let bytes = msg.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x80);
    }

    #[test]
    fn raw_roundtrip_is_byte_exact() {
        for msg in [
            Message::legacy(addr(1), Hash::new([9; 32]), transfer_like(addr(1))),
            Message::v0(addr(1), Hash::new([9; 32]), transfer_like(addr(1))),
        ] {
            let raw = msg.compile().unwrap();
            let bytes = raw.to_bytes().unwrap();
            let reparsed = RawMessage::from_bytes(&bytes).unwrap();
            assert_eq!(reparsed, raw);
            assert_eq!(reparsed.to_bytes().unwrap(), bytes);
        }
    }

    #[test]
    fn decompile_restores_instruction_semantics() {
        let original = Message::legacy(addr(1), Hash::new([7; 32]), transfer_like(addr(1)));
        let decoded = Message::from_bytes(&original.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.fee_payer, addr(1));
        assert_eq!(decoded.blockhash, Hash::new([7; 32]));
        assert_eq!(decoded.instructions.len(), 1);

        let ix = &decoded.instructions[0];
        let expected = &original.instructions[0];
        assert_eq!(ix.program, expected.program);
        assert_eq!(ix.data, expected.data);
        assert_eq!(ix.accounts, expected.accounts);
    }

    #[test]
    fn unknown_version_fails() {
        let err = RawMessage::from_bytes(&[0x81, 1, 0, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("unsupported message version 1"));
    }

    #[test]
    fn empty_key_list_fails() {
        // header + zero keys + blockhash + zero instructions
        let mut bytes = vec![1, 0, 0, 0];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.push(0);
        let err = RawMessage::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("empty account key list"));
    }

    #[test]
    fn trailing_bytes_fail() {
        let msg = Message::legacy(addr(1), Hash::new([0; 32]), vec![]);
        let mut bytes = msg.to_bytes().unwrap();
        bytes.push(0xff);
        let err = RawMessage::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("trailing bytes"));
    }

    #[test]
    fn absurd_key_count_fails_cleanly() {
        // Header then a compact count claiming u32::MAX keys, no key bytes.
        let bytes = [1, 0, 0, 0xff, 0xff, 0xff, 0xff, 0x0f];
        let err = RawMessage::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("account keys"));
    }

    #[test]
    fn absurd_instruction_count_fails_cleanly() {
        let mut bytes = vec![1, 0, 0, 1];
        bytes.extend_from_slice(&[0u8; 32]); // one key
        bytes.extend_from_slice(&[0u8; 32]); // blockhash
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        let err = RawMessage::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("instructions"));
    }

    #[test]
    fn truncated_message_fails() {
        let msg = Message::legacy(addr(1), Hash::new([0; 32]), transfer_like(addr(1)));
        let bytes = msg.to_bytes().unwrap();
        assert!(RawMessage::from_bytes(&bytes[..bytes.len() - 5]).is_err());
    }

    #[test]
    fn lookup_reference_requires_versioned_message() {
        let mut instructions = transfer_like(addr(1));
        instructions[0].accounts.push(AccountMeta {
            address: AddressRef::Lookup {
                table: addr(8),
                index: 0,
            },
            is_signer: false,
            is_writable: false,
        });
        let msg = Message::legacy(addr(1), Hash::new([0; 32]), instructions);
        let err = msg.to_bytes().unwrap_err();
        assert!(err.to_string().contains("versioned"));
    }

    #[test]
    fn lookup_references_roundtrip_through_v0() {
        let table = addr(8);
        let instructions = vec![Instruction {
            program: addr(0),
            accounts: vec![
                AccountMeta::writable_signer(addr(1)),
                AccountMeta {
                    address: AddressRef::Lookup { table, index: 4 },
                    is_signer: false,
                    is_writable: true,
                },
                AccountMeta {
                    address: AddressRef::Lookup { table, index: 9 },
                    is_signer: false,
                    is_writable: false,
                },
            ],
            data: vec![1],
        }];
        let msg = Message::v0(addr(1), Hash::new([3; 32]), instructions);

        let raw = msg.compile().unwrap();
        assert_eq!(raw.lookups.len(), 1);
        assert_eq!(raw.lookups[0].table, table);
        assert_eq!(raw.lookups[0].writable_indexes, vec![4]);
        assert_eq!(raw.lookups[0].readonly_indexes, vec![9]);

        // The loaded keys index past the static list: static keys are the
        // fee payer and the program, so indexes 2 and 3.
        assert_eq!(raw.instructions[0].account_indexes, vec![0, 2, 3]);

        let decoded = Message::decompile(&raw).unwrap();
        assert_eq!(decoded.instructions[0].accounts, msg.instructions[0].accounts);
    }

    #[test]
    fn lookup_index_promoted_to_writable() {
        let table = addr(8);
        let lookup_meta = |writable| AccountMeta {
            address: AddressRef::Lookup { table, index: 2 },
            is_signer: false,
            is_writable: writable,
        };
        let instructions = vec![
            Instruction {
                program: addr(0),
                accounts: vec![lookup_meta(false)],
                data: vec![],
            },
            Instruction {
                program: addr(0),
                accounts: vec![lookup_meta(true)],
                data: vec![],
            },
        ];
        let msg = Message::v0(addr(1), Hash::new([0; 32]), instructions);
        let raw = msg.compile().unwrap();
        assert_eq!(raw.lookups[0].writable_indexes, vec![2]);
        assert!(raw.lookups[0].readonly_indexes.is_empty());
    }

    #[test]
    fn account_index_out_of_bounds_fails() {
        let msg = Message::legacy(addr(1), Hash::new([0; 32]), transfer_like(addr(1)));
        let mut raw = msg.compile().unwrap();
        raw.instructions[0].account_indexes[0] = 200;
        let err = Message::decompile(&raw).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn reencoding_preserves_semantics_not_bytes() {
        // Same logical content, instruction account lists in different
        // encounter order: privileges agree, bytes need not.
        let build = |first_writable: u8, second_writable: u8| {
            Message::legacy(
                addr(1),
                Hash::new([0; 32]),
                vec![Instruction {
                    program: addr(0),
                    accounts: vec![
                        AccountMeta::writable(addr(first_writable)),
                        AccountMeta::writable(addr(second_writable)),
                    ],
                    data: vec![],
                }],
            )
        };
        let a = build(2, 3).compile().unwrap();
        let b = build(3, 2).compile().unwrap();
        assert_eq!(a.header, b.header);
        let mut keys_a = a.keys.clone();
        let mut keys_b = b.keys.clone();
        keys_a.sort();
        keys_b.sort();
        assert_eq!(keys_a, keys_b);
    }
}
