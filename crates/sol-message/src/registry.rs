//! Explicit program schema registry.
//!
//! Decoding instruction data needs to know which layout a program uses. The
//! mapping is built once at startup and passed by reference into decode
//! calls — no global mutable state, so independent schema sets can coexist
//! in one process.

use std::collections::BTreeMap;

use sol_codec::{Codec, Value};
use sol_keys::Address;

use crate::account::Instruction;
use crate::error::TxError;

/// Program address to compiled instruction codec.
#[derive(Default)]
pub struct ProgramRegistry {
    schemas: BTreeMap<Address, Codec>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, program: Address, codec: Codec) {
        self.schemas.insert(program, codec);
    }

    pub fn get(&self, program: &Address) -> Option<&Codec> {
        self.schemas.get(program)
    }

    /// Decode an instruction's payload with its program's schema.
    pub fn decode_instruction(&self, instruction: &Instruction) -> Result<Value, TxError> {
        let codec = self
            .schemas
            .get(&instruction.program)
            .ok_or(TxError::UnknownProgram(instruction.program))?;
        Ok(codec.decode(&instruction.data)?)
    }

    /// Encode a payload with its program's schema.
    pub fn encode_instruction_data(
        &self,
        program: &Address,
        value: &Value,
    ) -> Result<Vec<u8>, TxError> {
        let codec = self
            .schemas
            .get(program)
            .ok_or(TxError::UnknownProgram(*program))?;
        Ok(codec.encode(value)?)
    }
}
