use sol_codec::CodecError;
use sol_keys::{Address, KeyError};
use thiserror::Error;

/// Message and transaction codec errors.
#[derive(Debug, Error)]
pub enum TxError {
    /// Malformed or truncated wire bytes, a bad version marker, an index
    /// pointing outside the key list, or a signature-count mismatch.
    #[error("format error: {0}")]
    Format(String),

    /// A message that cannot be compiled as requested (lookup reference in a
    /// legacy message, signer behind a lookup table, too many keys).
    #[error("invalid message: {0}")]
    Value(String),

    /// A wire-ready transaction must fit the 1232-byte packet budget.
    #[error("transaction size {0} exceeds the 1232-byte packet limit")]
    SizeLimit(usize),

    /// Instruction decode was asked for a program with no registered schema.
    #[error("no schema registered for program {0}")]
    UnknownProgram(Address),

    /// A lookup reference names a table or index the caller did not supply.
    #[error("unknown lookup table entry: {0}")]
    UnknownLookup(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_size_limit() {
        let err = TxError::SizeLimit(1233);
        assert_eq!(
            err.to_string(),
            "transaction size 1233 exceeds the 1232-byte packet limit"
        );
    }

    #[test]
    fn display_unknown_program() {
        let err = TxError::UnknownProgram(Address::new([0u8; 32]));
        assert!(err
            .to_string()
            .contains("11111111111111111111111111111111"));
    }

    #[test]
    fn codec_errors_convert() {
        let err: TxError = CodecError::Format("truncated".into()).into();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn key_errors_convert() {
        let err: TxError = KeyError::BumpSeedsExhausted.into();
        assert!(err.to_string().contains("bump seeds"));
    }
}
