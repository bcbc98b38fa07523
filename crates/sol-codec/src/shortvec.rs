//! Compact-length ("shortvec") integer encoding.
//!
//! Variable-length unsigned integer with 7 payload bits and one continuation
//! bit per byte, least-significant group first. Solana uses it for every
//! count field in the transaction wire format.

use crate::error::CodecError;

/// Encode a value in compact-length form.
///
/// - 0..=0x7f            -> 1 byte
/// - 0x80..=0x3fff       -> 2 bytes
/// - 0x4000..=0x1f_ffff  -> 3 bytes, and so on (5 bytes max for u32)
pub fn encode_shortvec(value: u32) -> Vec<u8> {
    let mut val = value;
    let mut out = Vec::with_capacity(5);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-length value from the front of `data`.
///
/// Returns `(value, bytes_consumed)`. An empty buffer decodes to `(0, 0)`;
/// a buffer ending mid-sequence yields the bits read so far. The only error
/// is an encoding that overflows 32 bits.
pub fn decode_shortvec(data: &[u8]) -> Result<(u32, usize), CodecError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    for &byte in data {
        if shift >= 35 {
            return Err(CodecError::Format(
                "compact-length encoding exceeds 32 bits".into(),
            ));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        consumed += 1;

        if byte & 0x80 == 0 {
            break;
        }
    }

    if value > u32::MAX as u64 {
        return Err(CodecError::Format("compact-length value overflow".into()));
    }

    Ok((value as u32, consumed))
}
