//! 32-byte addresses and hashes with Base58 text forms.
//!
//! A Solana address is the Base58 encoding of raw 32 bytes — no hashing or
//! checksum step. Blockhashes share the byte shape and text encoding but are
//! a distinct type: one names an account, the other names a ledger state.

use std::fmt;
use std::str::FromStr;

use crate::error::KeyError;

/// A 32-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from a slice, failing unless it is exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            KeyError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidAddress(format!("base58 decode failed: {e}")))?;
        Address::try_from_slice(&bytes)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }
}

/// A 32-byte blockhash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from a slice, failing unless it is exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            KeyError::InvalidHash(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl FromStr for Hash {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidHash(format!("base58 decode failed: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            KeyError::InvalidHash(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Hash(arr))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The System Program address is 32 zero bytes.
    #[test]
    fn system_program_address_text() {
        let addr = Address::new([0u8; 32]);
        assert_eq!(addr.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn roundtrip_known_address() {
        // The Token Program.
        let text = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.to_string(), text);
    }

    #[test]
    fn parse_garbage_fails() {
        assert!("not-a-valid-address!!!".parse::<Address>().is_err());
    }

    #[test]
    fn parse_wrong_length_fails() {
        // "1" decodes to a single zero byte.
        let err = "1".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 1"));
    }

    #[test]
    fn try_from_slice_checks_length() {
        assert!(Address::try_from_slice(&[0u8; 31]).is_err());
        assert!(Address::try_from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn hash_text_roundtrip() {
        let hash = Hash::new([0xcc; 32]);
        let parsed: Hash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn address_ordering_is_byte_ordering() {
        let a = Address::new([1u8; 32]);
        let b = Address::new([2u8; 32]);
        assert!(a < b);
    }
}
