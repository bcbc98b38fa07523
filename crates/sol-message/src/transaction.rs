//! Transaction wire format and signing.
//!
//! ```text
//! Transaction:
//!   num_signatures          shortvec (== message required signatures)
//!   signatures              64 bytes each, zero-filled when absent
//!   message                 (see message.rs)
//! ```
//!
//! Decoding deliberately tolerates all-zero signature slots so unsigned and
//! partially-signed transactions stay representable; [`Transaction::verify`]
//! is where missing signatures become an error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sol_codec::{Reader, Writer};
use sol_keys::Address;
use zeroize::Zeroize;

use crate::error::TxError;
use crate::message::{Message, RawMessage};

/// IPv4 MTU (1280) minus IP and UDP framing: the ledger's packet budget for
/// a wire-ready transaction.
pub const PACKET_DATA_SIZE: usize = 1280 - 40 - 8;

/// A transaction: per-signer signatures (possibly absent) plus the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Signer address to signature, in the signer order of the last
    /// compile/decode. Absent signatures encode as 64 zero bytes.
    pub signatures: Vec<(Address, Option<[u8; 64]>)>,
    pub message: Message,
    /// The wire form the message arrived in. Key order within a privilege
    /// bucket is an implementation detail of this canonicalizer, so foreign
    /// encoders may order keys differently; signatures only verify over the
    /// bytes they were made for. Decoded transactions keep those bytes here
    /// and sign/verify/encode against them; freshly built messages compile
    /// on demand. Callers that edit `message` must rebuild with
    /// [`Transaction::new`].
    raw: Option<RawMessage>,
}

impl Transaction {
    pub fn new(message: Message) -> Self {
        Transaction {
            signatures: Vec::new(),
            message,
            raw: None,
        }
    }

    /// The received wire form, or a fresh compilation of the message.
    fn raw_message(&self) -> Result<RawMessage, TxError> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => self.message.compile(),
        }
    }

    /// The exact bytes a signer signs: the serialized message.
    pub fn message_bytes(&self) -> Result<Vec<u8>, TxError> {
        self.raw_message()?.to_bytes()
    }

    /// Serialize into the wire format, enforcing the packet budget.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        let raw = self.raw_message()?;
        let required = raw.header.required_signatures as usize;

        // Every supplied signature must belong to a signer key.
        for (address, _) in &self.signatures {
            if !raw.keys[..required].contains(address) {
                return Err(TxError::Value(format!(
                    "signature for {address}, which is not a signer"
                )));
            }
        }

        let mut w = Writer::new();
        w.write_shortvec(required as u32);
        for key in &raw.keys[..required] {
            let slot = self
                .signatures
                .iter()
                .find(|(address, _)| address == key)
                .and_then(|(_, sig)| *sig)
                .unwrap_or([0u8; 64]);
            w.write(&slot);
        }

        let message_bytes = raw.to_bytes()?;
        w.write(&message_bytes);

        let wire = w.finish();
        if wire.len() > PACKET_DATA_SIZE {
            return Err(TxError::SizeLimit(wire.len()));
        }
        Ok(wire)
    }

    pub fn to_base64(&self) -> Result<String, TxError> {
        Ok(BASE64.encode(self.to_bytes()?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut r = Reader::new(bytes);
        let count = r.read_shortvec()? as usize;
        // Validate the claimed count against the input before reserving.
        if count > r.remaining() / 64 {
            return Err(TxError::Format(format!(
                "{count} signature slots cannot fit in {} remaining bytes",
                r.remaining()
            )));
        }
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let slot: [u8; 64] = r
                .take(64, "signature")?
                .try_into()
                .map_err(|_| TxError::Format("signature slot".into()))?;
            slots.push(slot);
        }

        // Slots pair with the raw wire's key order, which the canonicalizer
        // is free to change on a re-encode.
        let raw = RawMessage::from_bytes(r.take_remainder())?;
        if count != raw.header.required_signatures as usize {
            return Err(TxError::Format(format!(
                "{count} signature slots for {} required signatures",
                raw.header.required_signatures
            )));
        }
        if count > raw.keys.len() {
            return Err(TxError::Format(format!(
                "{count} signature slots exceed the {}-key list",
                raw.keys.len()
            )));
        }
        let message = Message::decompile(&raw)?;

        // NOTE: an all-zero slot stays representable as an absent signature;
        // unsigned transactions must decode.
        let signatures = raw.keys[..count]
            .iter()
            .zip(slots)
            .map(|(address, slot)| {
                let sig = if slot == [0u8; 64] { None } else { Some(slot) };
                (*address, sig)
            })
            .collect();

        Ok(Transaction {
            signatures,
            message,
            raw: Some(raw),
        })
    }

    pub fn from_base64(text: &str) -> Result<Self, TxError> {
        let bytes = BASE64
            .decode(text)
            .map_err(|e| TxError::Format(format!("base64 decode failed: {e}")))?;
        Transaction::from_bytes(&bytes)
    }

    /// Sign with a 32-byte Ed25519 seed and record the signature.
    ///
    /// The derived public key must be one of the message's signer keys.
    pub fn sign(&mut self, private_key: &[u8; 32]) -> Result<(), TxError> {
        let mut seed = *private_key;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        let address = Address::new(signing_key.verifying_key().to_bytes());

        let raw = self.raw_message()?;
        let required = raw.header.required_signatures as usize;
        if !raw.keys[..required].contains(&address) {
            return Err(TxError::Signing(format!(
                "{address} is not a signer of this message"
            )));
        }

        let signature = signing_key.sign(&raw.to_bytes()?).to_bytes();
        match self
            .signatures
            .iter_mut()
            .find(|(existing, _)| *existing == address)
        {
            Some((_, slot)) => *slot = Some(signature),
            None => self.signatures.push((address, Some(signature))),
        }
        Ok(())
    }

    /// Check that every required signer has a valid signature over the
    /// message bytes.
    pub fn verify(&self) -> Result<(), TxError> {
        let raw = self.raw_message()?;
        let required = raw.header.required_signatures as usize;
        let message_bytes = raw.to_bytes()?;

        for key in &raw.keys[..required] {
            let slot = self
                .signatures
                .iter()
                .find(|(address, _)| address == key)
                .and_then(|(_, sig)| *sig)
                .ok_or_else(|| TxError::Signing(format!("missing signature for {key}")))?;

            let verifying_key = VerifyingKey::from_bytes(key.as_bytes())
                .map_err(|e| TxError::Signing(format!("invalid signer key {key}: {e}")))?;
            let signature = Signature::from_bytes(&slot);
            verifying_key
                .verify_strict(&message_bytes, &signature)
                .map_err(|_| TxError::Signing(format!("signature for {key} does not verify")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountMeta;
    use crate::message::Version;
    use crate::system;
    use sol_keys::Hash;

    fn keypair(seed: u8) -> ([u8; 32], Address) {
        let private_key = [seed; 32];
        let signing_key = SigningKey::from_bytes(&private_key);
        let address = Address::new(signing_key.verifying_key().to_bytes());
        (private_key, address)
    }

    fn transfer_message(from: Address, lamports: u64) -> Message {
        let to = Address::new([0xbb; 32]);
        let ix = system::transfer(&from, &to, lamports).unwrap();
        Message::legacy(from, Hash::new([0xcc; 32]), vec![ix])
    }

    #[test]
    fn sign_and_verify() {
        let (private_key, from) = keypair(0x42);
        let mut tx = Transaction::new(transfer_message(from, 1_000_000));
        tx.sign(&private_key).unwrap();
        tx.verify().unwrap();
    }

    #[test]
    fn unsigned_transaction_fails_verification() {
        let (_, from) = keypair(0x42);
        let tx = Transaction::new(transfer_message(from, 500));
        let err = tx.verify().unwrap_err();
        assert!(err.to_string().contains("missing signature"));
    }

    #[test]
    fn wrong_key_cannot_sign() {
        let (_, from) = keypair(0x11);
        let (other_key, _) = keypair(0x22);
        let mut tx = Transaction::new(transfer_message(from, 1000));
        let err = tx.sign(&other_key).unwrap_err();
        assert!(err.to_string().contains("not a signer"));
    }

    #[test]
    fn wire_roundtrip_signed() {
        let (private_key, from) = keypair(0x42);
        let mut tx = Transaction::new(transfer_message(from, 1_000_000));
        tx.sign(&private_key).unwrap();

        let wire = tx.to_bytes().unwrap();
        // Single signer: shortvec(1) then the 64-byte signature.
        assert_eq!(wire[0], 1);
        assert_ne!(&wire[1..65], &[0u8; 64][..]);

        let decoded = Transaction::from_bytes(&wire).unwrap();
        assert_eq!(decoded.signatures, tx.signatures);
        decoded.verify().unwrap();
        assert_eq!(decoded.to_bytes().unwrap(), wire);
    }

    #[test]
    fn unsigned_transaction_decodes_with_empty_slot() {
        let (_, from) = keypair(0x42);
        let tx = Transaction::new(transfer_message(from, 42));

        let wire = tx.to_bytes().unwrap();
        assert_eq!(&wire[1..65], &[0u8; 64][..]);

        let decoded = Transaction::from_bytes(&wire).unwrap();
        assert_eq!(decoded.signatures.len(), 1);
        assert_eq!(decoded.signatures[0].1, None);
        assert!(decoded.verify().is_err());
    }

    #[test]
    fn signing_is_deterministic() {
        let (private_key, from) = keypair(0x55);
        let mut a = Transaction::new(transfer_message(from, 42));
        let mut b = Transaction::new(transfer_message(from, 42));
        a.sign(&private_key).unwrap();
        b.sign(&private_key).unwrap();
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn base64_roundtrip() {
        let (private_key, from) = keypair(0x42);
        let mut tx = Transaction::new(transfer_message(from, 7));
        tx.sign(&private_key).unwrap();

        let text = tx.to_base64().unwrap();
        let decoded = Transaction::from_base64(&text).unwrap();
        assert_eq!(decoded.signatures, tx.signatures);
        assert_eq!(decoded.message, tx.message);
        assert_eq!(decoded.to_base64().unwrap(), text);
    }

    /// Message bytes whose writable non-signer keys sit in the opposite
    /// order from this canonicalizer's encounter order.
    fn swapped_key_message_bytes(from: Address) -> Vec<u8> {
        let ix = crate::account::Instruction {
            program: system::SYSTEM_PROGRAM_ID,
            accounts: vec![
                AccountMeta::writable_signer(from),
                AccountMeta::writable(Address::new([0xd1; 32])),
                AccountMeta::writable(Address::new([0xd2; 32])),
            ],
            data: vec![7],
        };
        let msg = Message::legacy(from, Hash::new([0xcc; 32]), vec![ix]);

        let mut raw = msg.compile().unwrap();
        raw.keys.swap(1, 2);
        for ix in &mut raw.instructions {
            for index in &mut ix.account_indexes {
                *index = match *index {
                    1 => 2,
                    2 => 1,
                    other => other,
                };
            }
        }
        raw.to_bytes().unwrap()
    }

    #[test]
    fn verify_accepts_foreign_key_order() {
        let (private_key, from) = keypair(0x42);
        let message_bytes = swapped_key_message_bytes(from);

        let signature = SigningKey::from_bytes(&private_key).sign(&message_bytes);
        let mut wire = vec![1];
        wire.extend_from_slice(&signature.to_bytes());
        wire.extend_from_slice(&message_bytes);

        let decoded = Transaction::from_bytes(&wire).unwrap();
        decoded.verify().unwrap();
        // Re-encoding reproduces the received bytes, not a re-canonicalized
        // form that would invalidate the signature.
        assert_eq!(decoded.to_bytes().unwrap(), wire);
    }

    #[test]
    fn signing_a_decoded_transaction_signs_the_received_bytes() {
        let (private_key, from) = keypair(0x42);
        let message_bytes = swapped_key_message_bytes(from);

        let mut wire = vec![1];
        wire.extend_from_slice(&[0u8; 64]);
        wire.extend_from_slice(&message_bytes);

        let mut decoded = Transaction::from_bytes(&wire).unwrap();
        decoded.sign(&private_key).unwrap();
        decoded.verify().unwrap();
        assert_eq!(&decoded.to_bytes().unwrap()[65..], &message_bytes[..]);
    }

    #[test]
    fn absurd_signature_count_fails_cleanly() {
        // A compact count claiming u32::MAX slots with nothing behind it.
        let err = Transaction::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0x0f]).unwrap_err();
        assert!(matches!(err, TxError::Format(_)), "{err}");
    }

    #[test]
    fn foreign_signature_is_rejected_on_encode() {
        let (_, from) = keypair(0x42);
        let mut tx = Transaction::new(transfer_message(from, 7));
        tx.signatures
            .push((Address::new([0xee; 32]), Some([1u8; 64])));
        let err = tx.to_bytes().unwrap_err();
        assert!(err.to_string().contains("not a signer"));
    }

    #[test]
    fn slot_count_mismatch_fails_decode() {
        let (_, from) = keypair(0x42);
        let tx = Transaction::new(transfer_message(from, 7));
        let wire = tx.to_bytes().unwrap();

        // Claim two slots but supply the rest of the original wire.
        let mut forged = vec![2];
        forged.extend_from_slice(&[0u8; 64]);
        forged.extend_from_slice(&wire[1..]);
        assert!(Transaction::from_bytes(&forged).is_err());
    }

    #[test]
    fn packet_budget_boundary() {
        let (_, from) = keypair(0x42);

        // A transaction whose instruction data length is tunable.
        let build = |data_len: usize| {
            let ix = crate::account::Instruction {
                program: system::SYSTEM_PROGRAM_ID,
                accounts: vec![AccountMeta::writable_signer(from)],
                data: vec![0u8; data_len],
            };
            Transaction::new(Message {
                version: Version::Legacy,
                fee_payer: from,
                blockhash: Hash::new([0; 32]),
                instructions: vec![ix],
            })
        };

        // Converge on an exact wire size (shortvec length fields shift the
        // total as the payload grows).
        let size_of = |data_len: usize| match build(data_len).to_bytes() {
            Ok(wire) => wire.len(),
            Err(TxError::SizeLimit(size)) => size,
            Err(other) => panic!("unexpected error: {other}"),
        };
        let data_len_for = |target: usize| {
            let mut data_len = target / 2;
            for _ in 0..8 {
                let size = size_of(data_len);
                if size == target {
                    return data_len;
                }
                data_len = data_len + target - size;
            }
            panic!("could not hit target size {target}");
        };

        let at_limit = build(data_len_for(PACKET_DATA_SIZE));
        let wire = at_limit.to_bytes().unwrap();
        assert_eq!(wire.len(), 1232);

        let over_limit = build(data_len_for(PACKET_DATA_SIZE + 1));
        match over_limit.to_bytes() {
            Err(TxError::SizeLimit(size)) => assert_eq!(size, 1233),
            other => panic!("expected SizeLimit, got {other:?}"),
        }
    }
}
