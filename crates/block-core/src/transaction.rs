//! The transaction seam.
//!
//! Blocks only need a handful of things from a transaction: parse it, write it
//! back, hash it and tell a coinbase input from a spending one. That contract
//! is the [`Transaction`] trait. [`RawTransaction`] implements it for the
//! legacy (non-witness) wire format without interpreting any script.

use crate::codec::{
    pack_u32, pack_u64, unpack_compact_int, unpack_hash, unpack_u32, unpack_u64, unpack_var_str,
    write_compact_int, write_var_str,
};
use crate::error::{Error, Result};
use crate::hash::double_sha256;

/// Previous-output index carried by a coinbase input.
pub const COINBASE_PREV_INDEX: u32 = 0xffff_ffff;

/// What a block needs from a transaction.
pub trait Transaction: Sized {
    /// Parse one transaction from the front of `bytes`, returning the rest.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])>;

    /// Wire serialization.
    fn serialize(&self) -> Vec<u8>;

    /// Transaction ID (internal byte order).
    fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Number of inputs.
    fn input_count(&self) -> usize;

    /// Whether input `index` is a coinbase input (no previous output).
    fn is_coinbase_input(&self, index: usize) -> bool;
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxInput {
    /// Creates new coins; carries arbitrary data in place of a scriptSig.
    Coinbase { script: Vec<u8>, sequence: u32 },
    /// Spends a previous output.
    Spend {
        prev_txid: [u8; 32],
        prev_index: u32,
        script_sig: Vec<u8>,
        sequence: u32,
    },
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        matches!(self, TxInput::Coinbase { .. })
    }

    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (prev_txid, rest) = unpack_hash(bytes)?;
        let (prev_index, rest) = unpack_u32(rest)?;
        let (script, rest) = unpack_var_str(rest)?;
        let (sequence, rest) = unpack_u32(rest)?;

        let input = if prev_txid == [0u8; 32] && prev_index == COINBASE_PREV_INDEX {
            TxInput::Coinbase { script: script.to_vec(), sequence }
        } else {
            TxInput::Spend {
                prev_txid,
                prev_index,
                script_sig: script.to_vec(),
                sequence,
            }
        };
        Ok((input, rest))
    }

    fn write(&self, output: &mut Vec<u8>) {
        match self {
            TxInput::Coinbase { script, sequence } => {
                output.extend_from_slice(&[0u8; 32]);
                output.extend_from_slice(&pack_u32(COINBASE_PREV_INDEX));
                write_var_str(script, output);
                output.extend_from_slice(&pack_u32(*sequence));
            }
            TxInput::Spend { prev_txid, prev_index, script_sig, sequence } => {
                output.extend_from_slice(prev_txid);
                output.extend_from_slice(&pack_u32(*prev_index));
                write_var_str(script_sig, output);
                output.extend_from_slice(&pack_u32(*sequence));
            }
        }
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Amount in satoshis.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (value, rest) = unpack_u64(bytes)?;
        let (script_pubkey, rest) = unpack_var_str(rest)?;
        Ok((TxOutput { value, script_pubkey: script_pubkey.to_vec() }, rest))
    }

    fn write(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&pack_u64(self.value));
        write_var_str(&self.script_pubkey, output);
    }
}

/// A transaction in the legacy serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl RawTransaction {
    pub fn new(version: u32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u32) -> Self {
        RawTransaction { version, inputs, outputs, lock_time }
    }

    /// Transaction ID in display order, as block explorers show it.
    pub fn display_txid(&self) -> String {
        crate::hash::hash_to_display_hex(&self.hash())
    }
}

/// Read a compact-size element count.
fn unpack_count(bytes: &[u8]) -> Result<(usize, &[u8])> {
    let (count, rest) = unpack_compact_int(bytes)?;
    let count = usize::try_from(count).map_err(|_| Error::truncated(usize::MAX, rest.len()))?;
    Ok((count, rest))
}

impl Transaction for RawTransaction {
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (version, rest) = unpack_u32(bytes)?;

        let (input_count, mut rest) = unpack_count(rest)?;
        if input_count == 0 && rest.first() == Some(&0x01) {
            return Err(Error::DecodeError(
                "segregated witness serialization is not supported".into(),
            ));
        }
        let mut inputs = Vec::with_capacity(input_count.min(rest.len() / 41));
        for _ in 0..input_count {
            let (input, next) = TxInput::from_bytes(rest)?;
            inputs.push(input);
            rest = next;
        }

        let (output_count, mut rest) = unpack_count(rest)?;
        let mut outputs = Vec::with_capacity(output_count.min(rest.len() / 9));
        for _ in 0..output_count {
            let (output, next) = TxOutput::from_bytes(rest)?;
            outputs.push(output);
            rest = next;
        }

        let (lock_time, rest) = unpack_u32(rest)?;

        Ok((RawTransaction { version, inputs, outputs, lock_time }, rest))
    }

    fn serialize(&self) -> Vec<u8> {
        let mut raw_tx = Vec::with_capacity(10 + self.inputs.len() * 148 + self.outputs.len() * 34);

        raw_tx.extend_from_slice(&pack_u32(self.version));

        write_compact_int(self.inputs.len() as u64, &mut raw_tx);
        for input in &self.inputs {
            input.write(&mut raw_tx);
        }

        write_compact_int(self.outputs.len() as u64, &mut raw_tx);
        for output in &self.outputs {
            output.write(&mut raw_tx);
        }

        raw_tx.extend_from_slice(&pack_u32(self.lock_time));
        raw_tx
    }

    fn input_count(&self) -> usize {
        self.inputs.len()
    }

    fn is_coinbase_input(&self, index: usize) -> bool {
        self.inputs.get(index).is_some_and(TxInput::is_coinbase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_vectors::GENESIS_COINBASE;

    fn spend(prev: u8) -> TxInput {
        TxInput::Spend {
            prev_txid: [prev; 32],
            prev_index: 1,
            script_sig: vec![0x51],
            sequence: 0xffff_fffe,
        }
    }

    #[test]
    fn test_parse_genesis_coinbase() {
        let bytes = hex::decode(GENESIS_COINBASE).unwrap();
        let (tx, rest) = RawTransaction::from_bytes(&bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(tx.version, 1);
        assert_eq!(tx.input_count(), 1);
        assert!(tx.is_coinbase_input(0));
        assert!(!tx.is_coinbase_input(1));
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, 5_000_000_000);
        assert_eq!(tx.outputs[0].script_pubkey.len(), 67);
        assert_eq!(
            tx.display_txid(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert_eq!(tx.serialize(), bytes);
    }

    #[test]
    fn test_spend_input_roundtrip() {
        let tx = RawTransaction::new(
            2,
            vec![spend(0xaa), spend(0xbb)],
            vec![TxOutput { value: 1234, script_pubkey: vec![0x6a] }],
            500_000,
        );
        let mut bytes = tx.serialize();
        bytes.push(0xff);

        let (parsed, rest) = RawTransaction::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(rest, &[0xff]);
        assert_eq!(parsed.input_count(), 2);
        assert!(!parsed.is_coinbase_input(0));
    }

    #[test]
    fn test_null_txid_with_other_index_is_not_coinbase() {
        let tx = RawTransaction::new(
            1,
            vec![TxInput::Spend {
                prev_txid: [0u8; 32],
                prev_index: 0,
                script_sig: vec![],
                sequence: 0,
            }],
            vec![],
            0,
        );
        let raw = tx.serialize();
        let (parsed, _) = RawTransaction::from_bytes(&raw).unwrap();
        assert!(!parsed.is_coinbase_input(0));
    }

    #[test]
    fn test_truncated_transaction() {
        let bytes = hex::decode(GENESIS_COINBASE).unwrap();
        for cut in [0, 3, 10, 50, bytes.len() - 1] {
            assert!(
                matches!(RawTransaction::from_bytes(&bytes[..cut]), Err(Error::TruncatedInput { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_witness_marker_rejected() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01];
        assert!(matches!(RawTransaction::from_bytes(&bytes), Err(Error::DecodeError(_))));
    }
}
