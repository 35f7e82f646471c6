//! Coinbase transaction construction for mining.
//!
//! The coinbase transaction is the first transaction in a block that creates
//! new coins (the block reward) and collects transaction fees.

use crate::codec::{make_push_int, make_push_str, StandardOpcodes};
use crate::transaction::{RawTransaction, TxInput, TxOutput};

/// Tag appended to every coinbase scriptSig unless overridden.
pub const DEFAULT_COINBASE_TAG: &[u8] = b"/blockwork/";

/// Builder for constructing coinbase transactions.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    /// The block height (required by BIP34).
    block_height: u32,
    /// Output script receiving the block reward.
    script_pubkey: Vec<u8>,
    /// Extra nonce data for merkle root variation.
    extra_nonce: Vec<u8>,
    /// Free-form bytes after the extra nonce.
    tag: Vec<u8>,
}

impl CoinbaseBuilder {
    /// Create a new coinbase builder.
    pub fn new(block_height: u32, script_pubkey: Vec<u8>) -> Self {
        CoinbaseBuilder {
            block_height,
            script_pubkey,
            extra_nonce: Vec::new(),
            tag: DEFAULT_COINBASE_TAG.to_vec(),
        }
    }

    /// Set the extra nonce (used to vary the merkle root).
    pub fn with_extra_nonce(mut self, extra_nonce: impl Into<Vec<u8>>) -> Self {
        self.extra_nonce = extra_nonce.into();
        self
    }

    /// Set the miner tag.
    pub fn with_tag(mut self, tag: impl Into<Vec<u8>>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Replace the extra nonce in place, for rotating it between jobs.
    pub fn set_extra_nonce(&mut self, extra_nonce: &[u8]) {
        self.extra_nonce.clear();
        self.extra_nonce.extend_from_slice(extra_nonce);
    }

    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    /// Build the coinbase transaction paying `total_reward` satoshis.
    pub fn build(&self, total_reward: u64) -> RawTransaction {
        let input = TxInput::Coinbase {
            script: self.build_script_sig(),
            sequence: 0xffff_ffff,
        };
        let output = TxOutput {
            value: total_reward,
            script_pubkey: self.script_pubkey.clone(),
        };
        RawTransaction::new(1, vec![input], vec![output], 0)
    }

    /// Build the scriptSig: BIP34 height push, extra nonce push, tag.
    fn build_script_sig(&self) -> Vec<u8> {
        let ops = StandardOpcodes;
        let mut script_sig = Vec::with_capacity(16 + self.extra_nonce.len() + self.tag.len());

        script_sig.extend_from_slice(&make_push_int(self.block_height as i64, &ops));
        if !self.extra_nonce.is_empty() {
            script_sig.extend_from_slice(&make_push_str(&self.extra_nonce, &ops));
        }
        script_sig.extend_from_slice(&self.tag);

        script_sig
    }
}
