//! The mining view of a block.
//!
//! A miner never needs the non-coinbase transactions, only the sibling hashes
//! on the coinbase's path to the merkle root. [`CompactBlock`] keeps exactly
//! that, plus the SHA-256 midstate of the first 64 header bytes, so each nonce
//! trial costs one compression for the header tail and one for the outer hash.

use crate::error::{Error, Result};
use crate::hash::Midstate;
use crate::header::BlockHeader;
use crate::merkle::fold_merkle_edge;
use crate::pow::{validate_coinbase, CoinbaseSlot, ProofOfWork};
use crate::target::{decode_compact_target, U256};
use crate::transaction::{RawTransaction, Transaction};

/// A block header with a coinbase and its merkle edge.
#[derive(Debug, Clone)]
pub struct CompactBlock<T = RawTransaction> {
    pub height: u32,
    header: BlockHeader,
    merkle_edge: Vec<[u8; 32]>,
    coinbase: Option<T>,
    midstate: Option<Midstate>,
    target: U256,
}

impl<T: Transaction> CompactBlock<T> {
    /// Create a compact block. If `coinbase` is given it is validated and the
    /// merkle root and midstate are derived from it; otherwise both stay unset
    /// until [`CoinbaseSlot::set_coinbase_transaction`] is called.
    pub fn new(
        height: u32,
        version: u32,
        prev_block_hash: [u8; 32],
        time: u32,
        bits: u32,
        merkle_edge: Vec<[u8; 32]>,
        coinbase: Option<T>,
    ) -> Result<Self> {
        let target = decode_compact_target(bits)?;
        let mut block = CompactBlock {
            height,
            header: BlockHeader::new(version, prev_block_hash, [0u8; 32], time, bits, 0),
            merkle_edge,
            coinbase: None,
            midstate: None,
            target,
        };
        if let Some(tx) = coinbase {
            block.set_coinbase_transaction(tx)?;
        }
        Ok(block)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Sibling hashes from the bottom of the tree up.
    pub fn merkle_edge(&self) -> &[[u8; 32]] {
        &self.merkle_edge
    }

    pub fn merkle_root(&self) -> Result<[u8; 32]> {
        self.require_coinbase()?;
        Ok(self.header.merkle_root_hash)
    }

    pub fn midstate(&self) -> Option<&Midstate> {
        self.midstate.as_ref()
    }

    /// Change the timestamp. The time sits in the header tail, so the
    /// midstate is unaffected.
    pub fn set_time(&mut self, time: u32) {
        self.header.time = time;
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.header.nonce = nonce;
    }

    /// Change the compact target; the new bits must decode.
    pub fn set_bits(&mut self, bits: u32) -> Result<()> {
        self.target = decode_compact_target(bits)?;
        self.header.bits = bits;
        Ok(())
    }

    /// Header hash at the current nonce.
    pub fn hash(&self) -> Result<[u8; 32]> {
        let midstate = self.require_coinbase()?;
        Ok(midstate.header_hash(&self.header.tail()))
    }

    fn require_coinbase(&self) -> Result<&Midstate> {
        self.midstate
            .as_ref()
            .ok_or(Error::UninitializedBlock("compact block has no coinbase transaction"))
    }
}

impl<T: Transaction> CoinbaseSlot<T> for CompactBlock<T> {
    fn coinbase_transaction(&self) -> Option<&T> {
        self.coinbase.as_ref()
    }

    fn set_coinbase_transaction(&mut self, tx: T) -> Result<()> {
        validate_coinbase(&tx)?;

        self.header.merkle_root_hash = fold_merkle_edge(tx.hash(), &self.merkle_edge);
        self.midstate = Some(Midstate::from_block(&self.header.first_block()));
        self.coinbase = Some(tx);
        Ok(())
    }
}

impl<T: Transaction> ProofOfWork for CompactBlock<T> {
    fn target(&self) -> &U256 {
        &self.target
    }

    fn compute_hash(&mut self, nonce: u32) -> Result<[u8; 32]> {
        self.header.nonce = nonce;
        self.hash()
    }
}
