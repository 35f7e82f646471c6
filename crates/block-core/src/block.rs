//! A full Bitcoin block: header plus every transaction, with its merkle tree.

use crate::codec::{bytes_to_hex, hex_to_bytes, unpack_compact_int, write_compact_int};
use crate::compact::CompactBlock;
use crate::error::{Error, Result};
use crate::header::{BlockHeader, BLOCK_HEADER_SIZE};
use crate::merkle::MerkleTree;
use crate::pow::{validate_coinbase, CoinbaseSlot, ProofOfWork};
use crate::target::{decode_compact_target, U256};
use crate::transaction::{RawTransaction, Transaction};

/// A block with all of its transactions.
///
/// `header().merkle_root_hash` always equals the root of the merkle tree
/// over `transactions()`. Replacing the coinbase rehashes only the tree's
/// left edge; every other change to the transaction list rebuilds the tree.
#[derive(Debug, Clone)]
pub struct Block<T = RawTransaction> {
    /// Block height. Not part of the wire format, so unknown after parsing.
    pub height: Option<u32>,
    header: BlockHeader,
    transactions: Vec<T>,
    merkle_tree: MerkleTree,
    target: U256,
}

impl<T: Transaction> Block<T> {
    /// Create a block at `height` from header fields and transactions.
    ///
    /// `transactions[0]` must be a coinbase. The merkle root is computed.
    pub fn new(
        height: u32,
        version: u32,
        prev_block_hash: [u8; 32],
        time: u32,
        bits: u32,
        nonce: u32,
        transactions: Vec<T>,
    ) -> Result<Self> {
        let header = BlockHeader::new(version, prev_block_hash, [0u8; 32], time, bits, nonce);
        let mut block = Self::from_header(header, transactions)?;
        block.height = Some(height);
        Ok(block)
    }

    /// Create a block from an existing header and its transactions. The
    /// header's merkle root is replaced by the one computed from `transactions`.
    pub fn from_header(header: BlockHeader, transactions: Vec<T>) -> Result<Self> {
        if let Some(coinbase) = transactions.first() {
            validate_coinbase(coinbase)?;
        }
        let target = decode_compact_target(header.bits)?;

        let mut block = Block {
            height: None,
            header,
            transactions,
            merkle_tree: MerkleTree::default(),
            target,
        };
        block.invalidate();
        Ok(block)
    }

    /// Parse a block from the front of `bytes`, returning the remainder.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (header, rest) = BlockHeader::from_bytes(bytes)?;
        let (count, mut rest) = unpack_compact_int(rest)?;

        let capacity = usize::try_from(count).unwrap_or(usize::MAX).min(rest.len() / 60);
        let mut transactions = Vec::with_capacity(capacity);
        for _ in 0..count {
            let (tx, next) = T::from_bytes(rest)?;
            transactions.push(tx);
            rest = next;
        }

        let claimed_root = header.merkle_root_hash;
        let block = Self::from_header(header, transactions)?;
        if block.header.merkle_root_hash != claimed_root {
            log::warn!(
                "block {} merkle root does not match its transactions; using the computed root",
                block.header.display_hash()
            );
        }
        Ok((block, rest))
    }

    /// Parse a block from hex, rejecting trailing bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex_to_bytes(s)?;
        let (block, rest) = Self::from_bytes(&bytes)?;
        if !rest.is_empty() {
            return Err(Error::DecodeError(format!("{} trailing bytes after block", rest.len())));
        }
        Ok(block)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[T] {
        &self.transactions
    }

    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.merkle_tree
    }

    /// Block hash (internal byte order).
    pub fn hash(&self) -> [u8; 32] {
        self.header.hash()
    }

    /// Recompute the whole merkle tree and write its root into the header.
    pub fn invalidate(&mut self) {
        let hashes: Vec<[u8; 32]> = self.transactions.iter().map(T::hash).collect();
        self.merkle_tree = MerkleTree::build(&hashes);
        self.header.merkle_root_hash = self.merkle_tree.root();
        log::trace!("rebuilt merkle tree over {} transactions", hashes.len());
    }

    /// Append a transaction. The first transaction of an empty block must be
    /// a coinbase.
    pub fn push_transaction(&mut self, tx: T) -> Result<()> {
        if self.transactions.is_empty() {
            validate_coinbase(&tx)?;
        }
        self.transactions.push(tx);
        self.invalidate();
        Ok(())
    }

    /// Replace the whole transaction list.
    pub fn set_transactions(&mut self, transactions: Vec<T>) -> Result<()> {
        if let Some(coinbase) = transactions.first() {
            validate_coinbase(coinbase)?;
        }
        self.transactions = transactions;
        self.invalidate();
        Ok(())
    }

    /// Change the compact target; the new bits must decode.
    pub fn set_bits(&mut self, bits: u32) -> Result<()> {
        self.target = decode_compact_target(bits)?;
        self.header.bits = bits;
        Ok(())
    }

    pub fn set_version(&mut self, version: u32) {
        self.header.version = version;
    }

    pub fn set_prev_block_hash(&mut self, prev_block_hash: [u8; 32]) {
        self.header.prev_block_hash = prev_block_hash;
    }

    pub fn set_time(&mut self, time: u32) {
        self.header.time = time;
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.header.nonce = nonce;
    }

    /// Serialize the complete block: header, transaction count, transactions.
    pub fn serialize(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 9 + self.transactions.len() * 250);

        block.extend_from_slice(&self.header.serialize());
        write_compact_int(self.transactions.len() as u64, &mut block);
        for tx in &self.transactions {
            block.extend_from_slice(&tx.serialize());
        }

        block
    }

    /// Get the block as hex string for submission.
    pub fn serialize_hex(&self) -> String {
        bytes_to_hex(&self.serialize())
    }
}

impl<T: Transaction + Clone> Block<T> {
    /// The mining view of this block: same header, the coinbase, and the
    /// coinbase's merkle edge in place of the other transactions.
    pub fn to_compact(&self) -> Result<CompactBlock<T>> {
        let mut compact = CompactBlock::new(
            self.height.unwrap_or(0),
            self.header.version,
            self.header.prev_block_hash,
            self.header.time,
            self.header.bits,
            self.merkle_tree.left_edge(),
            self.transactions.first().cloned(),
        )?;
        compact.set_nonce(self.header.nonce);
        Ok(compact)
    }
}

impl<T: Transaction> CoinbaseSlot<T> for Block<T> {
    fn coinbase_transaction(&self) -> Option<&T> {
        self.transactions.first()
    }

    fn set_coinbase_transaction(&mut self, tx: T) -> Result<()> {
        validate_coinbase(&tx)?;
        if self.transactions.is_empty() {
            return Err(Error::UninitializedBlock("block has no coinbase to replace"));
        }

        self.merkle_tree.update_leftmost(tx.hash())?;
        self.transactions[0] = tx;
        self.header.merkle_root_hash = self.merkle_tree.root();
        Ok(())
    }
}

impl<T: Transaction> ProofOfWork for Block<T> {
    fn target(&self) -> &U256 {
        &self.target
    }

    fn compute_hash(&mut self, nonce: u32) -> Result<[u8; 32]> {
        self.header.nonce = nonce;
        Ok(self.header.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_to_display_hex;
    use crate::header::BLOCK_VERSION;
    use crate::merkle::compute_merkle_root;
    use crate::target::MAX_COMPACT_TARGET_BITS;
    use crate::test_vectors::{GENESIS_BLOCK, GENESIS_HASH};
    use crate::transaction::{TxInput, TxOutput};

    fn coinbase(tag: u8) -> RawTransaction {
        RawTransaction::new(
            1,
            vec![TxInput::Coinbase { script: vec![0x03, tag, 0x00, 0x01], sequence: 0xffff_ffff }],
            vec![TxOutput { value: 5_000_000_000, script_pubkey: vec![0x51] }],
            0,
        )
    }

    fn spend(tag: u8) -> RawTransaction {
        RawTransaction::new(
            1,
            vec![TxInput::Spend {
                prev_txid: [tag; 32],
                prev_index: tag as u32,
                script_sig: vec![0x00, tag],
                sequence: 0xffff_ffff,
            }],
            vec![TxOutput { value: 1000 + tag as u64, script_pubkey: vec![0x52] }],
            0,
        )
    }

    fn transactions(n: usize) -> Vec<RawTransaction> {
        let mut txns = vec![coinbase(0)];
        txns.extend((1..n).map(|i| spend(i as u8)));
        txns
    }

    fn block(n: usize) -> Block {
        Block::new(100, BLOCK_VERSION, [0x77; 32], 1_700_000_000, 0x1d00ffff, 0, transactions(n)).unwrap()
    }

    #[test]
    fn test_genesis_block() {
        let bytes = hex::decode(GENESIS_BLOCK).unwrap();
        let (mut block, rest) = Block::<RawTransaction>::from_bytes(&bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(block.height, None);
        assert_eq!(block.transactions().len(), 1);
        assert_eq!(hash_to_display_hex(&block.hash()), GENESIS_HASH);
        assert_eq!(block.serialize(), bytes);

        // A single transaction is its own merkle root.
        let coinbase = block.coinbase_transaction().unwrap();
        assert_eq!(block.header().merkle_root_hash, coinbase.hash());

        assert!(block.check_valid_nonce(0x7c2bac1d).unwrap());
        assert!(!block.check_valid_nonce(0).unwrap());
    }

    #[test]
    fn test_from_bytes_leaves_remainder() {
        let mut bytes = hex::decode(GENESIS_BLOCK).unwrap();
        bytes.extend_from_slice(&[0xde, 0xad]);
        let (_, rest) = Block::<RawTransaction>::from_bytes(&bytes).unwrap();
        assert_eq!(rest, &[0xde, 0xad]);

        assert!(Block::<RawTransaction>::from_hex(&hex::encode(&bytes)).is_err());
        let genesis = Block::<RawTransaction>::from_hex(GENESIS_BLOCK).unwrap();
        assert_eq!(genesis.serialize_hex(), GENESIS_BLOCK);
    }

    #[test]
    fn test_from_bytes_truncated() {
        let bytes = hex::decode(GENESIS_BLOCK).unwrap();
        for cut in [0, 79, 80, 81, 200, bytes.len() - 1] {
            assert!(
                matches!(Block::<RawTransaction>::from_bytes(&bytes[..cut]), Err(Error::TruncatedInput { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_serialize_roundtrip_many_transactions() {
        for n in [1, 2, 3, 7, 300] {
            let block = block(n);
            let bytes = block.serialize();
            let (parsed, rest) = Block::<RawTransaction>::from_bytes(&bytes).unwrap();

            assert!(rest.is_empty());
            assert_eq!(parsed.serialize(), bytes, "n = {n}");
            assert_eq!(parsed.header(), block.header());
            assert_eq!(parsed.transactions(), block.transactions());
        }
    }

    #[test]
    fn test_tx_count_uses_compact_int() {
        let bytes = block(300).serialize();
        assert_eq!(&bytes[80..83], &[0xfd, 0x2c, 0x01]);
    }

    #[test]
    fn test_merkle_root_matches_transactions() {
        let block = block(5);
        let hashes: Vec<[u8; 32]> = block.transactions().iter().map(|tx| tx.hash()).collect();
        assert_eq!(block.header().merkle_root_hash, compute_merkle_root(&hashes));
    }

    #[test]
    fn test_coinbase_update_matches_full_rebuild() {
        for n in 2..=12 {
            let mut incremental = block(n);

            for tag in [1u8, 2, 3] {
                incremental.set_coinbase_transaction(coinbase(tag)).unwrap();

                let mut txns = transactions(n);
                txns[0] = coinbase(tag);
                let rebuilt = Block::new(100, BLOCK_VERSION, [0x77; 32], 1_700_000_000, 0x1d00ffff, 0, txns).unwrap();

                assert_eq!(incremental.header().merkle_root_hash, rebuilt.header().merkle_root_hash, "n = {n}");
                assert_eq!(incremental.merkle_tree(), rebuilt.merkle_tree());
                assert_eq!(incremental.serialize(), rebuilt.serialize());
            }
        }
    }

    #[test]
    fn test_invalid_coinbase_leaves_block_unchanged() {
        let mut block = block(4);
        let before_tx = block.coinbase_transaction().unwrap().clone();
        let before_root = block.header().merkle_root_hash;
        let before_bytes = block.serialize();

        let mut two_inputs = coinbase(9);
        two_inputs.inputs.push(two_inputs.inputs[0].clone());
        assert!(matches!(block.set_coinbase_transaction(two_inputs), Err(Error::InvalidCoinbase(_))));

        assert!(matches!(block.set_coinbase_transaction(spend(9)), Err(Error::InvalidCoinbase(_))));

        assert_eq!(block.coinbase_transaction(), Some(&before_tx));
        assert_eq!(block.header().merkle_root_hash, before_root);
        assert_eq!(block.serialize(), before_bytes);
    }

    #[test]
    fn test_constructors_require_coinbase_first() {
        let txns = vec![spend(1), coinbase(0)];
        assert!(matches!(
            Block::new(1, BLOCK_VERSION, [0; 32], 0, 0x1d00ffff, 0, txns),
            Err(Error::InvalidCoinbase(_))
        ));

        let mut empty = Block::<RawTransaction>::new(1, BLOCK_VERSION, [0; 32], 0, 0x1d00ffff, 0, vec![]).unwrap();
        assert_eq!(empty.header().merkle_root_hash, [0u8; 32]);
        assert!(matches!(empty.set_coinbase_transaction(coinbase(1)), Err(Error::UninitializedBlock(_))));
        assert!(matches!(empty.push_transaction(spend(1)), Err(Error::InvalidCoinbase(_))));
        assert!(empty.transactions().is_empty());
    }

    #[test]
    fn test_incremental_build() {
        let mut block = Block::<RawTransaction>::new(7, 1, [0; 32], 0, 0x1d00ffff, 0, vec![]).unwrap();
        block.set_version(BLOCK_VERSION);
        block.set_prev_block_hash([0x77; 32]);
        block.set_time(1_700_000_000);

        for tx in transactions(4) {
            block.push_transaction(tx).unwrap();
        }

        let expected = Block::new(7, BLOCK_VERSION, [0x77; 32], 1_700_000_000, 0x1d00ffff, 0, transactions(4)).unwrap();
        assert_eq!(block.serialize(), expected.serialize());

        block.set_transactions(transactions(2)).unwrap();
        assert_eq!(block.transactions().len(), 2);
        assert_eq!(block.header().merkle_root_hash, block.merkle_tree().root());
    }

    #[test]
    fn test_set_bits_updates_target() {
        let mut block = block(2);
        let before = *block.target();
        block.set_bits(0x1b0404cb).unwrap();
        assert_ne!(*block.target(), before);
        assert_eq!(block.header().bits, 0x1b0404cb);

        assert!(block.set_bits(0x02000001).is_err());
        assert_eq!(block.header().bits, 0x1b0404cb);
    }

    #[test]
    fn test_max_target_accepts_every_nonce() {
        let mut block = Block::<RawTransaction>::from_hex(GENESIS_BLOCK).unwrap();
        block.set_bits(MAX_COMPACT_TARGET_BITS).unwrap();
        for nonce in 0..256 {
            assert!(block.check_valid_nonce(nonce).unwrap(), "nonce {nonce}");
        }
    }

    #[test]
    fn test_zero_target_rejects_every_nonce() {
        let mut block = block(3);
        block.set_bits(0x03000000).unwrap();
        assert!(block.target().is_zero());
        for nonce in (0..u32::MAX).step_by(1 << 24) {
            assert!(!block.check_valid_nonce(nonce).unwrap());
        }
    }

    #[test]
    fn test_compute_hash_sets_nonce() {
        let mut block = block(2);
        let hash = block.compute_hash(12345).unwrap();
        assert_eq!(block.header().nonce, 12345);
        assert_eq!(block.hash(), hash);
    }
}
