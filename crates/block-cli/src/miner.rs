//! Mining controller: a compact block, a coinbase builder and nonce batches.

use std::time::Instant;

use block_core::hash::{count_leading_zeros, hash_to_display_hex};
use block_core::{
    compute_reward, search_nonces, CoinbaseBuilder, CoinbaseSlot, CompactBlock, RawTransaction,
    SearchResult, Transaction,
};

use crate::state::MiningStats;

/// Everything needed to build the block being mined.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub height: u32,
    pub version: u32,
    /// Previous block hash (internal byte order).
    pub prev_block_hash: [u8; 32],
    pub time: u32,
    pub bits: u32,
    /// Output script receiving the reward.
    pub payout_script: Vec<u8>,
    /// Transaction fees added to the subsidy.
    pub fees: u64,
    /// Merkle edge of the other transactions, bottom-up.
    pub merkle_edge: Vec<[u8; 32]>,
}

/// The main mining controller.
pub struct Miner {
    /// The block being mined.
    block: CompactBlock<RawTransaction>,
    /// Rebuilds the coinbase on every extra nonce change.
    coinbase: CoinbaseBuilder,
    /// Coinbase output value.
    reward: u64,
    /// Mining statistics.
    stats: MiningStats,
    /// First nonce of the next batch; 2^32 means the range is spent.
    next_nonce: u64,
    /// Extra nonce for merkle root variation.
    extra_nonce: u64,
    /// Best hash found so far.
    best_hash: Option<[u8; 32]>,
}

impl Miner {
    /// Build the coinbase with `extra_nonce` and install it in a new compact
    /// block.
    pub fn new(config: MinerConfig, extra_nonce: u64) -> block_core::Result<Self> {
        let reward = compute_reward(config.height as u64).saturating_add(config.fees);
        let coinbase = CoinbaseBuilder::new(config.height, config.payout_script)
            .with_extra_nonce(extra_nonce.to_le_bytes());

        let block = CompactBlock::new(
            config.height,
            config.version,
            config.prev_block_hash,
            config.time,
            config.bits,
            config.merkle_edge,
            Some(coinbase.build(reward)),
        )?;

        let mut stats = MiningStats::new();
        stats.extra_nonce = extra_nonce;

        Ok(Miner {
            block,
            coinbase,
            reward,
            stats,
            next_nonce: 0,
            extra_nonce,
            best_hash: None,
        })
    }

    pub fn block(&self) -> &CompactBlock<RawTransaction> {
        &self.block
    }

    pub fn stats(&self) -> &MiningStats {
        &self.stats
    }

    /// Scan the next `batch_size` nonces. Once the nonce range is spent the
    /// extra nonce is bumped and scanning restarts at zero.
    pub fn mine_batch(&mut self, batch_size: u32) -> block_core::Result<SearchResult> {
        if self.next_nonce > u32::MAX as u64 {
            self.rotate_extra_nonce()?;
        }

        let start = self.next_nonce as u32;
        let result = search_nonces(&mut self.block, start, batch_size)?;

        self.stats.total_hashes += result.hashes_computed;
        self.stats.batches += 1;
        self.next_nonce = start as u64 + result.hashes_computed;

        if let Some((_, hash)) = result.best {
            // Display-order comparison: lower is better.
            let is_better = self
                .best_hash
                .map_or(true, |best| hash.iter().rev().lt(best.iter().rev()));
            if is_better {
                self.best_hash = Some(hash);
                self.stats.best_hash = Some(hash_to_display_hex(&hash));
                self.stats.best_leading_zeros = count_leading_zeros(&hash);
            }
        }

        if let Some((nonce, hash)) = result.found {
            log::info!("block found: nonce {nonce:#010x}, hash {}", hash_to_display_hex(&hash));
            self.stats.block_found = true;
            self.stats.nonce = Some(nonce);
            self.stats.header_hex = Some(hex::encode(self.block.header().serialize()));
            self.stats.coinbase_hex = self.block.coinbase_transaction().map(|tx| hex::encode(tx.serialize()));
        }

        Ok(result)
    }

    /// Run batches until a block is found or `max_batches` have been scanned.
    pub fn run(&mut self, batch_size: u32, max_batches: u32) -> block_core::Result<&MiningStats> {
        let started = Instant::now();

        for _ in 0..max_batches {
            let result = self.mine_batch(batch_size)?;

            self.stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            self.stats.update_hash_rate();
            log::debug!(
                "batch {}: {} hashes, {}, best {} leading zeros",
                self.stats.batches,
                self.stats.total_hashes,
                self.stats.hash_rate_display,
                self.stats.best_leading_zeros
            );

            if result.block_found() {
                break;
            }
        }

        Ok(&self.stats)
    }

    /// Switch to the next extra nonce and restart the nonce range.
    fn rotate_extra_nonce(&mut self) -> block_core::Result<()> {
        self.extra_nonce = self.extra_nonce.wrapping_add(1);
        self.coinbase.set_extra_nonce(&self.extra_nonce.to_le_bytes());
        self.block.set_coinbase_transaction(self.coinbase.build(self.reward))?;

        self.next_nonce = 0;
        self.stats.extra_nonce = self.extra_nonce;
        log::debug!("nonce range exhausted, extra nonce now {}", self.extra_nonce);
        Ok(())
    }
}
