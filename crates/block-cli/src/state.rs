//! Reports printed by the CLI as JSON.

use block_core::hash::hash_to_display_hex;
use block_core::target::{bits_to_difficulty, decode_compact_target, encode_compact_target, target_to_bytes};
use block_core::{Block, BlockHeader, RawTransaction, Transaction};
use serde::Serialize;

/// Mining statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MiningStats {
    /// Total hashes computed.
    pub total_hashes: u64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Human-readable hash rate.
    pub hash_rate_display: String,
    /// Batches scanned.
    pub batches: u32,
    /// Extra nonce of the current coinbase.
    pub extra_nonce: u64,
    /// Whether a valid block was found.
    pub block_found: bool,
    /// Winning nonce.
    pub nonce: Option<u32>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
    /// Best hash found (display order).
    pub best_hash: Option<String>,
    /// Number of leading zeros in best hash.
    pub best_leading_zeros: u32,
    /// Serialized header of the found block.
    pub header_hex: Option<String>,
    /// Serialized coinbase of the found block.
    pub coinbase_hex: Option<String>,
}

impl MiningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.total_hashes as f64) / (self.elapsed_ms / 1000.0);
        }
        self.hash_rate_display = self.format_hash_rate();
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }
}

/// Format difficulty with SI suffix.
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty.is_infinite() {
        "inf".to_string()
    } else if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.2}", difficulty)
    }
}

/// Decoded compact target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub bits: String,
    /// Full target, 32 bytes big-endian hex.
    pub target: String,
    /// Bits produced by encoding the target again.
    pub reencoded_bits: String,
    pub difficulty: f64,
    pub difficulty_display: String,
}

impl TargetReport {
    pub fn from_bits(bits: u32) -> block_core::Result<Self> {
        let target = decode_compact_target(bits)?;
        let difficulty = bits_to_difficulty(bits)?;
        Ok(TargetReport {
            bits: format!("{bits:#010x}"),
            target: hex::encode(target_to_bytes(&target)),
            reencoded_bits: format!("{:#010x}", encode_compact_target(&target)),
            difficulty,
            difficulty_display: format_difficulty(difficulty),
        })
    }
}

/// Parsed block header.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    /// Header hash (display format).
    pub hash: String,
    pub version: u32,
    /// Previous block hash (display format).
    pub prev_hash: String,
    /// Merkle root (display format).
    pub merkle_root: String,
    pub time: u32,
    pub nonce: u32,
    pub target: TargetReport,
    /// Whether the hash is below the target.
    pub meets_target: bool,
}

impl HeaderReport {
    pub fn new(header: &BlockHeader) -> block_core::Result<Self> {
        let target = TargetReport::from_bits(header.bits)?;
        let meets_target = block_core::target::hash_meets_target(
            &header.hash(),
            &decode_compact_target(header.bits)?,
        );
        Ok(HeaderReport {
            hash: header.display_hash(),
            version: header.version,
            prev_hash: hash_to_display_hex(&header.prev_block_hash),
            merkle_root: hash_to_display_hex(&header.merkle_root_hash),
            time: header.time,
            nonce: header.nonce,
            target,
            meets_target,
        })
    }
}

/// Summary of a parsed block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub header: HeaderReport,
    pub size: usize,
    pub tx_count: usize,
    /// Transaction IDs (display format).
    pub txids: Vec<String>,
    /// Whether the merkle root in the input matched the transactions.
    pub merkle_root_valid: bool,
}

impl BlockReport {
    /// `header` is the header exactly as it appeared in the input. The parsed
    /// `block` carries the merkle root recomputed from its transactions.
    pub fn new(header: &BlockHeader, block: &Block<RawTransaction>, size: usize) -> block_core::Result<Self> {
        Ok(BlockReport {
            header: HeaderReport::new(header)?,
            merkle_root_valid: block.header().merkle_root_hash == header.merkle_root_hash,
            size,
            tx_count: block.transactions().len(),
            txids: block.transactions().iter().map(|tx| hash_to_display_hex(&tx.hash())).collect(),
        })
    }
}

/// Block subsidy at a height.
#[derive(Debug, Clone, Serialize)]
pub struct RewardReport {
    pub height: u64,
    /// Block reward in satoshis.
    pub reward: u64,
    /// Block reward in BTC.
    pub reward_btc: f64,
}

impl RewardReport {
    pub fn new(height: u64) -> Self {
        let reward = block_core::compute_reward(height);
        RewardReport {
            height,
            reward,
            reward_btc: reward as f64 / 100_000_000.0,
        }
    }
}
