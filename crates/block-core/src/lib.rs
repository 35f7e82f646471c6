//! Bitcoin block data model for mining.
//!
//! This crate provides pure Rust implementations of:
//! - Wire-format primitives (compact-size integers, var-strings, script pushes)
//! - Block header and legacy transaction parsing and serialization
//! - An arena merkle tree with incremental coinbase updates
//! - Compact "bits" target conversion, difficulty and the subsidy schedule
//! - Full and compact (midstate) blocks sharing one proof-of-work contract

pub mod block;
pub mod codec;
pub mod coinbase;
pub mod compact;
pub mod error;
pub mod hash;
pub mod header;
pub mod merkle;
pub mod pow;
pub mod target;
pub mod transaction;

#[cfg(test)]
mod test_vectors;

pub use block::Block;
pub use codec::{OpcodeTable, StandardOpcodes};
pub use coinbase::CoinbaseBuilder;
pub use compact::CompactBlock;
pub use error::{Error, Result};
pub use hash::{double_sha256, hash_to_display_hex, Midstate};
pub use header::{BlockHeader, BLOCK_HEADER_SIZE, BLOCK_VERSION};
pub use merkle::{compute_merkle_root, fold_merkle_edge, MerkleNode, MerkleTree};
pub use pow::{search_nonces, CoinbaseSlot, ProofOfWork, SearchResult};
pub use target::{bits_to_difficulty, compute_reward, decode_compact_target, encode_compact_target, U256};
pub use transaction::{RawTransaction, Transaction, TxInput, TxOutput};
