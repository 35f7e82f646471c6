//! The 80-byte Bitcoin block header.

use crate::codec::{pack_u32, unpack_hash, unpack_u32};
use crate::error::{Error, Result};
use crate::hash::{double_sha256, hash_to_display_hex};

/// Size of a serialized block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Block version with BIP9 versionbits signaling.
pub const BLOCK_VERSION: u32 = 0x2000_0000;

/// A Bitcoin block header (80 bytes).
///
/// The hash is never cached: it is recomputed from the current fields on every
/// call, so the nonce can be changed freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: u32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions (internal byte order).
    pub merkle_root_hash: [u8; 32],
    /// Block timestamp (Unix time).
    pub time: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header.
    pub fn new(
        version: u32,
        prev_block_hash: [u8; 32],
        merkle_root_hash: [u8; 32],
        time: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        BlockHeader {
            version,
            prev_block_hash,
            merkle_root_hash,
            time,
            bits,
            nonce,
        }
    }

    /// Parse a header from the front of `bytes`, returning the remainder.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(Error::truncated(BLOCK_HEADER_SIZE, bytes.len()));
        }

        let (version, rest) = unpack_u32(bytes)?;
        let (prev_block_hash, rest) = unpack_hash(rest)?;
        let (merkle_root_hash, rest) = unpack_hash(rest)?;
        let (time, rest) = unpack_u32(rest)?;
        let (bits, rest) = unpack_u32(rest)?;
        let (nonce, rest) = unpack_u32(rest)?;

        let header = BlockHeader::new(version, prev_block_hash, merkle_root_hash, time, bits, nonce);
        Ok((header, rest))
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];

        header[0..4].copy_from_slice(&pack_u32(self.version));
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root_hash);
        header[68..72].copy_from_slice(&pack_u32(self.time));
        header[72..76].copy_from_slice(&pack_u32(self.bits));
        header[76..80].copy_from_slice(&pack_u32(self.nonce));

        header
    }

    /// The first SHA-256 block of the serialized header: version, previous
    /// hash and the first 28 bytes of the merkle root.
    pub(crate) fn first_block(&self) -> [u8; 64] {
        let mut block = [0u8; 64];
        block[0..4].copy_from_slice(&pack_u32(self.version));
        block[4..36].copy_from_slice(&self.prev_block_hash);
        block[36..64].copy_from_slice(&self.merkle_root_hash[..28]);
        block
    }

    /// Serialized header bytes 64..80: the rest of the merkle root, time,
    /// bits and nonce.
    pub(crate) fn tail(&self) -> [u8; 16] {
        let mut tail = [0u8; 16];
        tail[0..4].copy_from_slice(&self.merkle_root_hash[28..]);
        tail[4..8].copy_from_slice(&pack_u32(self.time));
        tail[8..12].copy_from_slice(&pack_u32(self.bits));
        tail[12..16].copy_from_slice(&pack_u32(self.nonce));
        tail
    }

    /// Compute the block hash (double SHA256), internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// The block hash as it is conventionally displayed (reversed hex).
    pub fn display_hash(&self) -> String {
        hash_to_display_hex(&self.hash())
    }
}
