//! SHA256 double-hashing, header midstates and byte-order helpers.

use core::slice;

use sha2::compress256;
use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};

/// SHA-256 initial hash value (FIPS 180-4, section 5.3.3).
const SHA256_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is used for block header hashing, transaction IDs, and merkle trees.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Double SHA256 of two concatenated 32-byte hashes (a merkle parent).
#[inline]
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

#[inline]
fn compress(state: &mut [u32; 8], block: &[u8; 64]) {
    compress256(state, slice::from_ref(GenericArray::from_slice(block)));
}

#[inline]
fn state_to_bytes(state: &[u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// SHA-256 compression state after the first 64 bytes of a block header.
///
/// The first 64 header bytes (version, previous hash and 28 bytes of the
/// merkle root) do not change while the nonce is searched, so each trial only
/// compresses the last 16 bytes plus padding, then runs the second SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Midstate([u32; 8]);

impl Midstate {
    /// Compress one 64-byte block starting from the SHA-256 IV.
    pub fn from_block(block: &[u8; 64]) -> Self {
        let mut state = SHA256_IV;
        compress(&mut state, block);
        Midstate(state)
    }

    /// Finish the double SHA256 of an 80-byte header whose first 64 bytes
    /// produced this midstate. `tail` is header bytes 64..80.
    pub fn header_hash(&self, tail: &[u8; 16]) -> [u8; 32] {
        // Second block of the 80-byte message: tail, 0x80, zeros, bit length.
        let mut block = [0u8; 64];
        block[..16].copy_from_slice(tail);
        block[16] = 0x80;
        block[56..].copy_from_slice(&(80u64 * 8).to_be_bytes());

        let mut state = self.0;
        compress(&mut state, &block);

        // Outer hash: the 32-byte digest fits in a single padded block.
        let mut block = [0u8; 64];
        block[..32].copy_from_slice(&state_to_bytes(&state));
        block[32] = 0x80;
        block[56..].copy_from_slice(&(32u64 * 8).to_be_bytes());

        let mut state = SHA256_IV;
        compress(&mut state, &block);
        state_to_bytes(&state)
    }

    /// The state words, big-endian, as handed to external mining hardware.
    pub fn to_bytes(&self) -> [u8; 32] {
        state_to_bytes(&self.0)
    }
}

/// Reverse the byte order of a 32-byte array.
///
/// Bitcoin often displays hashes in reverse byte order (little-endian display).
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Parse a display-order hex hash back into internal byte order.
pub fn display_hex_to_hash(s: &str) -> crate::Result<[u8; 32]> {
    let bytes = crate::codec::hex_to_bytes(s)?;
    let display: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        crate::Error::DecodeError(format!("hash must be 32 bytes, got {}", bytes.len()))
    })?;
    Ok(reverse_bytes(&display))
}

/// Count leading zero bits in the DISPLAYED hash format.
///
/// Displayed hashes are byte-reversed, so the zeros you see at the front of a
/// block hash are the trailing bytes of the internal array.
pub fn count_leading_zeros(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}
