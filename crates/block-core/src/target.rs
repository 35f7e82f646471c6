//! Compact "bits" target conversion, difficulty and the subsidy schedule.

use crate::error::{Error, Result};

// Own scope: the generated `FromStr` impl names the std `Result`.
mod u256 {
    use uint::construct_uint;

    construct_uint! {
        /// Unsigned 256-bit integer used for proof-of-work targets.
        pub struct U256(4);
    }
}

pub use u256::U256;

/// Compact bits of the difficulty-1 target (the genesis block's bits).
pub const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

/// The largest target the compact encoding can express within 256 bits,
/// `0xffffff * 256^29`.
pub const MAX_COMPACT_TARGET_BITS: u32 = 0x20ff_ffff;

/// The difficulty-1 target, `0xffff * 2^208`.
pub const DIFFICULTY_ONE_TARGET: U256 = U256([0, 0, 0, 0x0000_0000_ffff_0000]);

/// Blocks between subsidy halvings.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Subsidy of the first era, 50 BTC in satoshis.
pub const INITIAL_SUBSIDY: u64 = 5_000_000_000;

/// Convert compact "bits" to the full target.
///
/// The bits format is `[exponent (1 byte)][mantissa (3 bytes)]` and the target
/// is `mantissa * 256^(exponent - 3)`. An exponent below 3 would need a
/// negative shift and is rejected, as is any target that does not fit in 256
/// bits.
pub fn decode_compact_target(bits: u32) -> Result<U256> {
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x00ff_ffff;

    if exponent < 3 {
        return Err(Error::DecodeError(format!(
            "compact target {bits:#010x} has exponent {exponent}, minimum is 3"
        )));
    }

    if mantissa == 0 {
        return Ok(U256::zero());
    }

    let shift = 8 * (exponent - 3);
    let mantissa_bits = 32 - mantissa.leading_zeros() as usize;
    if shift + mantissa_bits > 256 {
        return Err(Error::DecodeError(format!(
            "compact target {bits:#010x} overflows 256 bits"
        )));
    }

    Ok(U256::from(mantissa) << shift)
}

/// Convert a target back to compact "bits".
///
/// Lossy: only the top three significant bytes survive. The exponent never
/// drops below 3, so the result always decodes.
pub fn encode_compact_target(target: &U256) -> u32 {
    let mut size = ((target.bits() + 7) / 8).max(3);
    let mut mantissa = (*target >> (8 * (size - 3))).low_u32();

    // Bit 23 of the mantissa reads as a sign; push it into a spare byte.
    if mantissa & 0x0080_0000 != 0 {
        mantissa >>= 8;
        size += 1;
    }

    ((size as u32) << 24) | mantissa
}

/// Calculate difficulty from bits.
///
/// Difficulty = difficulty_1_target / current_target. A zero target can never
/// be met and reports infinite difficulty.
pub fn bits_to_difficulty(bits: u32) -> Result<f64> {
    let target = decode_compact_target(bits)?;
    if target.is_zero() {
        return Ok(f64::INFINITY);
    }
    Ok(u256_to_f64(&DIFFICULTY_ONE_TARGET) / u256_to_f64(&target))
}

/// Approximate a 256-bit value as `f64` from its top 64 significant bits.
fn u256_to_f64(value: &U256) -> f64 {
    let bits = value.bits();
    if bits <= 64 {
        return value.low_u64() as f64;
    }
    let shift = bits - 64;
    ((*value >> shift).low_u64() as f64) * 2f64.powi(shift as i32)
}

/// Block subsidy in satoshis for a given height.
///
/// The subsidy halves every 210,000 blocks, starting at 50 BTC. Each halving
/// is an integer right shift of the initial subsidy, so amounts are exact
/// satoshis and reach zero after 33 eras.
pub fn compute_reward(height: u64) -> u64 {
    let era = height / HALVING_INTERVAL;
    if era >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY >> era
}

/// Check an internal-order hash against a target.
///
/// The hash is read as a little-endian number, which is the same as reversing
/// it into display order and reading big-endian. Valid proof of work needs the
/// hash strictly below the target.
#[inline]
pub fn hash_meets_target(hash: &[u8; 32], target: &U256) -> bool {
    U256::from_little_endian(hash) < *target
}

/// The target as 32 big-endian bytes.
pub fn target_to_bytes(target: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    target.to_big_endian(&mut bytes);
    bytes
}
