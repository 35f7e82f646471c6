//! The proof-of-work and coinbase contracts shared by [`Block`](crate::Block)
//! and [`CompactBlock`](crate::CompactBlock), and a nonce search over either.

use crate::error::{Error, Result};
use crate::hash::count_leading_zeros;
use crate::target::{hash_meets_target, U256};
use crate::transaction::Transaction;

/// A header whose nonce can be searched.
pub trait ProofOfWork {
    /// Target decoded from the header's current bits.
    fn target(&self) -> &U256;

    /// Write `nonce` into the header and return the header hash (internal
    /// byte order).
    fn compute_hash(&mut self, nonce: u32) -> Result<[u8; 32]>;

    /// Whether `nonce` gives a header hash strictly below the target.
    fn check_valid_nonce(&mut self, nonce: u32) -> Result<bool> {
        let hash = self.compute_hash(nonce)?;
        Ok(hash_meets_target(&hash, self.target()))
    }
}

/// Read and replace the coinbase transaction.
pub trait CoinbaseSlot<T: Transaction> {
    fn coinbase_transaction(&self) -> Option<&T>;

    /// Validate and install a new coinbase, updating the merkle root. On
    /// error nothing is changed.
    fn set_coinbase_transaction(&mut self, tx: T) -> Result<()>;
}

/// Check that `tx` can be a coinbase: exactly one input, of coinbase kind.
pub fn validate_coinbase<T: Transaction>(tx: &T) -> Result<()> {
    let inputs = tx.input_count();
    if inputs != 1 {
        return Err(Error::InvalidCoinbase(format!(
            "coinbase must have exactly one input, found {inputs}"
        )));
    }
    if !tx.is_coinbase_input(0) {
        return Err(Error::InvalidCoinbase(
            "coinbase input spends a previous output".into(),
        ));
    }
    Ok(())
}

/// Outcome of scanning a range of nonces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// The winning nonce and its hash, if one met the target.
    pub found: Option<(u32, [u8; 32])>,
    /// The nonce whose hash had the most leading zeros (display order).
    pub best: Option<(u32, [u8; 32])>,
    /// Number of hashes computed.
    pub hashes_computed: u64,
}

impl SearchResult {
    pub fn block_found(&self) -> bool {
        self.found.is_some()
    }
}

/// Try `nonce_count` nonces starting at `nonce_start`, stopping at the first
/// one that meets the target. The range is clipped at `u32::MAX` rather than
/// wrapping.
///
/// On success the header keeps the winning nonce.
pub fn search_nonces<P: ProofOfWork + ?Sized>(
    work: &mut P,
    nonce_start: u32,
    nonce_count: u32,
) -> Result<SearchResult> {
    let nonce_end = (nonce_start as u64 + nonce_count as u64).min(1u64 << 32);
    let mut best: Option<(u32, [u8; 32], u32)> = None;
    let mut hashes_computed = 0u64;

    for nonce in nonce_start as u64..nonce_end {
        let nonce = nonce as u32;
        let hash = work.compute_hash(nonce)?;
        hashes_computed += 1;

        if hash_meets_target(&hash, work.target()) {
            log::debug!("nonce {nonce:#010x} meets target after {hashes_computed} hashes");
            return Ok(SearchResult {
                found: Some((nonce, hash)),
                best: Some((nonce, hash)),
                hashes_computed,
            });
        }

        let leading_zeros = count_leading_zeros(&hash);
        if best.map_or(true, |(_, _, best_zeros)| leading_zeros > best_zeros) {
            best = Some((nonce, hash, leading_zeros));
        }
    }

    log::trace!("no solution in {hashes_computed} nonces from {nonce_start:#010x}");
    Ok(SearchResult {
        found: None,
        best: best.map(|(nonce, hash, _)| (nonce, hash)),
        hashes_computed,
    })
}
