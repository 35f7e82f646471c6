//! Error type shared by every parser and block mutator.

use thiserror::Error;

/// Errors raised by the block model.
///
/// None of these are transient: each one is a malformed input or a call made
/// before its precondition holds, so callers fix the input rather than retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte stream ended before a field or record was complete.
    #[error("truncated input: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// Well-formed bytes carrying a value that makes no sense.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// A coinbase assignment with the wrong input count or input kind.
    #[error("invalid coinbase: {0}")]
    InvalidCoinbase(String),

    /// A block was queried before a required field was set.
    #[error("uninitialized block: {0}")]
    UninitializedBlock(&'static str),
}

impl Error {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Error::TruncatedInput { needed, available }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
