//! Error taxonomy shared by the math, reader and position modules.
//!
//! Math-domain violations fail fast and are never clamped. Batch slot failures
//! are carried per index inside the result list rather than failing the batch.

use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Tick outside `[MIN_TICK, MAX_TICK]`, unordered range, unaligned to spacing,
    /// or a sqrt price outside the representable ratio range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("invalid slippage tolerance {0}%, expected a value in [0, 100)")]
    InvalidTolerance(f64),

    #[error("invalid removal percentage {0}, expected 1..=100")]
    InvalidPercent(u8),

    /// A single batch slot failed to execute or decode.
    #[error("decode error at slot {index}: {reason}")]
    Decode { index: usize, reason: String },

    /// On-chain revert, typically because execution breached the guarded minimum.
    #[error("transaction {tx_hash} reverted on-chain (insufficient output or other revert)")]
    InsufficientOutput { tx_hash: TxHash },

    #[error("network timeout after {0} ms during {1}")]
    NetworkTimeout(u64, &'static str),

    #[error("operation cancelled during {0}")]
    Cancelled(&'static str),

    #[error("chain mismatch: wallet on {active}, position on {expected}: {reason}")]
    ChainMismatch {
        active: u64,
        expected: u64,
        reason: String,
    },

    /// The user (or signer) declined to sign.
    #[error("submission rejected by signer: {0}")]
    SubmissionRejected(String),

    #[error("pool does not match position: {0}")]
    PoolMismatch(String),

    #[error("event {event} is not valid in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("invalid pool state: {0}")]
    InvalidPoolState(String),

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("indexer error: {0}")]
    Indexer(String),
}

impl CoreError {
    /// True for failures caused by the network layer rather than the user or the chain.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            CoreError::NetworkTimeout(..) | CoreError::Rpc(_) | CoreError::Indexer(_)
        )
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
