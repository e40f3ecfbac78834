//! Aggregated on-chain reads.
//!
//! - [`batch`] - generic multicall batching with per-slot decode
//! - [`pool`] - pool, position and token reads built on top of it

mod batch;
mod pool;

pub use batch::{BatchCall, BatchReader, BatchResult};
pub use pool::PoolReader;
