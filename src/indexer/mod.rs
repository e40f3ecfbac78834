mod cache;
mod client;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use client::{parse_pool_metrics, parse_volume_samples, pool_id, IndexerClient, PoolMetrics};
