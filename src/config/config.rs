use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::position::StepTimeouts;

/// Chain RPC endpoint and multicall batching configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RpcSettings {
    pub url: String,
    pub chain_id: u64,
    #[serde(default = "default_multicall_address")]
    pub multicall_address: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    /// Calls per `aggregate3` when reads are chunked
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_multicall_address() -> String {
    // Multicall3, same address on every major EVM chain
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_max_batch_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

impl RpcSettings {
    pub fn multicall(&self) -> Result<Address, ConfigError> {
        parse_address("rpc.multicall_address", &self.multicall_address)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Subgraph endpoint used for volume history and TVL.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    pub subgraph_url: String,
    #[serde(default = "default_indexer_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_indexer_timeout_ms() -> u64 {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Position manager and submission settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PositionSettings {
    #[serde(default = "default_position_manager_address")]
    pub position_manager_address: String,
    #[serde(default = "default_slippage_percent")]
    pub slippage_percent: f64,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_wallet_timeout_secs")]
    pub wallet_timeout_secs: u64,
    #[serde(default = "default_queue_timeout_secs")]
    pub queue_timeout_secs: u64,
    #[serde(default = "default_signature_timeout_secs")]
    pub signature_timeout_secs: u64,
    #[serde(default = "default_broadcast_timeout_secs")]
    pub broadcast_timeout_secs: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_position_manager_address() -> String {
    "0xC36442b4a4522E871399CD717aBDD847Ab11FE88".to_string()
}

fn default_slippage_percent() -> f64 {
    crate::utils::DEFAULT_SLIPPAGE_PERCENT
}

fn default_deadline_secs() -> u64 {
    1_200
}

fn default_wallet_timeout_secs() -> u64 {
    60
}

fn default_queue_timeout_secs() -> u64 {
    300
}

fn default_signature_timeout_secs() -> u64 {
    120
}

fn default_broadcast_timeout_secs() -> u64 {
    15
}

fn default_receipt_timeout_secs() -> u64 {
    180
}

fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

impl Default for PositionSettings {
    fn default() -> Self {
        Self {
            position_manager_address: default_position_manager_address(),
            slippage_percent: default_slippage_percent(),
            deadline_secs: default_deadline_secs(),
            wallet_timeout_secs: default_wallet_timeout_secs(),
            queue_timeout_secs: default_queue_timeout_secs(),
            signature_timeout_secs: default_signature_timeout_secs(),
            broadcast_timeout_secs: default_broadcast_timeout_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

impl PositionSettings {
    pub fn position_manager(&self) -> Result<Address, ConfigError> {
        parse_address(
            "position.position_manager_address",
            &self.position_manager_address,
        )
    }

    pub fn step_timeouts(&self) -> StepTimeouts {
        StepTimeouts {
            wallet: Duration::from_secs(self.wallet_timeout_secs),
            queue: Duration::from_secs(self.queue_timeout_secs),
            signature: Duration::from_secs(self.signature_timeout_secs),
            broadcast: Duration::from_secs(self.broadcast_timeout_secs),
            receipt: Duration::from_secs(self.receipt_timeout_secs),
            poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
        }
    }
}

/// Pools and positions the service polls.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchSettings {
    #[serde(default)]
    pub pools: Vec<String>,
    /// Position NFT ids
    #[serde(default)]
    pub positions: Vec<u64>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            pools: Vec::new(),
            positions: Vec::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl WatchSettings {
    pub fn pool_addresses(&self) -> Result<Vec<Address>, ConfigError> {
        self.pools
            .iter()
            .map(|p| parse_address("watch.pools", p))
            .collect()
    }
}

/// Root application configuration.
///
/// Loaded from `config.{yaml,toml}` at startup; any key can be overridden
/// through `CONCENTRA_<SECTION>__<KEY>` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: RpcSettings,
    #[serde(default)]
    pub indexer: Option<IndexerSettings>,
    #[serde(default)]
    pub position: PositionSettings,
    #[serde(default)]
    pub watch: WatchSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("CONCENTRA").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value)
        .map_err(|e| ConfigError::Message(format!("{key}: invalid address {value}: {e}")))
}
