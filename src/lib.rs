pub mod abis;
pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod position;
pub mod reader;
pub mod rpc;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use error::{CoreError, Result};
pub use indexer::IndexerClient;
pub use position::{OperationRunner, PositionOperationBuilder, RemovalOperation};
pub use reader::{BatchReader, PoolReader};
pub use rpc::{AlloyRpcClient, RpcClient, Signer};
