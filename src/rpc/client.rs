use std::future::Future;

use alloy::{
    primitives::{Address, Bytes, TxHash},
    providers::{DynProvider, Provider, ProviderBuilder},
};
use log::debug;
use url::Url;

use crate::{
    abis::{Call3, IMulticall3, McResult},
    error::{CoreError, Result},
};

/// Chain RPC operations the engine depends on.
pub trait RpcClient: Send + Sync {
    /// Execute one `aggregate3` read against the multicall contract.
    /// Returns one `McResult` per call, in call order.
    fn aggregate3(
        &self,
        multicall: Address,
        calls: Vec<Call3>,
    ) -> impl Future<Output = Result<Vec<McResult>>> + Send;

    /// Broadcast a signed transaction and return its hash.
    fn send_raw_transaction(&self, raw: Bytes) -> impl Future<Output = Result<TxHash>> + Send;

    /// `Some(success)` once the transaction is mined, `None` while pending.
    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<bool>>> + Send;
}

/// [`RpcClient`] backed by an alloy HTTP provider.
#[derive(Clone)]
pub struct AlloyRpcClient {
    provider: DynProvider,
}

impl AlloyRpcClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url)
            .map_err(|e| CoreError::Rpc(format!("invalid RPC url {rpc_url}: {e}")))?;

        let client = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider: DynProvider::new(client),
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

impl RpcClient for AlloyRpcClient {
    async fn aggregate3(&self, multicall: Address, calls: Vec<Call3>) -> Result<Vec<McResult>> {
        let count = calls.len();
        let multicall = IMulticall3::new(multicall, &self.provider);

        let results = multicall
            .aggregate3(calls)
            .call()
            .await
            .map_err(|e| CoreError::Rpc(format!("multicall aggregate3 failed: {e}")))?;

        debug!("aggregate3 returned {} results for {} calls", results.len(), count);
        Ok(results)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| CoreError::Rpc(format!("send_raw_transaction failed: {e}")))?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<bool>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| CoreError::Rpc(format!("get_transaction_receipt failed: {e}")))?;

        Ok(receipt.map(|r| r.status()))
    }
}
