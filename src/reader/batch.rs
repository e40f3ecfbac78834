use std::sync::Arc;
use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    abis::Call3,
    error::{CoreError, Result},
    rpc::{bounded, RpcClient},
};

type Decoder<T> = Box<dyn Fn(&[u8]) -> std::result::Result<T, String> + Send + Sync>;

/// One read in a batch: target, encoded call data, and the decoder for its
/// return data.
pub struct BatchCall<T> {
    pub target: Address,
    pub call_data: Bytes,
    decoder: Decoder<T>,
}

impl<T: 'static> BatchCall<T> {
    /// Build a call from an ABI call value, mapping its decoded return into `T`.
    pub fn new<C, F>(target: Address, call: C, map: F) -> Self
    where
        C: SolCall + 'static,
        F: Fn(C::Return) -> T + Send + Sync + 'static,
    {
        Self::try_new(target, call, move |ret| Ok(map(ret)))
    }

    /// Like [`BatchCall::new`] but the mapping may reject the decoded value.
    pub fn try_new<C, F>(target: Address, call: C, map: F) -> Self
    where
        C: SolCall + 'static,
        F: Fn(C::Return) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        Self {
            target,
            call_data: call.abi_encode().into(),
            decoder: Box::new(move |data: &[u8]| {
                let ret = C::abi_decode_returns(data).map_err(|e| e.to_string())?;
                map(ret)
            }),
        }
    }
}

impl<T> BatchCall<T> {
    fn decode(&self, data: &[u8]) -> std::result::Result<T, String> {
        (self.decoder)(data)
    }
}

/// Per-slot outcome list, same length and order as the input calls.
pub type BatchResult<T> = Vec<Result<T>>;

/// Aggregates independent contract reads into one multicall round trip.
///
/// A reverted or undecodable slot becomes `Err(CoreError::Decode)` at its own
/// index and never affects the other slots. Transport failures, timeouts and
/// cancellation fail the whole batch; nothing partial is returned.
pub struct BatchReader<R> {
    rpc: Arc<R>,
    multicall_address: Address,
    timeout: Duration,
    max_batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl<R> Clone for BatchReader<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: self.rpc.clone(),
            multicall_address: self.multicall_address,
            timeout: self.timeout,
            max_batch_size: self.max_batch_size,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }
}

impl<R: RpcClient> BatchReader<R> {
    pub fn new(rpc: Arc<R>, multicall_address: Address, timeout: Duration) -> Self {
        Self {
            rpc,
            multicall_address,
            timeout,
            max_batch_size: 100,
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }

    /// Chunk size used by [`BatchReader::read_chunked`].
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Attempts and backoff base used by [`BatchReader::read_with_retry`].
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Execute all calls in a single `aggregate3` and decode each slot.
    pub async fn read<T>(
        &self,
        calls: &[BatchCall<T>],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<T>> {
        self.read_at(calls, 0, cancel).await
    }

    /// All-or-nothing wrapper over [`BatchReader::read`]: the first failed slot
    /// fails the batch.
    pub async fn read_all<T>(
        &self,
        calls: &[BatchCall<T>],
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        self.read(calls, cancel).await?.into_iter().collect()
    }

    /// Split `calls` into chunks of at most `max_batch_size`, dispatch the
    /// chunks concurrently and concatenate results in input order.
    pub async fn read_chunked<T>(
        &self,
        calls: &[BatchCall<T>],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<T>> {
        let tasks = calls
            .chunks(self.max_batch_size)
            .enumerate()
            .map(|(i, chunk)| self.read_at(chunk, i * self.max_batch_size, cancel));

        let chunks = futures::future::try_join_all(tasks).await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    /// [`BatchReader::read_chunked`] retried with exponential backoff on
    /// network failures. Cancellation and slot errors are never retried.
    pub async fn read_with_retry<T>(
        &self,
        calls: &[BatchCall<T>],
        cancel: &CancellationToken,
    ) -> Result<BatchResult<T>> {
        let mut attempt = 0;
        loop {
            match self.read_chunked(calls, cancel).await {
                Err(e) if e.is_network() && attempt + 1 < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Batch of {} calls failed ({}), retrying in {:?}",
                        calls.len(),
                        e,
                        delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(CoreError::Cancelled("batch retry backoff")),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Delay before retry number `attempt + 1`, saturating instead of
    /// overflowing for large retry counts.
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    async fn read_at<T>(
        &self,
        calls: &[BatchCall<T>],
        offset: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchResult<T>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<Call3> = calls
            .iter()
            .map(|call| Call3 {
                target: call.target,
                allowFailure: true,
                callData: call.call_data.clone(),
            })
            .collect();

        let response = bounded(
            "multicall read",
            self.timeout,
            cancel,
            self.rpc.aggregate3(self.multicall_address, requests),
        )
        .await??;

        let mut failed = 0usize;
        let results: BatchResult<T> = calls
            .iter()
            .enumerate()
            .map(|(i, call)| {
                let index = offset + i;
                let slot = match response.get(i) {
                    None => Err("missing from multicall response".to_string()),
                    Some(r) if !r.success => Err(format!("call to {} reverted", call.target)),
                    Some(r) => call.decode(&r.returnData),
                };
                slot.map_err(|reason| {
                    failed += 1;
                    debug!("Batch slot {} ({}) failed: {}", index, call.target, reason);
                    CoreError::Decode { index, reason }
                })
            })
            .collect();

        debug!(
            "Batch read {} calls in one round trip ({} failed slots)",
            calls.len(),
            failed
        );

        Ok(results)
    }
}
