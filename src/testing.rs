//! In-memory RPC and signer doubles for unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, TxHash};

use crate::{
    abis::{Call3, McResult},
    error::{CoreError, Result},
    rpc::{RpcClient, Signer, SignerError, SubmissionRequest},
};

/// Reply for one multicall slot.
pub enum SlotReply {
    Ok(Vec<u8>),
    Revert,
}

type Responder = Arc<dyn Fn(Address, usize) -> SlotReply + Send + Sync>;

#[derive(Clone)]
pub struct MockRpc {
    responder: Responder,
    round_trips: Arc<AtomicUsize>,
    receipt_polls: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    fail_first: usize,
    truncate: Option<usize>,
    latency: Option<Duration>,
    send_fails: bool,
    receipt: Option<bool>,
    pending_polls: usize,
}

impl MockRpc {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(Address, usize) -> SlotReply + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            round_trips: Arc::new(AtomicUsize::new(0)),
            receipt_polls: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_first: 0,
            truncate: None,
            latency: None,
            send_fails: false,
            receipt: Some(true),
            pending_polls: 0,
        }
    }

    /// Transaction-only double: every read reverts.
    pub fn transactions() -> Self {
        Self::new(|_, _| SlotReply::Revert)
    }

    pub fn fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn truncate_to(mut self, n: usize) -> Self {
        self.truncate = Some(n);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.send_fails = true;
        self
    }

    /// Receipt status once mined (`None` = never mined), after `pending_polls` empty polls.
    pub fn with_receipt(mut self, receipt: Option<bool>, pending_polls: usize) -> Self {
        self.receipt = receipt;
        self.pending_polls = pending_polls;
        self
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }
}

impl RpcClient for MockRpc {
    async fn aggregate3(&self, _multicall: Address, calls: Vec<Call3>) -> Result<Vec<McResult>> {
        let n = self.round_trips.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if n < self.fail_first {
            return Err(CoreError::Rpc("connection reset".to_string()));
        }

        let mut results: Vec<McResult> = calls
            .iter()
            .enumerate()
            .map(|(i, call)| match (self.responder)(call.target, i) {
                SlotReply::Ok(data) => McResult {
                    success: true,
                    returnData: data.into(),
                },
                SlotReply::Revert => McResult {
                    success: false,
                    returnData: Bytes::new(),
                },
            })
            .collect();

        if let Some(n) = self.truncate {
            results.truncate(n);
        }
        Ok(results)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        if self.send_fails {
            return Err(CoreError::Rpc("nonce too low".to_string()));
        }
        let hash = keccak256(&raw);
        self.sent.lock().unwrap().push(raw);
        Ok(hash)
    }

    async fn transaction_receipt(&self, _tx_hash: TxHash) -> Result<Option<bool>> {
        let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.pending_polls {
            return Ok(None);
        }
        Ok(self.receipt)
    }
}

#[derive(Clone)]
pub struct MockSigner {
    account: Address,
    chain_id: Arc<Mutex<u64>>,
    switch_reply: std::result::Result<(), SignerError>,
    sign_reply: std::result::Result<(), SignerError>,
    sign_delay: Option<Duration>,
    signed: Arc<Mutex<Vec<SubmissionRequest>>>,
}

impl MockSigner {
    pub fn on_chain(account: Address, chain_id: u64) -> Self {
        Self {
            account,
            chain_id: Arc::new(Mutex::new(chain_id)),
            switch_reply: Ok(()),
            sign_reply: Ok(()),
            sign_delay: None,
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn rejecting_switch(mut self, reason: &str) -> Self {
        self.switch_reply = Err(SignerError::Rejected(reason.to_string()));
        self
    }

    pub fn rejecting_signature(mut self, reason: &str) -> Self {
        self.sign_reply = Err(SignerError::Rejected(reason.to_string()));
        self
    }

    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.sign_delay = Some(delay);
        self
    }

    pub fn signed(&self) -> Vec<SubmissionRequest> {
        self.signed.lock().unwrap().clone()
    }
}

impl Signer for MockSigner {
    fn account(&self) -> Address {
        self.account
    }

    async fn active_chain_id(&self) -> std::result::Result<u64, SignerError> {
        Ok(*self.chain_id.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), SignerError> {
        self.switch_reply.clone()?;
        *self.chain_id.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn sign_transaction(
        &self,
        request: &SubmissionRequest,
    ) -> std::result::Result<Bytes, SignerError> {
        if let Some(delay) = self.sign_delay {
            tokio::time::sleep(delay).await;
        }
        self.sign_reply.clone()?;
        self.signed.lock().unwrap().push(request.clone());

        let mut raw = request.chain_id.to_be_bytes().to_vec();
        raw.extend_from_slice(&request.call_data);
        Ok(raw.into())
    }
}
