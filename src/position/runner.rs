use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{CoreError, Result},
    position::{
        queue::SubmissionQueue,
        state::{OperationEvent, OperationState, RemovalOperation},
    },
    rpc::{bounded, RpcClient, Signer, SignerError},
};

/// Per-step bounds for [`OperationRunner`].
#[derive(Debug, Clone, Copy)]
pub struct StepTimeouts {
    /// Chain id query and chain switch prompt.
    pub wallet: Duration,
    /// Waiting for a free submission lane.
    pub queue: Duration,
    pub signature: Duration,
    pub broadcast: Duration,
    pub receipt: Duration,
    pub poll_interval: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            wallet: Duration::from_secs(60),
            queue: Duration::from_secs(300),
            signature: Duration::from_secs(120),
            broadcast: Duration::from_secs(15),
            receipt: Duration::from_secs(180),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Drives a [`RemovalOperation`] against the signer and the RPC node.
///
/// Every step is bounded by its own timeout and by `cancel`. The submission
/// lane for `(chain, account)` is held from signing until the receipt
/// resolves.
pub struct OperationRunner<R, S> {
    rpc: Arc<R>,
    signer: Arc<S>,
    queue: SubmissionQueue,
    timeouts: StepTimeouts,
}

impl<R: RpcClient, S: Signer> OperationRunner<R, S> {
    pub fn new(rpc: Arc<R>, signer: Arc<S>, queue: SubmissionQueue, timeouts: StepTimeouts) -> Self {
        Self {
            rpc,
            signer,
            queue,
            timeouts,
        }
    }

    /// Run `op` from `Idle` to a terminal state. Returns the confirmed
    /// transaction hash, or the error the operation failed with.
    pub async fn run(&self, op: &mut RemovalOperation, cancel: &CancellationToken) -> Result<TxHash> {
        let t = self.timeouts;

        let active_chain_id =
            match bounded("active chain", t.wallet, cancel, self.signer.active_chain_id()).await {
                Ok(Ok(id)) => id,
                Ok(Err(e)) => return fail(op, signer_unavailable(e)),
                Err(e) => return fail(op, e),
            };
        op.handle(OperationEvent::Start { active_chain_id })?;

        if let OperationState::ChainSwitchPending { target, .. } = op.state() {
            let target = *target;
            let event =
                match bounded("chain switch", t.wallet, cancel, self.signer.switch_chain(target)).await {
                    Ok(Ok(())) => OperationEvent::SwitchAccepted,
                    Ok(Err(SignerError::Rejected(reason))) => OperationEvent::SwitchRejected { reason },
                    Ok(Err(e)) => OperationEvent::NetworkFailed {
                        error: signer_unavailable(e),
                    },
                    Err(error) => OperationEvent::NetworkFailed { error },
                };
            op.handle(event)?;
        }

        let request = match op.state() {
            OperationState::AwaitingSignature { request } => request.clone(),
            _ => return outcome(op),
        };

        let account = self.signer.account();
        let _lane = match bounded(
            "submission queue",
            t.queue,
            cancel,
            self.queue.acquire(request.chain_id, account),
        )
        .await
        {
            Ok(guard) => guard,
            Err(e) => return fail(op, e),
        };

        let submission = request.to_submission(account);
        let raw = match bounded(
            "signature",
            t.signature,
            cancel,
            self.signer.sign_transaction(&submission),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(SignerError::Rejected(reason))) => {
                op.handle(OperationEvent::SignatureRejected { reason })?;
                return outcome(op);
            }
            Ok(Err(e)) => return fail(op, signer_unavailable(e)),
            Err(e) => return fail(op, e),
        };

        let tx_hash = match bounded("broadcast", t.broadcast, cancel, self.rpc.send_raw_transaction(raw))
            .await
            .and_then(|sent| sent)
        {
            Ok(hash) => hash,
            Err(e) => return fail(op, e),
        };
        op.handle(OperationEvent::Signed { tx_hash })?;
        info!("Submitted {} on chain {}", tx_hash, request.chain_id);

        let success = match bounded("receipt", t.receipt, cancel, self.wait_for_receipt(tx_hash))
            .await
            .and_then(|receipt| receipt)
        {
            Ok(success) => success,
            Err(e) => return fail(op, e),
        };
        op.handle(OperationEvent::ReceiptReceived { success })?;

        outcome(op)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<bool> {
        let mut polls = 0u32;
        loop {
            if let Some(success) = self.rpc.transaction_receipt(tx_hash).await? {
                return Ok(success);
            }
            polls += 1;
            debug!("Receipt for {} pending after {} polls", tx_hash, polls);
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }
}

fn signer_unavailable(e: SignerError) -> CoreError {
    CoreError::Rpc(format!("signer {e}"))
}

fn fail<T>(op: &mut RemovalOperation, error: CoreError) -> Result<T> {
    op.handle(OperationEvent::NetworkFailed {
        error: error.clone(),
    })?;
    Err(error)
}

fn outcome(op: &RemovalOperation) -> Result<TxHash> {
    match op.state() {
        OperationState::Confirmed { tx_hash } => Ok(*tx_hash),
        OperationState::Failed { error } => Err(error.clone()),
        other => Err(CoreError::InvalidTransition {
            state: other.name(),
            event: "Finish",
        }),
    }
}
