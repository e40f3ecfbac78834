use std::future::Future;

use alloy::primitives::{Address, Bytes};
use thiserror::Error;

/// A state-changing call awaiting the signer's authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub call_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The user declined (chain switch or signature prompt).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Wallet unreachable or failed to answer.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Wallet-side collaborator: owns the account, the active network and the keys.
pub trait Signer: Send + Sync {
    fn account(&self) -> Address;

    fn active_chain_id(&self) -> impl Future<Output = Result<u64, SignerError>> + Send;

    /// Ask the wallet to move to `chain_id`.
    fn switch_chain(&self, chain_id: u64) -> impl Future<Output = Result<(), SignerError>> + Send;

    /// Prompt for a signature and return the signed raw transaction.
    fn sign_transaction(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<Bytes, SignerError>> + Send;
}
