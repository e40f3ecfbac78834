use alloy::primitives::TxHash;
use log::{info, warn};

use crate::{
    error::{CoreError, Result},
    position::builder::{PositionOperationBuilder, RemovalRequest},
};

#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Idle,
    ChainSwitchPending { active: u64, target: u64 },
    AwaitingSignature { request: RemovalRequest },
    Submitted { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash },
    Failed { error: CoreError },
}

impl OperationState {
    pub fn name(&self) -> &'static str {
        match self {
            OperationState::Idle => "Idle",
            OperationState::ChainSwitchPending { .. } => "ChainSwitchPending",
            OperationState::AwaitingSignature { .. } => "AwaitingSignature",
            OperationState::Submitted { .. } => "Submitted",
            OperationState::Confirmed { .. } => "Confirmed",
            OperationState::Failed { .. } => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Confirmed { .. } | OperationState::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationEvent {
    /// Operation requested while the wallet is on `active_chain_id`.
    Start { active_chain_id: u64 },
    SwitchAccepted,
    SwitchRejected { reason: String },
    /// Signed and broadcast.
    Signed { tx_hash: TxHash },
    SignatureRejected { reason: String },
    ReceiptReceived { success: bool },
    NetworkFailed { error: CoreError },
}

impl OperationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OperationEvent::Start { .. } => "Start",
            OperationEvent::SwitchAccepted => "SwitchAccepted",
            OperationEvent::SwitchRejected { .. } => "SwitchRejected",
            OperationEvent::Signed { .. } => "Signed",
            OperationEvent::SignatureRejected { .. } => "SignatureRejected",
            OperationEvent::ReceiptReceived { .. } => "ReceiptReceived",
            OperationEvent::NetworkFailed { .. } => "NetworkFailed",
        }
    }
}

/// What the operation submits once it reaches `AwaitingSignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Remove a percentage of liquidity and collect.
    Remove { percent: u8 },
    /// Collect accrued fees only.
    Collect,
}

/// Event-driven state machine for one liquidity removal.
///
/// ```text
/// Idle -> [ChainSwitchPending] -> AwaitingSignature -> Submitted -> Confirmed
///                                                                \-> Failed
/// ```
///
/// Every non-terminal state moves to `Failed` on `NetworkFailed`. Terminal
/// states reject all events; nothing is retried automatically.
#[derive(Debug, Clone)]
pub struct RemovalOperation {
    builder: PositionOperationBuilder,
    kind: OperationKind,
    state: OperationState,
}

impl RemovalOperation {
    pub fn new(builder: PositionOperationBuilder, kind: OperationKind) -> Self {
        Self {
            builder,
            kind,
            state: OperationState::Idle,
        }
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn chain_id(&self) -> u64 {
        self.builder.chain_id()
    }

    pub fn handle(&mut self, event: OperationEvent) -> Result<&OperationState> {
        let from = self.state.name();
        let event_name = event.name();

        let next = match (&self.state, event) {
            (OperationState::Idle, OperationEvent::Start { active_chain_id }) => {
                let target = self.builder.chain_id();
                if active_chain_id != target {
                    OperationState::ChainSwitchPending {
                        active: active_chain_id,
                        target,
                    }
                } else {
                    self.prepare()
                }
            }
            (OperationState::ChainSwitchPending { .. }, OperationEvent::SwitchAccepted) => {
                self.prepare()
            }
            (
                OperationState::ChainSwitchPending { active, target },
                OperationEvent::SwitchRejected { reason },
            ) => OperationState::Failed {
                error: CoreError::ChainMismatch {
                    active: *active,
                    expected: *target,
                    reason,
                },
            },
            (OperationState::AwaitingSignature { .. }, OperationEvent::Signed { tx_hash }) => {
                OperationState::Submitted { tx_hash }
            }
            (
                OperationState::AwaitingSignature { .. },
                OperationEvent::SignatureRejected { reason },
            ) => OperationState::Failed {
                error: CoreError::SubmissionRejected(reason),
            },
            (OperationState::Submitted { tx_hash }, OperationEvent::ReceiptReceived { success }) => {
                if success {
                    OperationState::Confirmed { tx_hash: *tx_hash }
                } else {
                    OperationState::Failed {
                        error: CoreError::InsufficientOutput { tx_hash: *tx_hash },
                    }
                }
            }
            (state, OperationEvent::NetworkFailed { error }) if !state.is_terminal() => {
                OperationState::Failed { error }
            }
            _ => {
                return Err(CoreError::InvalidTransition {
                    state: from,
                    event: event_name,
                })
            }
        };

        match &next {
            OperationState::Failed { error } => warn!(
                "Position {} removal: {} --{}--> Failed: {}",
                self.builder.snapshot().position.token_id,
                from,
                event_name,
                error
            ),
            _ => info!(
                "Position {} removal: {} --{}--> {}",
                self.builder.snapshot().position.token_id,
                from,
                event_name,
                next.name()
            ),
        }

        self.state = next;
        Ok(&self.state)
    }

    fn prepare(&self) -> OperationState {
        let request = match self.kind {
            OperationKind::Remove { percent } => self.builder.build_removal(percent),
            OperationKind::Collect => self.builder.build_collect(),
        };
        match request {
            Ok(request) => OperationState::AwaitingSignature { request },
            Err(error) => OperationState::Failed { error },
        }
    }
}
