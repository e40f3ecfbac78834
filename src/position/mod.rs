//! Liquidity removal and fee collection.
//!
//! [`PositionOperationBuilder`] turns a position snapshot into a guarded
//! submission, [`RemovalOperation`] tracks it through the wallet and the chain,
//! and [`OperationRunner`] drives it against real collaborators.

mod builder;
mod queue;
mod runner;
mod state;

pub use builder::{PositionOperationBuilder, RemovalRequest};
pub use queue::{SubmissionLane, SubmissionQueue};
pub use runner::{OperationRunner, StepTimeouts};
pub use state::{OperationEvent, OperationKind, OperationState, RemovalOperation};
