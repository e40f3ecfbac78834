use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use rustc_hash::FxHashMap;
use tokio::sync::OwnedMutexGuard;

type Lane = Arc<tokio::sync::Mutex<()>>;
type Lanes = Arc<Mutex<FxHashMap<(u64, Address), Lane>>>;

/// Serializes submissions per `(chain_id, account)`.
///
/// A second submission for the same account waits until the first lane is
/// dropped; different accounts or chains proceed independently. A lane with
/// no holder and no waiter is removed from the map.
#[derive(Clone, Default)]
pub struct SubmissionQueue {
    lanes: Lanes,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, chain_id: u64, account: Address) -> SubmissionLane {
        let lane = lock(&self.lanes)
            .entry((chain_id, account))
            .or_default()
            .clone();

        SubmissionLane {
            guard: Some(lane.lock_owned().await),
            lanes: self.lanes.clone(),
        }
    }

    /// Number of `(chain_id, account)` pairs currently tracked.
    pub fn len(&self) -> usize {
        lock(&self.lanes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one submission lane, released on drop.
pub struct SubmissionLane {
    guard: Option<OwnedMutexGuard<()>>,
    lanes: Lanes,
}

impl Drop for SubmissionLane {
    fn drop(&mut self) {
        self.guard.take();
        // Holders and waiters each own a clone; the map's is the last one.
        lock(&self.lanes).retain(|_, lane| Arc::strong_count(lane) > 1);
    }
}

fn lock(lanes: &Lanes) -> std::sync::MutexGuard<'_, FxHashMap<(u64, Address), Lane>> {
    lanes.lock().unwrap_or_else(|e| e.into_inner())
}
