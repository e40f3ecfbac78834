//! External collaborators: the chain RPC node and the wallet signer.
//!
//! Both are expressed as traits so the engine can run against the alloy
//! provider in production and against in-memory doubles in tests.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};

mod client;
mod signer;

pub use client::{AlloyRpcClient, RpcClient};
pub use signer::{Signer, SignerError, SubmissionRequest};

/// Race `fut` against a timeout and a cancellation token.
///
/// The inner output is returned untouched; the outer error is either
/// `NetworkTimeout` or `Cancelled`. Dropping the future aborts the request.
pub(crate) async fn bounded<F>(
    step: &'static str,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoreError::Cancelled(step)),
        res = tokio::time::timeout(timeout, fut) => {
            res.map_err(|_| CoreError::NetworkTimeout(timeout.as_millis() as u64, step))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_output_through() {
        let cancel = CancellationToken::new();
        let out = bounded("test", Duration::from_secs(1), &cancel, async { 7 })
            .await
            .unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let cancel = CancellationToken::new();
        let err = bounded(
            "slow call",
            Duration::from_millis(50),
            &cancel,
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, CoreError::NetworkTimeout(50, "slow call"));
    }

    #[tokio::test]
    async fn test_bounded_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bounded(
            "cancelled call",
            Duration::from_secs(10),
            &cancel,
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, CoreError::Cancelled("cancelled call"));
    }
}
