//! Request-scoped cancellation and a fixed ceiling for every outbound call.

use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `fut` until it completes, `timeout` elapses, or `cancel` fires (whichever comes first).
pub async fn bounded<T, F>(cancel: &CancellationToken, timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(out) => out,
            Err(_) => Err(AppError::Backend(format!("timed out after {}ms", timeout.as_millis()))),
        },
    }
}
