//! # Timeout Guard
//!
//! Races an operation against a deadline. On expiry the operation's future is
//! dropped, which aborts it at its next suspension point, and the supplied
//! cancellation token is fired so work spawned elsewhere can stop as well.

use crate::app::errors::TimeoutError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `future` to completion unless `duration` elapses first
pub async fn with_timeout<F, T>(
    future: F,
    duration: Duration,
    label: &str,
    cancel: &CancellationToken,
) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(output) => Ok(output),
        Err(_) => {
            cancel.cancel();
            tracing::debug!("'{}' exceeded its {:?} deadline", label, duration);
            Err(TimeoutError {
                label: label.to_string(),
                after: duration,
            })
        }
    }
}
