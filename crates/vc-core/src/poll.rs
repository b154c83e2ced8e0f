//! Bounded polling for eventually consistent lookups

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Call `probe` every `interval` until it yields a value, the deadline
/// passes or the token is cancelled.
///
/// Returns `Ok(None)` when the wait ran out (deadline or cancellation).
/// Errors from the probe end the wait immediately.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    timeout: Duration,
    cancellation: Option<&CancellationToken>,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("Gave up polling after {} attempts", attempt);
            return Ok(None);
        }
        debug!("Poll attempt {} came back empty, retrying", attempt);

        let pause = interval.min(deadline - now);
        match cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Polling cancelled after {} attempts", attempt);
                        return Ok(None);
                    }
                    _ = sleep(pause) => {}
                }
            }
            None => sleep(pause).await,
        }
    }
}
