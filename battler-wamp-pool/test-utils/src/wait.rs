use std::{
    future::Future,
    time::Duration,
};

use anyhow::{
    Error,
    Result,
};
use battler_wamp_pool::connection::ConnectionStatus;
use tokio::{
    sync::broadcast,
    time::Instant,
};

const TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Polls a condition until it holds, failing after a timeout.
pub async fn eventually<F>(description: &str, mut condition: F) -> Result<()>
where
    F: AsyncFnMut() -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    loop {
        if condition().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::msg(format!("timed out waiting for {description}")));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Waits for a future, failing after a timeout.
pub async fn within<F>(description: &str, future: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::time::timeout(TIMEOUT, future)
        .await
        .map_err(|_| Error::msg(format!("timed out waiting for {description}")))
}

/// Waits for a status event, skipping every other event before it.
pub async fn wait_for_status(
    status_rx: &mut broadcast::Receiver<ConnectionStatus>,
    expected: ConnectionStatus,
) -> Result<()> {
    within(&format!("{expected:?}"), async {
        loop {
            if status_rx.recv().await? == expected {
                return Ok::<_, Error>(());
            }
        }
    })
    .await?
}
