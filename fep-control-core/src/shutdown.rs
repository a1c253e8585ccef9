//! Process-wide shutdown coordination.
//!
//! A [`CancellationToken`] is the shutdown flag. The binary's watchdog
//! cancels it when the process is asked to stop; whoever owns a session
//! reacts by writing the goodbye and leaving its loop.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wait for SIGINT or SIGTERM (Ctrl-C on other platforms). Returns the
/// signal name.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => Ok("SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl-C")
    }
}

/// Cancel `token` on the first termination signal.
pub fn spawn_signal_watchdog(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            received = wait_for_signal() => {
                match received {
                    Ok(name) => tracing::info!(signal = name, "received signal, initiating shutdown"),
                    Err(e) => tracing::warn!(error = %e, "cannot listen for signals, shutting down"),
                }
                token.cancel();
            }
        }
    })
}

/// Run `action` once `token` is cancelled.
pub fn on_shutdown<F>(token: CancellationToken, action: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        token.cancelled().await;
        action();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_on_shutdown_runs_after_cancel() {
        let token = CancellationToken::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let handle = on_shutdown(token.clone(), move || flag.store(true, Ordering::SeqCst));

        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));

        token.cancel();
        handle.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_watchdog_stops_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let watchdog = spawn_signal_watchdog(token.clone());
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), watchdog)
            .await
            .unwrap()
            .unwrap();
    }
}
