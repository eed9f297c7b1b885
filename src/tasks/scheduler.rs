use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::core::time::unix_now;
use crate::tasks::sweeper;

pub async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(sweep_loop(state, shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = state.settings().sweeper().interval_seconds.max(1);
    let mut tick = interval(Duration::from_secs(period));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let now = unix_now();
                if let Err(err) = sweeper::sweep(&state, now, now).await {
                    tracing::error!(error = %err, "Attempt sweep failed");
                }
            }
        }
    }
}
