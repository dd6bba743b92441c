//! HTTP server and the background purge sweep.

use super::{router, AppState};
use crate::game::TurnOrchestrator;
use crate::storage::GameStore;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run the HTTP server until Ctrl+C
pub async fn run(orchestrator: Arc<TurnOrchestrator>) -> Result<()> {
    let settings = orchestrator.settings().clone();
    let purge = spawn_purge_sweep(
        Arc::clone(orchestrator.store()),
        Duration::from_secs(settings.storage.purge_after_mins * 60),
    );

    let app = router(Arc::new(AppState::new(orchestrator)));
    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    info!("[Server] Listening on http://{}", settings.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("[Server] Shutdown requested");
        })
        .await?;

    purge.abort();
    Ok(())
}

/// Best-effort removal of finished sessions older than `retention`.
fn spawn_purge_sweep(store: Arc<dyn GameStore>, retention: Duration) -> tokio::task::JoinHandle<()> {
    let every = (retention / 4).max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let cutoff = match chrono::Duration::from_std(retention) {
                Ok(age) => Utc::now() - age,
                Err(_) => continue,
            };
            match store.purge_finished(cutoff).await {
                Ok(0) => {}
                Ok(n) => info!("[Server] Purged {} finished sessions", n),
                Err(e) => tracing::warn!("[Server] Purge sweep failed: {}", e),
            }
        }
    })
}
