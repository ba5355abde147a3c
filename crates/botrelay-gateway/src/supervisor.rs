//! Process supervisor: startup order and graceful teardown.
//!
//! Start: registry -> upstream link (first connect attempt in flight) -> bind.
//! Stop:  link enters `ShuttingDown` -> sessions drain -> listener stops
//!        accepting -> upstream socket closed -> link task joined.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use botrelay_core::error::{RelayError, Result};

use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::realtime::ClientRegistry;
use crate::router;
use crate::upstream::{self, FrameSink, LinkHandle};

/// Run until SIGINT/SIGTERM.
pub async fn run(cfg: RelayConfig) -> Result<()> {
    let listen = cfg.gateway.listen_addr()?;

    let registry = Arc::new(ClientRegistry::new());
    let handle = upstream::start(&cfg.upstream, Arc::clone(&registry) as Arc<dyn FrameSink>);
    let state = AppState::new(cfg, Arc::clone(&handle.link), registry);

    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| RelayError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, robot = %state.robot(), "botrelay-gateway starting");

    serve(listener, state, handle, shutdown_signal()).await
}

/// Serve on an already-bound listener until `signal` resolves, then tear down.
pub async fn serve<F>(listener: TcpListener, state: AppState, handle: LinkHandle, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let link = Arc::clone(&handle.link);
    let draining = state.clone();
    let app = router::build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            link.begin_shutdown();
            draining.drain();
            tracing::info!("shutting down, no new connections accepted");
        })
        .await
        .map_err(|e| RelayError::Internal(format!("server failed: {e}")))?;

    handle.link.close().await;
    if let Some(task) = handle.task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "upstream task ended abnormally");
        }
    }

    tracing::info!("botrelay-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
