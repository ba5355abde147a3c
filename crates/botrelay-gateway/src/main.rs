//! botrelay gateway
//!
//! - Upstream: one persistent WebSocket to the robot control socket, with backoff
//! - Downstream: `/ws` fan-out to browsers, `POST /say` for one-shot speech
//! - Config: `BOTRELAY_CONFIG` (YAML) + `BOTRELAY_*` env overrides
//! - Logs: `RUST_LOG` (default `info`)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use botrelay_gateway::{config, supervisor};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "config load failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = supervisor::run(cfg).await {
        tracing::error!(error = %e, "botrelay-gateway failed");
        std::process::exit(1);
    }
}
