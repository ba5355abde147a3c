//! Shared application state for the relay.
//!
//! The upstream link is injected as a capability so handlers can only `send`
//! through it; reconnect logic stays inside the link.

use std::sync::Arc;

use tokio::sync::watch;

use botrelay_core::error::RelayError;
use botrelay_core::protocol::Envelope;

use crate::config::RelayConfig;
use crate::realtime::ClientRegistry;
use crate::upstream::Upstream;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    upstream: Arc<dyn Upstream>,
    registry: Arc<ClientRegistry>,
}

struct AppStateInner {
    cfg: RelayConfig,
    draining: watch::Sender<bool>,
}

impl AppState {
    pub fn new(cfg: RelayConfig, upstream: Arc<dyn Upstream>, registry: Arc<ClientRegistry>) -> Self {
        let (draining, _) = watch::channel(false);
        Self {
            inner: Arc::new(AppStateInner { cfg, draining }),
            upstream,
            registry,
        }
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn robot(&self) -> &str {
        &self.inner.cfg.upstream.robot
    }

    pub fn upstream(&self) -> Arc<dyn Upstream> {
        Arc::clone(&self.upstream)
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Stamp the configured device id and hand the envelope to the link.
    /// Best-effort: a down link or a transport error is logged, never returned.
    pub async fn forward(&self, mut env: Envelope) {
        env.stamp(self.robot());
        match self.upstream.send(&env).await {
            Ok(()) => {}
            Err(RelayError::LinkUnavailable) => {
                tracing::debug!(msg_type = %env.msg_type, "upstream unavailable, envelope dropped");
            }
            Err(e) => {
                tracing::warn!(error = %e, "upstream send failed");
            }
        }
    }

    /// Mark draining; open downstream sessions close themselves.
    pub fn drain(&self) {
        self.inner.draining.send_replace(true);
    }

    pub fn is_draining(&self) -> bool {
        *self.inner.draining.borrow()
    }

    pub fn draining(&self) -> watch::Receiver<bool> {
        self.inner.draining.subscribe()
    }
}
