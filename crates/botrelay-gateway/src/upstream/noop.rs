use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use botrelay_core::error::{RelayError, Result};
use botrelay_core::protocol::Envelope;

use super::{LinkState, Upstream};

/// Debug transport: always "connected", logs what would have been sent.
#[derive(Debug, Default)]
pub struct NoopLink {
    stopped: AtomicBool,
}

impl NoopLink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Upstream for NoopLink {
    fn state(&self) -> LinkState {
        if self.stopped.load(Ordering::Relaxed) {
            LinkState::ShuttingDown
        } else {
            LinkState::Connected
        }
    }

    async fn send(&self, env: &Envelope) -> Result<()> {
        if self.stopped.load(Ordering::Relaxed) {
            return Err(RelayError::LinkUnavailable);
        }
        let payload = env.to_json()?;
        tracing::info!(%payload, "(noop) send");
        Ok(())
    }

    fn begin_shutdown(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    async fn close(&self) {
        self.begin_shutdown();
        tracing::info!("(noop) close");
    }
}
