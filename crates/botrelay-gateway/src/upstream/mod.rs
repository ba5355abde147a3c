//! Upstream link to the robot's control socket.
//!
//! Callers only see the [`Upstream`] capability (`send`, `state`, shutdown).
//! Reconnect logic and the socket handle stay private to the transport, which
//! is picked once from `upstream.mode`:
//! - `live`: [`WsLink`], a self-healing WebSocket client with backoff
//! - `noop`: [`NoopLink`], logs sends and never opens a socket

pub mod backoff;
mod noop;
mod ws_link;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use botrelay_core::error::Result;
use botrelay_core::protocol::Envelope;

use crate::config::{UpstreamMode, UpstreamSection};
use crate::realtime::Frame;

pub use backoff::Backoff;
pub use noop::NoopLink;
pub use ws_link::WsLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal. No further reconnects are scheduled.
    ShuttingDown,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::ShuttingDown => "shutting_down",
        };
        f.write_str(s)
    }
}

/// Receives every frame the robot sends, in arrival order.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, frame: Frame);
}

/// Read-only capability handed to connection handlers.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn state(&self) -> LinkState;

    /// Transmit if connected. While the link is down the envelope is dropped
    /// and `RelayError::LinkUnavailable` is returned; nothing is queued.
    async fn send(&self, env: &Envelope) -> Result<()>;

    /// Enter `ShuttingDown`. Suppresses reconnects; does not touch the socket.
    fn begin_shutdown(&self);

    /// Close the live socket, if any. Implies `begin_shutdown`.
    async fn close(&self);
}

/// A started link plus its background task (none for `noop`).
pub struct LinkHandle {
    pub link: Arc<dyn Upstream>,
    pub task: Option<JoinHandle<()>>,
}

/// Build the configured transport and start connecting.
pub fn start(cfg: &UpstreamSection, sink: Arc<dyn FrameSink>) -> LinkHandle {
    match cfg.mode {
        UpstreamMode::Live => {
            let (link, task) = WsLink::spawn(cfg.clone(), sink);
            LinkHandle {
                link,
                task: Some(task),
            }
        }
        UpstreamMode::Noop => {
            tracing::warn!("upstream mode is noop, no robot connection will be made");
            LinkHandle {
                link: Arc::new(NoopLink::new()),
                task: None,
            }
        }
    }
}
