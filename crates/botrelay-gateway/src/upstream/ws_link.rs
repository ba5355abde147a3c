//! Live upstream transport.
//!
//! One background task owns the reconnect loop:
//! `Connecting -> Connected -> (close/error) -> Disconnected -> sleep(backoff) -> Connecting ...`
//! Other tasks only touch the link through `send`, which serializes writes on
//! the writer mutex. Lock wait plus write share one `send_timeout_ms` budget;
//! running past it (or any write error) drops the writer, and the pump tears
//! that connection down and goes back to backoff.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Duration, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::Instrument;

use botrelay_core::error::{RelayError, Result};
use botrelay_core::protocol::Envelope;

use crate::config::UpstreamSection;
use crate::realtime::Frame;

use super::{Backoff, FrameSink, LinkState, Upstream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// Write half of the live connection. Dropping it resolves the pump's
/// `writer_gone` receiver.
struct Writer {
    sink: WsSink,
    _alive: oneshot::Sender<()>,
}

pub struct WsLink {
    cfg: UpstreamSection,
    state: watch::Sender<LinkState>,
    shutdown: watch::Sender<bool>,
    writer: Mutex<Option<Writer>>,
    frames: Arc<dyn FrameSink>,
}

impl WsLink {
    /// Create the link and spawn its reconnect loop. The first connect attempt
    /// starts immediately.
    pub fn spawn(cfg: UpstreamSection, frames: Arc<dyn FrameSink>) -> (Arc<Self>, JoinHandle<()>) {
        let span = tracing::info_span!("upstream", url = %cfg.url);
        let (state, _) = watch::channel(LinkState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        let link = Arc::new(Self {
            cfg,
            state,
            shutdown,
            writer: Mutex::new(None),
            frames,
        });
        let task = tokio::spawn(Arc::clone(&link).run().instrument(span));
        (link, task)
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// `ShuttingDown` is terminal.
    fn set_state(&self, next: LinkState) {
        self.state.send_if_modified(|cur| {
            if *cur == LinkState::ShuttingDown || *cur == next {
                return false;
            }
            *cur = next;
            true
        });
    }

    async fn run(self: Arc<Self>) {
        let mut backoff = Backoff::from_millis(self.cfg.reconnect_base_ms, self.cfg.reconnect_max_ms);
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(LinkState::Connecting);
            tracing::info!("connecting");

            let attempt = tokio::select! {
                r = connect_async(self.cfg.url.as_str()) => r,
                _ = shutdown.wait_for(|stop| *stop) => break,
            };

            match attempt {
                Ok((ws, _resp)) => {
                    backoff.reset();
                    self.pump(ws, &mut shutdown).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "connect failed");
                }
            }

            if *shutdown.borrow() {
                break;
            }

            self.set_state(LinkState::Disconnected);
            let delay = backoff.next_delay();
            tracing::info!(delay_ms = delay.as_millis() as u64, "disconnected, reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        self.set_state(LinkState::ShuttingDown);
        tracing::info!("upstream loop stopped");
    }

    /// Drive one open connection until it closes, errors, or shutdown is requested.
    async fn pump(&self, ws: WsStream, shutdown: &mut watch::Receiver<bool>) {
        let (sink, mut stream) = ws.split();
        let (alive, mut writer_gone) = oneshot::channel::<()>();
        *self.writer.lock().await = Some(Writer { sink, _alive: alive });
        self.set_state(LinkState::Connected);
        tracing::info!("connected");

        if let Err(e) = self.send(&Envelope::connect(&self.cfg.robot)).await {
            tracing::warn!(error = %e, "connect envelope not sent");
        }

        loop {
            tokio::select! {
                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(s))) => self.frames.deliver(Frame::Text(s)),
                        Some(Ok(WsMessage::Binary(b))) => self.frames.deliver(Frame::Binary(Bytes::from(b))),
                        Some(Ok(WsMessage::Close(_))) | None => {
                            tracing::info!("upstream closed");
                            break;
                        }
                        // ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "upstream read failed");
                            break;
                        }
                    }
                }
                _ = &mut writer_gone => {
                    tracing::warn!("upstream writer dropped");
                    break;
                }
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            if *shutdown.borrow() {
                if let Err(e) = writer.sink.close().await {
                    tracing::debug!(error = %e, "upstream close failed");
                }
            }
        }
    }
}

#[async_trait]
impl Upstream for WsLink {
    fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    async fn send(&self, env: &Envelope) -> Result<()> {
        let payload = env.to_json()?;
        if self.state() != LinkState::Connected {
            tracing::warn!(%payload, "link not open, dropping message");
            return Err(RelayError::LinkUnavailable);
        }

        let deadline = Instant::now() + Duration::from_millis(self.cfg.send_timeout_ms);
        let mut guard = timeout_at(deadline, self.writer.lock())
            .await
            .map_err(|_| RelayError::Transport("upstream writer busy".into()))?;
        let Some(writer) = guard.as_mut() else {
            tracing::warn!(%payload, "link not open, dropping message");
            return Err(RelayError::LinkUnavailable);
        };

        let written = timeout_at(deadline, writer.sink.send(WsMessage::Text(payload))).await;
        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                guard.take();
                Err(RelayError::Transport(format!("upstream send failed: {e}")))
            }
            Err(_) => {
                guard.take();
                tracing::warn!(
                    timeout_ms = self.cfg.send_timeout_ms,
                    "upstream write stalled, dropping connection"
                );
                Err(RelayError::Transport("upstream send timed out".into()))
            }
        }
    }

    fn begin_shutdown(&self) {
        self.state.send_replace(LinkState::ShuttingDown);
        self.shutdown.send_replace(true);
    }

    async fn close(&self) {
        self.begin_shutdown();
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.sink.close().await {
                tracing::debug!(error = %e, "upstream close failed");
            }
        }
    }
}
