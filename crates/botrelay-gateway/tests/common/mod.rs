//! Shared fixtures: recording upstream, mock robot socket, server helpers.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use botrelay_core::error::{RelayError, Result};
use botrelay_core::protocol::Envelope;
use botrelay_gateway::app_state::AppState;
use botrelay_gateway::config::RelayConfig;
use botrelay_gateway::realtime::{ClientRegistry, Frame};
use botrelay_gateway::router;
use botrelay_gateway::upstream::{FrameSink, LinkState, Upstream};

pub const ROBOT: &str = "192.168.2.186";
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub fn test_config() -> RelayConfig {
    let mut cfg = RelayConfig::default();
    cfg.gateway.listen = "127.0.0.1:0".into();
    cfg.upstream.robot = ROBOT.into();
    cfg
}

// --------------------
// Recording upstream
// --------------------

/// Captures every envelope instead of talking to a robot.
#[derive(Default)]
pub struct RecordingUpstream {
    sent: Mutex<Vec<Envelope>>,
    down: AtomicBool,
}

impl RecordingUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A link that reports `Disconnected` and drops everything.
    pub fn disconnected() -> Arc<Self> {
        let up = Self::default();
        up.down.store(true, Ordering::Relaxed);
        Arc::new(up)
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|e| serde_json::to_value(e).unwrap())
            .collect()
    }
}

#[async_trait]
impl Upstream for RecordingUpstream {
    fn state(&self) -> LinkState {
        if self.down.load(Ordering::Relaxed) {
            LinkState::Disconnected
        } else {
            LinkState::Connected
        }
    }

    async fn send(&self, env: &Envelope) -> Result<()> {
        if self.down.load(Ordering::Relaxed) {
            return Err(RelayError::LinkUnavailable);
        }
        self.sent.lock().unwrap().push(env.clone());
        Ok(())
    }

    fn begin_shutdown(&self) {
        self.down.store(true, Ordering::Relaxed);
    }

    async fn close(&self) {
        self.begin_shutdown();
    }
}

/// Collects frames handed over by a link.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn deliver(&self, frame: Frame) {
        self.frames.lock().unwrap().push(frame);
    }
}

// --------------------
// Relay server helpers
// --------------------

pub fn app_with(upstream: Arc<dyn Upstream>) -> AppState {
    app_with_config(test_config(), upstream)
}

pub fn app_with_config(cfg: RelayConfig, upstream: Arc<dyn Upstream>) -> AppState {
    AppState::new(cfg, upstream, Arc::new(ClientRegistry::new()))
}

/// Serve the router on an ephemeral port.
pub async fn spawn_http(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router::build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect_client(addr: SocketAddr) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    ws
}

/// Next text frame, skipping ping/pong.
pub async fn next_text(ws: &mut ClientWs) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("ws error");
        match msg {
            Message::Text(s) => return s,
            Message::Close(_) => panic!("unexpected close"),
            _ => continue,
        }
    }
}

/// Assert that no text frame shows up within `window`.
pub async fn assert_no_text(ws: &mut ClientWs, window: Duration) {
    let res = timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(s))) => return s,
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    if let Ok(s) = res {
        panic!("unexpected frame: {s}");
    }
}

pub async fn wait_until<F: Fn() -> bool>(what: &str, f: F) {
    timeout(TIMEOUT, async {
        while !f() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// An address nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

// --------------------
// Mock robot control socket
// --------------------

pub struct MockRobot {
    pub url: String,
    conns: mpsc::UnboundedReceiver<RobotConn>,
}

/// One accepted upstream connection. Dropping it hangs up.
pub struct RobotConn {
    inbound: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<Message>,
}

impl MockRobot {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (conns_tx, conns) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let conns_tx = conns_tx.clone();
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                    let (mut sink, mut stream) = ws.split();
                    let (in_tx, inbound) = mpsc::unbounded_channel();
                    let (tx, mut out_rx) = mpsc::unbounded_channel();
                    if conns_tx.send(RobotConn { inbound, tx }).is_err() {
                        return;
                    }
                    loop {
                        tokio::select! {
                            msg = stream.next() => match msg {
                                Some(Ok(Message::Text(s))) => { let _ = in_tx.send(s); }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                            out = out_rx.recv() => match out {
                                Some(m) => {
                                    if sink.send(m).await.is_err() { break; }
                                }
                                None => {
                                    let _ = sink.close().await;
                                    break;
                                }
                            },
                        }
                    }
                });
            }
        });

        Self {
            url: format!("ws://{addr}"),
            conns,
        }
    }

    pub async fn accept(&mut self) -> RobotConn {
        timeout(TIMEOUT, self.conns.recv())
            .await
            .expect("timed out waiting for the relay to connect")
            .expect("mock robot stopped")
    }

    /// Assert the relay does not (re)connect within `window`.
    pub async fn assert_no_connect(&mut self, window: Duration) {
        if let Ok(Some(_)) = timeout(window, self.conns.recv()).await {
            panic!("relay connected unexpectedly");
        }
    }
}

/// Completes the WebSocket handshake, then never reads again.
pub struct StalledRobot {
    pub url: String,
}

impl StalledRobot {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                    held.push(ws);
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
        }
    }
}

impl RobotConn {
    pub async fn recv_json(&mut self) -> Value {
        let s = timeout(TIMEOUT, self.inbound.recv())
            .await
            .expect("timed out waiting for an upstream frame")
            .expect("relay hung up");
        serde_json::from_str(&s).unwrap()
    }

    pub fn push_text(&self, s: &str) {
        self.tx.send(Message::Text(s.to_string())).unwrap();
    }

    pub fn push_binary(&self, b: &[u8]) {
        self.tx.send(Message::Binary(b.to_vec())).unwrap();
    }

    /// Resolves once the relay side has closed this connection.
    pub async fn wait_closed(&mut self) {
        timeout(TIMEOUT, async {
            while self.inbound.recv().await.is_some() {}
        })
        .await
        .expect("relay did not close the upstream socket");
    }
}
