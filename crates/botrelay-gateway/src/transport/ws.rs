//! Downstream WebSocket handler (`/ws`).
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and register the client for robot fan-out
//! - Decode-once, stamp the device id, forward upstream (in arrival order)
//! - Lifecycle: ping/pong + idle timeout + close on drain
//!
//! Clients never receive error frames: malformed input is logged and skipped.

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use crate::app_state::AppState;
use crate::realtime::Connection;
use crate::transport::codec::{decode, Inbound};

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(app, socket))
}

// --------------------
// Session lifecycle
// --------------------
async fn run_session(app: AppState, socket: WebSocket) {
    let (out_tx, out_rx) = mpsc::channel::<Message>(app.cfg().gateway.outbound_queue);

    let registry = app.registry();
    let conn_id = registry.add(Connection { tx: out_tx.clone() });
    let span = tracing::info_span!("session", conn_id);

    async {
        tracing::info!(clients = registry.len(), "client connected");
        session_loop(&app, socket, out_tx, out_rx).await;
        registry.remove(conn_id);
        tracing::info!(clients = registry.len(), "client disconnected");
    }
    .instrument(span)
    .await;
}

// --------------------
// Core session loop
// --------------------
async fn session_loop(
    app: &AppState,
    socket: WebSocket,
    out_tx: mpsc::Sender<Message>,
    mut out_rx: mpsc::Receiver<Message>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let gw = &app.cfg().gateway;
    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick fires immediately
    ping_tick.tick().await;

    let mut draining = app.draining();
    if *draining.borrow_and_update() {
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer (robot fan-out + pongs)
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode(msg) {
                    Ok(Inbound::Text(env)) => app.forward(env).await,
                    Ok(Inbound::Binary { bytes_len }) => {
                        tracing::debug!(bytes_len, "binary frame ignored");
                    }
                    Ok(Inbound::Ping(payload)) => {
                        let _ = out_tx.try_send(Message::Pong(payload));
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring malformed frame");
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("idle timeout");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }

            // process shutdown
            changed = draining.changed() => {
                if changed.is_err() || *draining.borrow() {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}
