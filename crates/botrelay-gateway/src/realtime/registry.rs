use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::realtime::types::Frame;
use crate::upstream::FrameSink;

/// Process-unique downstream connection id.
pub type ConnId = u64;

/// One client's outbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<Message>,
}

/// Connected browser clients: `conn_id -> Connection`.
pub struct ClientRegistry {
    clients: DashMap<ConnId, Connection>,
    seq: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn add(&self, conn: Connection) -> ConnId {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(id, conn);
        id
    }

    /// Removing an unknown id is a no-op.
    pub fn remove(&self, id: ConnId) -> Option<Connection> {
        self.clients.remove(&id).map(|(_, conn)| conn)
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Lossy fan-out: try_send only. A full queue drops the frame for that
    /// client; a closed queue evicts the client. Returns the delivery count.
    ///
    /// Members are snapshotted first so no shard lock is held while sending
    /// and concurrent add/remove cannot disturb the iteration.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let snapshot: Vec<(ConnId, Connection)> = self
            .clients
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, conn) in snapshot {
            match conn.tx.try_send(frame.to_ws_message()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(conn_id = id, "client queue full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    self.remove(id);
                    tracing::debug!(conn_id = id, "client gone, evicted");
                }
            }
        }
        delivered
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for ClientRegistry {
    fn deliver(&self, frame: Frame) {
        let delivered = self.broadcast(&frame);
        tracing::trace!(delivered, "upstream frame fanned out");
    }
}
