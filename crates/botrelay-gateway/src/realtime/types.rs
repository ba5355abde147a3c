use axum::extract::ws::Message;
use bytes::Bytes;

/// A frame received from the robot, fanned out to browsers unmodified.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Convert to axum::ws::Message for transport.
    /// NOTE: axum::Message::Binary requires Vec<u8>, so the binary path copies.
    pub fn to_ws_message(&self) -> Message {
        match self {
            Frame::Text(s) => Message::Text(s.clone()),
            Frame::Binary(b) => Message::Binary(b.to_vec()),
        }
    }
}
