//! Decode-once codec for downstream frames.
//!
//! - Text frames => Envelope
//! - Binary frames are not part of the client protocol and are surfaced only
//!   by size so the session can log and skip them
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use botrelay_core::{error::Result, protocol::Envelope};

#[derive(Debug)]
pub enum Inbound {
    Text(Envelope),
    Binary { bytes_len: usize },
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Text(Envelope::parse(&s)?)),
        Message::Binary(b) => Ok(Inbound::Binary { bytes_len: b.len() }),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}
