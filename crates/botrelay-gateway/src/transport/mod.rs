//! Transport layer (downstream WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that decodes client frames
//! once before they are stamped and forwarded upstream.

pub mod codec;
pub mod ws;
