//! Realtime runtime (egress side) for the relay.
//!
//! ClientRegistry + fan-out of robot frames to every connected browser.

pub mod registry;
pub mod types;

pub use registry::{ClientRegistry, ConnId, Connection};
pub use types::Frame;
