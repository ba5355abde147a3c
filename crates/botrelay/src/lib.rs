//! Top-level facade crate for botrelay.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use botrelay_core::*;
}

pub mod gateway {
    pub use botrelay_gateway::*;
}
