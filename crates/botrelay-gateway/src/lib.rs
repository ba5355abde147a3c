//! botrelay gateway library entry.
//!
//! This crate wires the upstream robot link, the downstream WebSocket relay,
//! the HTTP command gateway, and the process supervisor into one relay. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod http;
pub mod realtime;
pub mod router;
pub mod supervisor;
pub mod transport;
pub mod upstream;
