//! Protocol modules.
//!
//! A single JSON envelope is used on both sides of the relay. Parsing is
//! panic-free: malformed input is reported as `RelayError` so a hostile or
//! buggy browser client cannot take the relay down.

pub mod envelope;

pub use envelope::{Envelope, CONNECT, METHOD};
