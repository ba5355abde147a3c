//! botrelay core: the robot control envelope and the relay's error type.
//!
//! Both the robot socket and browser clients speak the same JSON envelope.
//! Nothing in here depends on tokio or axum.
//!
//! Client frames are untrusted, so `unwrap`/`expect`/`panic!` are denied below;
//! bad input comes back as `RelayError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

pub use error::{RelayError, Result};
