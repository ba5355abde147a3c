//! Robot command envelope (JSON).
//!
//! The relay treats envelopes as opaque apart from `robot`, which it always
//! stamps with its own configured device id before anything goes upstream.
//! Only `type` has to be a string; every other field is kept as raw JSON and
//! written back out unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// `type` of the handshake envelope sent when the upstream link opens.
pub const CONNECT: &str = "connect";
/// `type` of a service method call.
pub const METHOD: &str = "method";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Device id. Whatever a client put here is replaced by `stamp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot: Option<Value>,
    /// Upstream subsystem (e.g. "ALTextToSpeech").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    /// Usually an array; forwarded as given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Anything else the client sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// `{"type":"connect","robot":<id>}`
    pub fn connect(robot: &str) -> Self {
        Self {
            msg_type: CONNECT.to_string(),
            robot: Some(Value::from(robot)),
            service: None,
            method: None,
            args: None,
            extra: Map::new(),
        }
    }

    /// `{"type":"method","robot":<id>,"service":..,"method":..,"args":[..]}`
    pub fn method(robot: &str, service: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            msg_type: METHOD.to_string(),
            robot: Some(Value::from(robot)),
            service: Some(Value::from(service)),
            method: Some(Value::from(method)),
            args: Some(Value::Array(args)),
            extra: Map::new(),
        }
    }

    /// Parse a downstream text frame.
    pub fn parse(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| RelayError::BadRequest(format!("invalid envelope json: {e}")))
    }

    /// Overwrite (or insert) the device id, whatever type the client used.
    pub fn stamp(&mut self, robot: &str) {
        self.robot = Some(Value::from(robot));
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RelayError::Internal(format!("envelope encode failed: {e}")))
    }
}
