use std::net::SocketAddr;

use serde::Deserialize;
use botrelay_core::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub upstream: UpstreamSection,

    #[serde(default)]
    pub say: SaySection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            upstream: UpstreamSection::default(),
            say: SaySection::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.upstream.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-client outbound queue depth. Broadcasts to a full queue are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadRequest(
                "gateway.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(2000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RelayError::BadRequest(
                "gateway.idle_timeout_ms must be between 2000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(RelayError::BadRequest(
                "gateway.outbound_queue must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|_| RelayError::BadRequest(format!("gateway.listen is not a socket address: {}", self.listen)))
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    256
}

/// Which upstream transport to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamMode {
    /// Real WebSocket connection to the robot socket.
    Live,
    /// Log-only transport for running without a robot.
    Noop,
}

impl UpstreamMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(UpstreamMode::Live),
            "noop" => Ok(UpstreamMode::Noop),
            other => Err(RelayError::BadRequest(format!("unknown upstream mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSection {
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Device id stamped on every envelope sent upstream.
    #[serde(default = "default_robot")]
    pub robot: String,

    #[serde(default = "default_mode")]
    pub mode: UpstreamMode,

    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Upper bound on one upstream write, lock wait included. A write that
    /// runs past it drops the connection.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            robot: default_robot(),
            mode: default_mode(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl UpstreamSection {
    pub fn validate(&self) -> Result<()> {
        // no TLS stack is compiled into the upstream client
        if !self.url.starts_with("ws://") {
            return Err(RelayError::BadRequest("upstream.url must start with ws://".into()));
        }
        if self.robot.trim().is_empty() {
            return Err(RelayError::BadRequest("upstream.robot must not be empty".into()));
        }
        if self.reconnect_base_ms == 0 {
            return Err(RelayError::BadRequest(
                "upstream.reconnect_base_ms must be greater than 0".into(),
            ));
        }
        if self.reconnect_max_ms < self.reconnect_base_ms {
            return Err(RelayError::BadRequest(
                "upstream.reconnect_max_ms must be >= reconnect_base_ms".into(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(RelayError::BadRequest(
                "upstream.send_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_upstream_url() -> String {
    "ws://127.0.0.1:9000".into()
}
fn default_robot() -> String {
    "127.0.0.1".into()
}
fn default_mode() -> UpstreamMode {
    UpstreamMode::Live
}
fn default_reconnect_base_ms() -> u64 {
    1000
}
fn default_reconnect_max_ms() -> u64 {
    8000
}
fn default_send_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaySection {
    /// Text-to-speech service name on the robot.
    #[serde(default = "default_tts_service")]
    pub service: String,

    /// Gap between `setVolume` and `say` so the robot side does not see them glued together.
    #[serde(default = "default_volume_gap_ms")]
    pub volume_gap_ms: u64,
}

impl Default for SaySection {
    fn default() -> Self {
        Self {
            service: default_tts_service(),
            volume_gap_ms: default_volume_gap_ms(),
        }
    }
}

fn default_tts_service() -> String {
    "ALTextToSpeech".into()
}
fn default_volume_gap_ms() -> u64 {
    10
}
