//! Relay config loader (strict parsing + env overrides).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use botrelay_core::error::{RelayError, Result};

pub use schema::{GatewaySection, RelayConfig, SaySection, UpstreamMode, UpstreamSection};

/// Env var naming the YAML file.
pub const CONFIG_PATH_ENV: &str = "BOTRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "botrelay.yaml";

/// Load the file named by `BOTRELAY_CONFIG` (a missing file means defaults),
/// apply `BOTRELAY_*` overrides, then validate.
pub fn load() -> Result<RelayConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = match fs::read_to_string(&path) {
        Ok(s) => parse(&s)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            RelayConfig::default()
        }
        Err(e) => return Err(RelayError::Internal(format!("read config failed: {e}"))),
    };
    apply_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RelayError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<RelayConfig> {
    serde_yaml::from_str(s).map_err(|e| RelayError::BadRequest(format!("invalid yaml: {e}")))
}

/// Overlay environment values. `lookup` is injected so tests do not touch the process env.
pub fn apply_overrides<F>(cfg: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("BOTRELAY_LISTEN") {
        cfg.gateway.listen = v;
    }
    if let Some(v) = lookup("BOTRELAY_UPSTREAM_URL") {
        cfg.upstream.url = v;
    }
    if let Some(v) = lookup("BOTRELAY_ROBOT") {
        cfg.upstream.robot = v;
    }
    if let Some(v) = lookup("BOTRELAY_UPSTREAM_MODE") {
        cfg.upstream.mode = UpstreamMode::parse(&v)?;
    }
    Ok(())
}
