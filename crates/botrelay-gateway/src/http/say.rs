//! `POST /say`: one-shot speech command.
//!
//! Fire-and-forget. The response never reflects what the robot did, and a down
//! upstream link still answers `200`.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form,
};
use serde::Deserialize;
use serde_json::{Number, Value};

use botrelay_core::error::RelayError;
use botrelay_core::protocol::Envelope;

use crate::app_state::AppState;
use crate::http::HttpError;

/// Validated `/say` body.
#[derive(Debug, Clone, PartialEq)]
pub struct SayCommand {
    pub message: String,
    /// Only kept when numeric.
    pub volume: Option<Number>,
}

/// Form-encoded fields arrive as strings.
#[derive(Debug, Deserialize)]
struct SayForm {
    message: Option<String>,
    volume: Option<String>,
}

impl SayCommand {
    pub fn from_json(body: &[u8]) -> Result<Self, RelayError> {
        let v: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::BadRequest(format!("invalid json body: {e}")))?;

        let message = match v.get("message") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let volume = match v.get("volume") {
            Some(Value::Number(n)) => Some(n.clone()),
            _ => None,
        };
        Self::new(message, volume)
    }

    fn from_form(form: SayForm) -> Result<Self, RelayError> {
        let volume = form
            .volume
            .and_then(|s| s.trim().parse::<f64>().ok())
            .and_then(Number::from_f64);
        Self::new(form.message.unwrap_or_default(), volume)
    }

    fn new(message: String, volume: Option<Number>) -> Result<Self, RelayError> {
        if message.is_empty() {
            return Err(RelayError::BadRequest("message is required".into()));
        }
        Ok(Self { message, volume })
    }
}

#[async_trait]
impl<S> FromRequest<S> for SayCommand
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(form) = Form::<SayForm>::from_request(req, state)
                .await
                .map_err(|e| RelayError::BadRequest(e.body_text()))?;
            return Ok(Self::from_form(form)?);
        }

        // JSON regardless of content type; browser forms often post text/plain
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| RelayError::BadRequest(e.body_text()))?;
        Ok(Self::from_json(&body)?)
    }
}

pub async fn say(State(app): State<AppState>, cmd: SayCommand) -> impl IntoResponse {
    let say_cfg = &app.cfg().say;
    tracing::info!(message = %cmd.message, volume = ?cmd.volume, "say");

    if let Some(volume) = cmd.volume {
        app.forward(Envelope::method(
            app.robot(),
            &say_cfg.service,
            "setVolume",
            vec![Value::Number(volume)],
        ))
        .await;
        // keep the two frames apart on the robot side
        tokio::time::sleep(Duration::from_millis(say_cfg.volume_gap_ms)).await;
    }

    app.forward(Envelope::method(
        app.robot(),
        &say_cfg.service,
        "say",
        vec![Value::String(cmd.message)],
    ))
    .await;

    (StatusCode::OK, "OK")
}
