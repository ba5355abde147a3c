//! Plain HTTP surface: the `/say` command gateway, fixed CORS policy, 404 fallback.

pub mod cors;
pub mod say;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use botrelay_core::error::RelayError;

/// `RelayError` rendered as an HTTP response.
#[derive(Debug)]
pub struct HttpError(pub RelayError);

impl From<RelayError> for HttpError {
    fn from(e: RelayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        // upstream failures never reach here: `AppState::forward` logs them
        let status = match self.0 {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
