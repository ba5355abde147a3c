//! Axum router wiring.
//!
//! - `GET  /ws`  : downstream WebSocket upgrade
//! - `POST /say` : speech command gateway
//! - `OPTIONS *` : 204 (CORS preflight)
//! - anything else: 404
//!
//! Every response carries the fixed CORS headers.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, http, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(transport::ws::ws_upgrade).fallback(http::not_found))
        .route("/say", post(http::say::say).fallback(http::not_found))
        .fallback(http::not_found)
        .layer(middleware::from_fn(http::cors::cors))
        .with_state(state)
}
