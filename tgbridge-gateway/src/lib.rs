//! tgbridge-gateway library
//!
//! HTTP façade over a messaging client: `POST /authorize` signs an account in
//! with a QR code and returns its session token, `POST /send-message` sends
//! on behalf of an authorized account. Sessions live in process memory.

use axum::{routing::post, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod login;
pub mod qr;
pub mod session_store;
#[cfg(feature = "telegram")]
pub mod telegram;

pub use error::{Error, Result};

use client::ClientFactory;
use qr::QrStore;
use session_store::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Account id → session token
    pub sessions: Arc<dyn SessionStore>,
    /// Opens messaging-platform connections
    pub clients: Arc<dyn ClientFactory>,
    /// QR image directory
    pub qr: Arc<QrStore>,
    /// Upper bound on one QR login
    pub login_timeout: Duration,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        clients: Arc<dyn ClientFactory>,
        qr: Arc<QrStore>,
        login_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            clients,
            qr,
            login_timeout,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/authorize", post(api::authorize))
        .route("/send-message", post(api::send_message))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
