//! GET /health
//!
//! Liveness plus enough build identification to tell which binary answered:
//! package version, commit, and the messaging backend compiled in.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

pub const MODULE_NAME: &str = env!("CARGO_PKG_NAME");

/// Messaging backend selected at compile time
pub const BACKEND: &str = if cfg!(feature = "telegram") {
    "telegram"
} else {
    "none"
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub backend: &'static str,
}

impl HealthReport {
    pub const fn current() -> Self {
        Self {
            status: "ok",
            module: MODULE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_HASH"),
            backend: BACKEND,
        }
    }
}

async fn report() -> Json<HealthReport> {
    Json(HealthReport::current())
}

/// Unauthenticated; merged into the main router
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(report))
}
