//! HTTP API handlers for tgbridge-gateway

pub mod authorize;
pub mod body;
pub mod health;
pub mod messages;

pub use authorize::authorize;
pub use health::health_routes;
pub use messages::send_message;
