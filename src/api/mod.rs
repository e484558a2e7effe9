//! API layer
//!
//! HTTP handlers for:
//! - Comments (cached reads, moderation actions)
//! - Direct messages (cached reads, sending)
//! - Publications (CRUD, scheduling, publishing)
//! - Metrics (Prometheus)

mod comments;
mod direct;
pub mod metrics;
mod publications;

use axum::Router;

use crate::AppState;

pub use metrics::metrics_router;

/// Compose all /api routes
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(comments::router())
        .merge(direct::router())
        .merge(publications::router())
}
