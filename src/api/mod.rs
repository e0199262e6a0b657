/// HTTP API layer
pub mod geo;
pub mod health;
pub mod moderation;
pub mod submissions;

use crate::context::AppContext;
use axum::Router;

/// Build all API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(submissions::routes())
        .merge(moderation::routes())
        .merge(geo::routes())
}
