/// Health and telemetry endpoints
use crate::{context::AppContext, metrics};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
}

/// Health check handler
async fn health_check(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let db_ok = crate::db::test_connection(&ctx.db).await.is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "version": ctx.config.service.version,
    }))
}

/// Prometheus text-format metrics
async fn render_metrics() -> String {
    metrics::render_metrics()
}
