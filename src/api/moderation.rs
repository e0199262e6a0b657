/// Moderation queue endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{DirectoryError, DirectoryResult},
    moderation::{
        authorize, AuditEntry, EntityKind, EntityState, ModeratedEntity, ModerationStats, Role,
        StatsPeriod, TransitionOutcome,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/moderation/:kind/:id/approve", post(approve))
        .route("/api/moderation/:kind/:id/reject", post(reject))
        .route("/api/moderation/pending", get(list_pending))
        .route("/api/moderation/stats", get(stats))
        .route("/api/moderation/history/:id", get(history))
}

/// Parse the entity kind segment of a moderation URL
fn parse_kind(kind: &str) -> DirectoryResult<EntityKind> {
    match kind {
        "pois" | "poi_submission" => Ok(EntityKind::PoiSubmission),
        "reports" | "comment_report" => Ok(EntityKind::CommentReport),
        _ => Err(DirectoryError::NotFound(format!(
            "Unknown entity kind: {}",
            kind
        ))),
    }
}

/// Positive terminal state for a kind (approve / mark reviewed)
fn positive_target(kind: EntityKind) -> EntityState {
    match kind {
        EntityKind::PoiSubmission => EntityState::Approved,
        EntityKind::CommentReport => EntityState::Reviewed,
    }
}

/// Negative terminal state for a kind (reject / dismiss)
fn negative_target(kind: EntityKind) -> EntityState {
    match kind {
        EntityKind::PoiSubmission => EntityState::Rejected,
        EntityKind::CommentReport => EntityState::Dismissed,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    comments: Option<String>,
}

/// Approve a pending POI or mark a report reviewed
async fn approve(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<ApproveRequest>,
) -> DirectoryResult<Json<TransitionOutcome>> {
    let kind = parse_kind(&kind)?;
    let outcome = ctx
        .engine
        .transition(
            &id,
            positive_target(kind),
            &auth.actor(),
            req.comments.as_deref(),
        )
        .await?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectRequest {
    reason: Option<String>,
}

/// Reject a pending POI or dismiss a report
async fn reject(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<RejectRequest>,
) -> DirectoryResult<Json<TransitionOutcome>> {
    let kind = parse_kind(&kind)?;
    let outcome = ctx
        .engine
        .transition(
            &id,
            negative_target(kind),
            &auth.actor(),
            req.reason.as_deref(),
        )
        .await?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct PendingQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingResponse {
    entities: Vec<ModeratedEntity>,
    page: i64,
    limit: i64,
    total_pending: i64,
}

/// Pending moderation queue, oldest first
async fn list_pending(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<PendingQuery>,
) -> DirectoryResult<Json<PendingResponse>> {
    authorize(Some(auth.role), Role::Moderator).require("Moderation queue")?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let entities = ctx.entity_store.list_pending(page, limit).await?;
    let total_pending = ctx.entity_store.count_pending().await?;

    Ok(Json(PendingResponse {
        entities,
        page,
        limit,
        total_pending,
    }))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    period: Option<String>,
}

/// Aggregate transition counts, projected from the audit log
async fn stats(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<StatsQuery>,
) -> DirectoryResult<Json<ModerationStats>> {
    authorize(Some(auth.role), Role::Moderator).require("Moderation stats")?;

    let period = StatsPeriod::from_str(query.period.as_deref().unwrap_or("week"))?;
    let stats = ctx.engine.stats(period).await?;

    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    entity_id: String,
    entries: Vec<AuditEntry>,
}

/// Ordered audit trail for one entity
async fn history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> DirectoryResult<Json<HistoryResponse>> {
    authorize(Some(auth.role), Role::Moderator).require("Moderation history")?;

    let entries = ctx.engine.history(&id).await?;

    Ok(Json(HistoryResponse {
        entity_id: id,
        entries,
    }))
}
