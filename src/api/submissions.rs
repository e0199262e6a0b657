/// Submission ingress endpoints
///
/// Everything enters the directory in `pending`; only the moderation engine
/// moves entries out of it.
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{DirectoryError, DirectoryResult},
    geo::GeoPoint,
    moderation::{authorize, EntityKind, ModeratedEntity, NewEntity, Role},
};
use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/pois", post(submit_poi))
        .route("/api/reports", post(submit_report))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SubmitPoiRequest {
    #[validate(length(min = 1, max = 200))]
    name: String,
    #[validate(length(max = 2000))]
    description: Option<String>,
    #[validate(length(min = 3, max = 500))]
    address: String,
    latitude: f64,
    longitude: f64,
    #[validate(length(min = 1, max = 100))]
    category: Option<String>,
}

/// Submit a new point of interest (starts out pending)
async fn submit_poi(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<SubmitPoiRequest>,
) -> DirectoryResult<Json<ModeratedEntity>> {
    authorize(Some(auth.role), Role::Member).require("POI submission")?;

    req.validate()
        .map_err(|e| DirectoryError::Validation(e.to_string()))?;

    // Coordinates are checked before anything is stored
    let point = GeoPoint::new(req.latitude, req.longitude)?;

    let entity = ctx
        .entity_store
        .create(NewEntity {
            kind: EntityKind::PoiSubmission,
            name: req.name,
            description: req.description,
            address: Some(req.address),
            latitude: Some(point.latitude),
            longitude: Some(point.longitude),
            category: req.category,
            subject_ref: None,
            submitted_by: auth.user_id.clone(),
        })
        .await?;

    Ok(Json(entity))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SubmitReportRequest {
    /// Reference to the comment being reported
    #[validate(length(min = 1, max = 200))]
    subject_ref: String,
    #[validate(length(min = 1, max = 200))]
    summary: String,
    #[validate(length(max = 2000))]
    details: Option<String>,
}

/// Report a comment for moderator review (starts out pending)
async fn submit_report(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<SubmitReportRequest>,
) -> DirectoryResult<Json<ModeratedEntity>> {
    authorize(Some(auth.role), Role::Member).require("Comment reporting")?;

    req.validate()
        .map_err(|e| DirectoryError::Validation(e.to_string()))?;

    let entity = ctx
        .entity_store
        .create(NewEntity {
            kind: EntityKind::CommentReport,
            name: req.summary,
            description: req.details,
            address: None,
            latitude: None,
            longitude: None,
            category: None,
            subject_ref: Some(req.subject_ref),
            submitted_by: auth.user_id.clone(),
        })
        .await?;

    Ok(Json(entity))
}
