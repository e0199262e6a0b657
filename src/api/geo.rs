/// Address validation and proximity search endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::DirectoryResult,
    geo::proximity::NearbyEntity,
    geo::validator::AddressValidationResult,
    geo::GeoPoint,
    metrics,
    moderation::{authorize_any, Role},
};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/validate-address", post(validate_address))
        .route("/api/reverse-geocode", get(reverse_geocode))
        .route("/api/nearby", get(nearby))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateAddressRequest {
    address: String,
    latitude: f64,
    longitude: f64,
}

/// Wire form of a validation result: an unknown distance (no geocoder
/// candidates) serializes as null rather than an IEEE infinity
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateAddressResponse {
    is_valid: bool,
    confidence: f64,
    distance_km: Option<f64>,
    matched_geocode: Option<GeoPoint>,
    matched_address: Option<String>,
}

impl From<AddressValidationResult> for ValidateAddressResponse {
    fn from(result: AddressValidationResult) -> Self {
        Self {
            is_valid: result.is_valid,
            confidence: result.confidence,
            distance_km: result.distance_km.is_finite().then_some(result.distance_km),
            matched_geocode: result.matched_geocode,
            matched_address: result.matched_address,
        }
    }
}

/// Score a submitted address against its submitted coordinates
///
/// Open to bulk importers and to the moderation side, two unrelated
/// thresholds in the role order.
async fn validate_address(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ValidateAddressRequest>,
) -> DirectoryResult<Json<ValidateAddressResponse>> {
    authorize_any(Some(auth.role), &[Role::Collector, Role::Moderator])
        .require("Address validation")?;

    let result = ctx
        .address_validator
        .validate(&req.address, req.latitude, req.longitude)
        .await?;

    metrics::record_address_validation(result.is_valid);

    Ok(Json(result.into()))
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeQuery {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReverseGeocodeResponse {
    formatted_address: Option<String>,
}

/// Resolve coordinates back to a formatted address
async fn reverse_geocode(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ReverseGeocodeQuery>,
) -> DirectoryResult<Json<ReverseGeocodeResponse>> {
    authorize_any(Some(auth.role), &[Role::Collector, Role::Moderator])
        .require("Reverse geocoding")?;

    let formatted_address = ctx
        .address_validator
        .reverse(query.latitude, query.longitude)
        .await?;

    Ok(Json(ReverseGeocodeResponse { formatted_address }))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    /// Radius in kilometers
    radius: f64,
    category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyResponse {
    results: Vec<NearbyEntity>,
}

/// Approved entries within a radius, nearest first
async fn nearby(
    State(ctx): State<AppContext>,
    Query(query): Query<NearbyQuery>,
) -> DirectoryResult<Json<NearbyResponse>> {
    let center = GeoPoint::new(query.latitude, query.longitude)?;

    let results = ctx
        .proximity
        .find_within(&center, query.radius, query.category.as_deref())
        .await?;

    metrics::record_proximity_query("ok");

    Ok(Json(NearbyResponse { results }))
}
