/// Proximity queries over approved directory entries
///
/// Backs both the public "what is nearby" search and the engine's
/// near-duplicate flagging. Queries are stateless: each call computes a
/// fresh, consistent, ascending-distance sequence at query time.
use crate::error::{DirectoryError, DirectoryResult};
use crate::geo::{GeoPoint, EARTH_RADIUS_KM};
use crate::moderation::entity::{parse_entity, ModeratedEntity};
use serde::Serialize;
use sqlx::SqlitePool;

/// An approved entry together with its distance from the query center
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyEntity {
    #[serde(flatten)]
    pub entity: ModeratedEntity,
    pub distance_km: f64,
}

/// Proximity index over the entity store
#[derive(Clone)]
pub struct ProximityIndex {
    db: SqlitePool,
    max_search_radius_km: f64,
}

impl ProximityIndex {
    pub fn new(db: SqlitePool, max_search_radius_km: f64) -> Self {
        Self {
            db,
            max_search_radius_km,
        }
    }

    /// Approved entities within `radius_km` of `center`, nearest first
    ///
    /// The radius cap is a hard rejection rather than a silent clamp so
    /// callers are never misled about result completeness.
    pub async fn find_within(
        &self,
        center: &GeoPoint,
        radius_km: f64,
        category: Option<&str>,
    ) -> DirectoryResult<Vec<NearbyEntity>> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(DirectoryError::Validation(format!(
                "Search radius must be positive, got {}",
                radius_km
            )));
        }
        if radius_km > self.max_search_radius_km {
            return Err(DirectoryError::RadiusTooLarge {
                requested_km: radius_km,
                max_km: self.max_search_radius_km,
            });
        }

        self.query(center, radius_km, category).await
    }

    /// Engine-facing variant used for duplicate flagging; not subject to the
    /// public radius cap (the duplicate radius is a small configured value)
    pub async fn near_duplicates(
        &self,
        center: &GeoPoint,
        radius_km: f64,
    ) -> DirectoryResult<Vec<NearbyEntity>> {
        self.query(center, radius_km, None).await
    }

    async fn query(
        &self,
        center: &GeoPoint,
        radius_km: f64,
        category: Option<&str>,
    ) -> DirectoryResult<Vec<NearbyEntity>> {
        let (min_lat, max_lat, min_lng, max_lng) = bounding_box(center, radius_km);

        // Bounding-box prefilter in SQL, exact haversine filter in memory
        let rows = if let Some(category) = category {
            sqlx::query(
                r#"
                SELECT id, kind, state, name, description, address, latitude, longitude,
                       category, subject_ref, submitted_by, created_at,
                       reviewed_by, reviewed_at, review_comment
                FROM moderated_entity
                WHERE state = 'approved'
                  AND latitude BETWEEN ? AND ?
                  AND longitude BETWEEN ? AND ?
                  AND category = ?
                "#,
            )
            .bind(min_lat)
            .bind(max_lat)
            .bind(min_lng)
            .bind(max_lng)
            .bind(category)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT id, kind, state, name, description, address, latitude, longitude,
                       category, subject_ref, submitted_by, created_at,
                       reviewed_by, reviewed_at, review_comment
                FROM moderated_entity
                WHERE state = 'approved'
                  AND latitude BETWEEN ? AND ?
                  AND longitude BETWEEN ? AND ?
                "#,
            )
            .bind(min_lat)
            .bind(max_lat)
            .bind(min_lng)
            .bind(max_lng)
            .fetch_all(&self.db)
            .await?
        };

        let mut nearby = Vec::new();
        for row in rows {
            let entity = parse_entity(row)?;
            let (Some(lat), Some(lng)) = (entity.latitude, entity.longitude) else {
                continue;
            };
            let distance_km = GeoPoint::new(lat, lng)?.distance_km(center);
            if distance_km <= radius_km {
                nearby.push(NearbyEntity {
                    entity,
                    distance_km,
                });
            }
        }

        nearby.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(nearby)
    }
}

/// Degree bounding box around a center point for a radius in kilometers
fn bounding_box(center: &GeoPoint, radius_km: f64) -> (f64, f64, f64, f64) {
    let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
    // Longitude degrees shrink with latitude; clamp the cosine away from
    // zero so polar centers degrade to a full-longitude scan instead of NaN
    let lng_delta = lat_delta / center.latitude.to_radians().cos().abs().max(1e-6);
    let lng_delta = lng_delta.min(180.0);

    (
        (center.latitude - lat_delta).max(-90.0),
        (center.latitude + lat_delta).min(90.0),
        (center.longitude - lng_delta).max(-180.0),
        (center.longitude + lng_delta).min(180.0),
    )
}
