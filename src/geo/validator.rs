/// Confidence-scored address validation
use crate::config::ModerationConfig;
use crate::error::DirectoryResult;
use crate::geo::geocoder::GeocodingProvider;
use crate::geo::GeoPoint;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of validating a free-text address against a submitted point
///
/// Computed fresh per call; the core never persists these. A `distance_km`
/// of infinity means the address produced no geocoder candidates at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub distance_km: f64,
    pub matched_geocode: Option<GeoPoint>,
    pub matched_address: Option<String>,
}

impl AddressValidationResult {
    fn no_match() -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            distance_km: f64::INFINITY,
            matched_geocode: None,
            matched_address: None,
        }
    }
}

/// Scores a submitted address against the geocoding provider
pub struct AddressValidator {
    geocoder: Arc<dyn GeocodingProvider>,
    /// Distance at which confidence decays to zero
    confidence_decay_km: f64,
    /// Maximum distance for the address to count as valid; tuned
    /// independently of the confidence curve
    valid_within_km: f64,
    city_hint: String,
    country_hint: String,
}

impl AddressValidator {
    pub fn new(
        geocoder: Arc<dyn GeocodingProvider>,
        moderation: &ModerationConfig,
        city_hint: String,
        country_hint: String,
    ) -> Self {
        Self {
            geocoder,
            confidence_decay_km: moderation.confidence_decay_km,
            valid_within_km: moderation.valid_within_km,
            city_hint,
            country_hint,
        }
    }

    /// Validate a submitted address against submitted raw coordinates
    ///
    /// Coordinates are range-checked before the provider is contacted, so an
    /// out-of-range pair never costs an external call.
    pub async fn validate(
        &self,
        address: &str,
        latitude: f64,
        longitude: f64,
    ) -> DirectoryResult<AddressValidationResult> {
        let submitted = GeoPoint::new(latitude, longitude)?;
        self.validate_point(address, &submitted).await
    }

    /// Validate a submitted address against an already-validated point
    pub async fn validate_point(
        &self,
        address: &str,
        submitted: &GeoPoint,
    ) -> DirectoryResult<AddressValidationResult> {
        let candidates = self
            .geocoder
            .geocode(address, &self.city_hint, &self.country_hint)
            .await?;

        // Nearest candidate wins, not first-returned
        let nearest = candidates.into_iter().min_by(|a, b| {
            let da = submitted.distance_km(&a.point);
            let db = submitted.distance_km(&b.point);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });

        let Some(candidate) = nearest else {
            debug!(address = %address, "No geocoder candidates for address");
            return Ok(AddressValidationResult::no_match());
        };

        let distance_km = submitted.distance_km(&candidate.point);
        let confidence = (1.0 - distance_km / self.confidence_decay_km).max(0.0);
        let is_valid = distance_km <= self.valid_within_km;

        debug!(
            address = %address,
            distance_km,
            confidence,
            is_valid,
            "Address validated"
        );

        Ok(AddressValidationResult {
            is_valid,
            confidence,
            distance_km,
            matched_geocode: Some(candidate.point),
            matched_address: Some(candidate.formatted_address),
        })
    }

    /// Reverse-geocode raw coordinates, range-checking before the provider call
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> DirectoryResult<Option<String>> {
        let point = GeoPoint::new(latitude, longitude)?;
        self.geocoder.reverse_geocode(&point).await
    }
}
