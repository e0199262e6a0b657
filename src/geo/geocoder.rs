/// Geocoding provider seam
///
/// The directory only ever talks to a geocoder through this trait, so the
/// address validator can be exercised against a scripted provider in tests.
/// Implementations must keep "no match" (Ok with an empty candidate list)
/// distinguishable from "provider unavailable" (Err): the former is a
/// data-quality signal about the submitted address, the latter must not
/// penalize the submitter.
use crate::config::GeocodingConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::geo::GeoPoint;
use crate::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// One geocoder candidate for a free-text address
#[derive(Debug, Clone)]
pub struct GeocodeCandidate {
    pub point: GeoPoint,
    pub formatted_address: String,
    /// Provider-specific granularity rank; lower is more specific
    pub place_rank: Option<i32>,
}

/// External geocoding collaborator
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Resolve a free-text address to zero or more candidate points
    async fn geocode(
        &self,
        address: &str,
        city_hint: &str,
        country_hint: &str,
    ) -> DirectoryResult<Vec<GeocodeCandidate>>;

    /// Resolve a point back to a formatted address, if the provider knows one
    async fn reverse_geocode(&self, point: &GeoPoint) -> DirectoryResult<Option<String>>;
}

/// Nominatim (OpenStreetMap) search response row
#[derive(Debug, Deserialize)]
struct NominatimSearchRow {
    lat: String,
    lon: String,
    display_name: String,
    place_rank: Option<i32>,
}

/// Nominatim reverse response
#[derive(Debug, Deserialize)]
struct NominatimReverseResponse {
    display_name: Option<String>,
}

/// Nominatim-backed geocoding provider
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> DirectoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DirectoryError::Internal(format!("Failed to build geocoder client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    fn parse_row(row: &NominatimSearchRow) -> DirectoryResult<GeocodeCandidate> {
        let lat: f64 = row.lat.parse().map_err(|_| {
            DirectoryError::GeocodingUnavailable("Invalid latitude in provider response".to_string())
        })?;
        let lon: f64 = row.lon.parse().map_err(|_| {
            DirectoryError::GeocodingUnavailable(
                "Invalid longitude in provider response".to_string(),
            )
        })?;

        Ok(GeocodeCandidate {
            point: GeoPoint::new(lat, lon)?,
            formatted_address: row.display_name.clone(),
            place_rank: row.place_rank,
        })
    }
}

#[async_trait]
impl GeocodingProvider for NominatimGeocoder {
    async fn geocode(
        &self,
        address: &str,
        city_hint: &str,
        country_hint: &str,
    ) -> DirectoryResult<Vec<GeocodeCandidate>> {
        let query = format!("{}, {}, {}", address.trim(), city_hint, country_hint);
        let url = format!(
            "{}/search?q={}&format=json&limit=5",
            self.base_url,
            urlencoding::encode(&query)
        );

        debug!(query = %query, "Geocoding address");

        let rows: Vec<NominatimSearchRow> = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Geocoder request failed");
                metrics::record_geocoder_lookup("error");
                DirectoryError::GeocodingUnavailable(format!("Provider request failed: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                warn!(error = %e, "Geocoder returned error status");
                metrics::record_geocoder_lookup("error");
                DirectoryError::GeocodingUnavailable(format!("Provider returned error: {}", e))
            })?
            .json()
            .await
            .map_err(|e| {
                metrics::record_geocoder_lookup("error");
                DirectoryError::GeocodingUnavailable(format!("Unparseable provider response: {}", e))
            })?;

        // An empty list is a legitimate "no match", not a failure
        metrics::record_geocoder_lookup(if rows.is_empty() { "no_match" } else { "ok" });

        rows.iter().map(Self::parse_row).collect()
    }

    async fn reverse_geocode(&self, point: &GeoPoint) -> DirectoryResult<Option<String>> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json",
            self.base_url, point.latitude, point.longitude
        );

        let response: NominatimReverseResponse = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Reverse geocoder request failed");
                DirectoryError::GeocodingUnavailable(format!("Provider request failed: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                DirectoryError::GeocodingUnavailable(format!("Provider returned error: {}", e))
            })?
            .json()
            .await
            .map_err(|e| {
                DirectoryError::GeocodingUnavailable(format!("Unparseable provider response: {}", e))
            })?;

        Ok(response.display_name)
    }
}
