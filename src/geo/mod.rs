/// Geospatial primitives and services
///
/// Coordinates are validated at ingress: an out-of-range latitude or
/// longitude is rejected, never clamped, and no downstream work (geocoder
/// calls included) happens on invalid input.
pub mod geocoder;
pub mod proximity;
pub mod validator;

use crate::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all great-circle math in the service
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Construct a point, rejecting out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> DirectoryResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DirectoryError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DirectoryError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another point in kilometers (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance between two coordinate pairs in kilometers
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_range_validation() {
        assert!(GeoPoint::new(3.8480, 11.5021).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());

        assert!(GeoPoint::new(200.0, 11.5021).is_err());
        assert!(GeoPoint::new(3.8480, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_identity() {
        let p = GeoPoint::new(3.8480, 11.5021).unwrap();
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn test_distance_symmetry() {
        let p = GeoPoint::new(3.8480, 11.5021).unwrap();
        let q = GeoPoint::new(3.8700, 11.5180).unwrap();
        let pq = p.distance_km(&q);
        let qp = q.distance_km(&p);
        assert!((pq - qp).abs() < 1e-12);
        assert!(pq > 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Minneapolis to St. Paul is roughly 16 km
        let d = haversine_km(44.98, -93.27, 44.95, -93.09);
        assert!(d > 15.0 && d < 17.0);
    }
}
