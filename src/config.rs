/// Configuration management for the Waypost directory service
use crate::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub geocoding: GeocodingConfig,
    pub moderation: ModerationConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub directory_db: PathBuf,
}

/// Authentication configuration
///
/// Tokens are issued by the identity provider; this service only validates
/// them and reads the caller's id and role from the claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Geocoding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Hints appended to free-text queries to scope results to the city
    pub city_hint: String,
    pub country_hint: String,
}

/// Moderation and address-validation thresholds
///
/// The original intent for the exact constants is not pinned down anywhere,
/// so all of them are tunable here; the defaults are the reference policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Distance at which address-match confidence decays to zero
    pub confidence_decay_km: f64,
    /// Maximum distance for an address to count as valid
    pub valid_within_km: f64,
    /// Radius used to flag near-duplicate entries during approval
    pub duplicate_radius_km: f64,
    /// Cap on public proximity-search radius
    pub max_search_radius_km: f64,
    /// Minimum length of a rejection reason
    pub min_reason_length: usize,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DirectoryResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("WAYPOST_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("WAYPOST_PORT")
            .unwrap_or_else(|_| "4610".to_string())
            .parse()
            .map_err(|_| DirectoryError::Validation("Invalid port number".to_string()))?;
        let version = env::var("WAYPOST_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("WAYPOST_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let directory_db = env::var("WAYPOST_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("directory.sqlite"));

        let jwt_secret = env::var("WAYPOST_JWT_SECRET")
            .map_err(|_| DirectoryError::Validation("JWT secret required".to_string()))?;

        let geocoder_base_url = env::var("WAYPOST_GEOCODER_BASE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let geocoder_user_agent = env::var("WAYPOST_GEOCODER_USER_AGENT")
            .unwrap_or_else(|_| "Waypost/0.1 (POI Directory)".to_string());
        let geocoder_timeout_secs = env::var("WAYPOST_GEOCODER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let city_hint = env::var("WAYPOST_CITY_HINT").unwrap_or_else(|_| "Yaounde".to_string());
        let country_hint =
            env::var("WAYPOST_COUNTRY_HINT").unwrap_or_else(|_| "Cameroon".to_string());

        let confidence_decay_km = env::var("WAYPOST_CONFIDENCE_DECAY_KM")
            .unwrap_or_else(|_| "5.0".to_string())
            .parse()
            .unwrap_or(5.0);
        let valid_within_km = env::var("WAYPOST_VALID_WITHIN_KM")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse()
            .unwrap_or(2.0);
        let duplicate_radius_km = env::var("WAYPOST_DUPLICATE_RADIUS_KM")
            .unwrap_or_else(|_| "0.05".to_string())
            .parse()
            .unwrap_or(0.05);
        let max_search_radius_km = env::var("WAYPOST_MAX_SEARCH_RADIUS_KM")
            .unwrap_or_else(|_| "10.0".to_string())
            .parse()
            .unwrap_or(10.0);
        let min_reason_length = env::var("WAYPOST_MIN_REASON_LENGTH")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let rate_limit_enabled = env::var("WAYPOST_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("WAYPOST_RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("WAYPOST_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let burst_size = env::var("WAYPOST_RATE_LIMIT_BURST_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                directory_db,
            },
            authentication: AuthConfig { jwt_secret },
            geocoding: GeocodingConfig {
                base_url: geocoder_base_url,
                user_agent: geocoder_user_agent,
                timeout_secs: geocoder_timeout_secs,
                city_hint,
                country_hint,
            },
            moderation: ModerationConfig {
                confidence_decay_km,
                valid_within_km,
                duplicate_radius_km,
                max_search_radius_km,
                min_reason_length,
            },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.service.hostname.is_empty() {
            return Err(DirectoryError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(DirectoryError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.moderation.confidence_decay_km <= 0.0 {
            return Err(DirectoryError::Validation(
                "Confidence decay distance must be positive".to_string(),
            ));
        }

        if self.moderation.valid_within_km <= 0.0 {
            return Err(DirectoryError::Validation(
                "Validity threshold must be positive".to_string(),
            ));
        }

        if self.moderation.max_search_radius_km <= 0.0 {
            return Err(DirectoryError::Validation(
                "Search radius cap must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 4610,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                directory_db: "./data/directory.sqlite".into(),
            },
            authentication: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            },
            geocoding: GeocodingConfig {
                base_url: "https://nominatim.openstreetmap.org".to_string(),
                user_agent: "Waypost/0.1".to_string(),
                timeout_secs: 10,
                city_hint: "Yaounde".to_string(),
                country_hint: "Cameroon".to_string(),
            },
            moderation: ModerationConfig {
                confidence_decay_km: 5.0,
                valid_within_km: 2.0,
                duplicate_radius_km: 0.05,
                max_search_radius_km: 10.0,
                min_reason_length: 10,
            },
            rate_limit: RateLimitSettings {
                enabled: true,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = test_config();
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nonpositive_thresholds_rejected() {
        let mut config = test_config();
        config.moderation.valid_within_km = 0.0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.moderation.max_search_radius_km = -1.0;
        assert!(config.validate().is_err());
    }
}
