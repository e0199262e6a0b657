/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::DirectoryResult,
    geo::geocoder::{GeocodingProvider, NominatimGeocoder},
    geo::proximity::ProximityIndex,
    geo::validator::AddressValidator,
    moderation::{AuditStore, EntityStore, ModerationEngine},
    notify::ChangeNotifier,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub entity_store: EntityStore,
    pub audit_store: AuditStore,
    pub engine: ModerationEngine,
    pub address_validator: Arc<AddressValidator>,
    pub proximity: ProximityIndex,
    pub notifier: ChangeNotifier,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> DirectoryResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize the directory database
        let db = db::create_pool(&config.storage.directory_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        // Stores
        let entity_store = EntityStore::new(db.clone());
        let audit_store = AuditStore::new(db.clone());
        let proximity =
            ProximityIndex::new(db.clone(), config.moderation.max_search_radius_km);

        // Geocoding provider and address validator
        let geocoder: Arc<dyn GeocodingProvider> =
            Arc::new(NominatimGeocoder::new(&config.geocoding)?);
        let address_validator = Arc::new(AddressValidator::new(
            Arc::clone(&geocoder),
            &config.moderation,
            config.geocoding.city_hint.clone(),
            config.geocoding.country_hint.clone(),
        ));

        // State-change notifications
        let notifier = ChangeNotifier::default();

        // Moderation engine
        let engine = ModerationEngine::new(
            entity_store.clone(),
            audit_store.clone(),
            proximity.clone(),
            notifier.clone(),
            config.moderation.min_reason_length,
            config.moderation.duplicate_radius_km,
        );

        // Rate limiter
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            db,
            entity_store,
            audit_store,
            engine,
            address_validator,
            proximity,
            notifier,
            rate_limiter,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> DirectoryResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                crate::error::DirectoryError::Internal(format!(
                    "Failed to create directory {:?}: {}",
                    dir, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
