/// Waypost - City POI Directory
///
/// A directory of crowd-submitted points of interest. Submissions and
/// comment reports sit in a moderation queue until a moderator finalizes
/// them; addresses are scored against a geocoder before anything goes
/// public.

mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod geo;
mod metrics;
mod moderation;
mod notify;
mod rate_limit;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::DirectoryResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> DirectoryResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypost=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    tracing::info!("Waypost POI Directory v{}", ctx.config.service.version);

    // Notification dispatch is a downstream consumer; until one is wired
    // up, log every emitted state change
    let mut events = ctx.notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(
                kind = event.entity_kind.as_str(),
                entity_id = %event.entity_id,
                previous = event.previous_state.as_str(),
                new = event.new_state.as_str(),
                actor = %event.actor_id,
                "stateChanged"
            );
        }
    });

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
