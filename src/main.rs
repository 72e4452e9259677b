//! Storefront core HTTP service

use anyhow::Result;
use std::sync::Arc;
use storefront_core::api::{router, AppState};
use storefront_core::config::load_app_config;
use storefront_core::domain::services::order_message::OrderComposer;
use storefront_core::presence::{InMemoryExpiringStore, PresenceApproximator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into())).with(tracing_subscriber::fmt::layer()).init();

    let store = Arc::new(InMemoryExpiringStore::new());
    let state = AppState {
        presence: PresenceApproximator::new(store.clone(), config.presence_ttl),
        composer: Arc::new(OrderComposer::new(config.currency.clone(), config.messaging_host.clone())),
        timezone: config.timezone,
    };

    // Expired presence keys are skipped on read; the sweeper bounds memory.
    let sweep_every = config.presence_sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 { tracing::debug!(purged, "swept expired presence keys"); }
        }
    });

    tracing::info!(timezone = %config.timezone, "storefront-core listening on {}", config.bind_addr);
    axum::serve(tokio::net::TcpListener::bind(config.bind_addr).await?, router(state)).await?;
    Ok(())
}
