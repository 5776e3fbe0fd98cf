mod admin;
mod auth;
mod config;
mod db;
mod deliveries;
mod directory_client;
mod errors;
mod models;
mod recipients;
mod reminders;
mod response;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::admin::store::PgProfileStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::deliveries::store::PgDeliveryStore;
use crate::directory_client::HttpDirectoryClient;
use crate::recipients::cache::RecipientDirectory;
use crate::recipients::store::PgSnapshotStore;
use crate::reminders::dispatch::ReminderDispatcher;
use crate::reminders::mailer::HttpMailer;
use crate::reminders::store::PgReminderStore;
use crate::reminders::throttle::ThrottlePolicy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Postroom API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    let directory_client = HttpDirectoryClient::new(
        config.directory_api_url.clone(),
        config.directory_api_key.clone(),
        config.directory_items_path.clone(),
    )?;
    info!("Directory client initialized ({})", config.directory_api_url);

    let recipients = RecipientDirectory::new(
        Arc::new(PgSnapshotStore::new(db.clone())),
        Arc::new(directory_client),
        config.recipient_cache_max_age_months,
    );

    let mailer = HttpMailer::new(
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
    )?;
    let policy = ThrottlePolicy::new(
        config.reminder_throttle_days,
        config.reminder_throttle_counts_failures,
    );
    info!(
        "Reminder throttle: {} days, failures counted: {}",
        config.reminder_throttle_days, config.reminder_throttle_counts_failures
    );

    let deliveries = Arc::new(PgDeliveryStore::new(db.clone()));
    let reminder_logs = Arc::new(PgReminderStore::new(db.clone()));
    let reminders = ReminderDispatcher::new(
        deliveries.clone(),
        reminder_logs.clone(),
        Arc::new(mailer),
        policy,
    );

    if config.cron_secret.is_none() {
        info!("CRON_SECRET not set; the automatic reminder trigger will reject every call");
    }

    let state = AppState {
        config: config.clone(),
        recipients,
        deliveries,
        reminder_logs,
        reminders,
        profiles: Arc::new(PgProfileStore::new(db)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
