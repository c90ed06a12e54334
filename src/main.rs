mod call_types;
mod config;
mod db_types;
mod error;
mod handlers;
mod idempotency;
mod tasks;
mod types;
mod utils;
mod validate;
mod zendesk;
mod zendesk_types;

use crate::config::Config;
use crate::idempotency::{IdempotencyStore, MemoryIdempotencyStore, PgIdempotencyStore};
use crate::types::AppState;
use crate::zendesk::ZendeskClient;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/call_events_manager", post(handlers::call_events_manager))
        .route("/create_zendesk_ticket", post(handlers::create_zendesk_ticket))
        .route("/test_zendesk_flow", get(handlers::test_zendesk_flow))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    let level = config.log_level.parse().unwrap_or(LevelFilter::INFO);
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", LevelFilter::OFF),
            ("voicedesk_rs", level),
        ]));
    tracing::subscriber::set_global_default(subscriber)?;
    info!(environment = %config.environment, "starting {}", config.service_name);

    let tickets = Arc::new(ZendeskClient::new(&config)?);
    let processed_calls: Arc<dyn IdempotencyStore> = match &config.database_url {
        Some(url) => Arc::new(PgIdempotencyStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set; processed calls are tracked in memory only");
            Arc::new(MemoryIdempotencyStore::new())
        }
    };
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let app_state = Arc::new(AppState {
        config,
        tickets,
        processed_calls,
    });

    info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app(app_state).into_make_service())
        .await?;
    Ok(())
}
