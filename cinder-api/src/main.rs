//! Cinder API Server
//!
//! Streams campaign and trade events to browsers over SSE and serves
//! chart history built from indexed trades.

mod config;
mod error;
mod routes;

use cinder_indexer::IndexerClient;
use cinder_quotes::CoinMarketCapClient;
use cinder_services::{
    ChartService, EventBroker, NotificationService, PriceFeed, QuoteSource, SessionConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{QuoteConfig, ServiceConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<EventBroker>,
    pub notifications: Arc<NotificationService>,
    pub charts: Arc<ChartService>,
    pub session: SessionConfig,
    pub indexer_url: Arc<str>,
    /// Cancelled on shutdown; every stream session holds a child token
    pub shutdown: CancellationToken,
}

fn price_feed(quotes: Option<&QuoteConfig>) -> PriceFeed {
    let Some(quotes) = quotes else {
        info!("COINMK_API_KEY/COINMK_API_ENDPOINT not set - USD values disabled");
        return PriceFeed::disabled();
    };

    match CoinMarketCapClient::new(&quotes.api_key, &quotes.endpoint, &quotes.symbol) {
        Ok(client) => {
            info!("Polling {} quotes from {}", client.symbol(), client.endpoint());
            let source: Arc<dyn QuoteSource> = Arc::new(client);
            PriceFeed::new(source, quotes.poll_interval)
        }
        Err(e) => {
            warn!("Price feed disabled: {}", e);
            PriceFeed::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cinder_api=debug")),
        )
        .init();

    info!("Starting Cinder API");

    let config = ServiceConfig::from_env()?;
    let indexer = Arc::new(IndexerClient::new(
        &config.indexer_url,
        config.hasura_admin_secret.clone(),
    )?);
    info!("Indexer GraphQL endpoint: {}", indexer.endpoint());

    let shutdown = CancellationToken::new();

    let feed = Arc::new(price_feed(config.quotes.as_ref()));
    let feed_handle = Arc::clone(&feed).spawn(shutdown.child_token());

    let broker = Arc::new(EventBroker::new());
    let notifications = Arc::new(NotificationService::new(
        broker.clone(),
        feed.clone(),
        indexer.clone(),
    ));
    let charts = Arc::new(ChartService::new(indexer, feed, config.chart));

    let state = AppState {
        broker,
        notifications,
        charts,
        session: config.session,
        indexer_url: Arc::from(config.indexer_url.as_str()),
        shutdown: shutdown.clone(),
    };

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
            // Ends open streams so the server can drain
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = feed_handle {
        let _ = handle.await;
    }

    Ok(())
}
