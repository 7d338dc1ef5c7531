//! Cached USD quote of the base asset
//!
//! A background task polls the quote source and keeps the last good quote.
//! Readers never wait on the network.

use cinder_core::UsdQuote;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sources::QuoteSource;

/// Lower bound of the poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new quote replaced the cached one
    Updated,
    /// The source answered without a price; cache untouched
    Empty,
    /// The request failed; cache untouched
    Failed,
}

/// Polled USD quote cache
pub struct PriceFeed {
    source: Option<Arc<dyn QuoteSource>>,
    poll_interval: Duration,
    quote: RwLock<Option<UsdQuote>>,
}

impl PriceFeed {
    /// Create a feed polling `source` every `poll_interval` (at least 5s)
    pub fn new(source: Arc<dyn QuoteSource>, poll_interval: Duration) -> Self {
        Self {
            source: Some(source),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            quote: RwLock::new(None),
        }
    }

    /// A feed without a source; it never produces a quote
    pub fn disabled() -> Self {
        Self {
            source: None,
            poll_interval: MIN_POLL_INTERVAL,
            quote: RwLock::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Latest known quote
    pub async fn quote(&self) -> Option<UsdQuote> {
        self.quote.read().await.clone()
    }

    /// Fetch once and update the cache on success
    pub async fn poll_once(&self) -> PollOutcome {
        let Some(source) = &self.source else {
            return PollOutcome::Empty;
        };

        match source.fetch_quote().await {
            Ok(Some(quote)) => {
                debug!("USD quote updated: {}", quote.price);
                *self.quote.write().await = Some(quote);
                PollOutcome::Updated
            }
            Ok(None) => {
                debug!("Quote source returned no price");
                PollOutcome::Empty
            }
            Err(e) => {
                warn!("Quote poll failed, keeping last quote: {}", e);
                PollOutcome::Failed
            }
        }
    }

    /// Poll until `cancel` fires
    ///
    /// Returns `None` for a disabled feed.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            info!("Price feed disabled, USD values will be omitted");
            return None;
        }

        info!("Starting price feed (every {:?})", self.poll_interval);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                }
            }

            info!("Price feed stopped");
        }))
    }
}

impl std::fmt::Debug for PriceFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceFeed")
            .field("enabled", &self.is_enabled())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
