//! Chart history queries
//!
//! Resolves a request window, validates it, fetches trades and runs the
//! aggregation engine.

use cinder_core::{Candle, ChartSummary, SeriesPoint};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::chart::{
    bucket_count, build_series_and_candles, build_summary, checked_bucket_start, fill_gaps,
};
use crate::price_feed::PriceFeed;
use crate::sources::{SourceError, TradeSource};

/// Smallest accepted candle interval, seconds
pub const MIN_INTERVAL_SEC: i64 = 10;
/// Largest accepted candle interval, seconds
pub const MAX_INTERVAL_SEC: i64 = 86_400;
/// Most candles a single query may produce after gap filling
pub const MAX_CANDLES: u64 = 100_000;

/// Errors that can occur answering a chart query
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("intervalSec must be between 10 and 86400, got {0}")]
    InvalidInterval(i64),

    #[error("fromTs must be less than toTs")]
    InvalidRange { from: i64, to: i64 },

    #[error("Range covers {0} candles, at most 100000 allowed")]
    TooManyCandles(u64),

    #[error("Trade source error: {0}")]
    Source(#[from] SourceError),
}

/// Window used when a query leaves parts of it out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDefaults {
    pub window_sec: i64,
    pub interval_sec: i64,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            window_sec: 86_400,
            interval_sec: 60,
        }
    }
}

/// A chart request as received
#[derive(Debug, Clone, Default)]
pub struct ChartQuery {
    pub campaign_id: String,
    pub from_ts: Option<i64>,
    pub to_ts: Option<i64>,
    pub interval_sec: Option<i64>,
}

/// A validated chart window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    pub from_ts: i64,
    pub to_ts: i64,
    pub interval_sec: i64,
}

impl ChartQuery {
    /// Fill in defaults relative to `now` and validate
    ///
    /// `to` defaults to `now`, `from` to one window before `to`.
    pub fn resolve(&self, now: i64, defaults: ChartDefaults) -> Result<ChartWindow, ChartError> {
        let interval_sec = self.interval_sec.unwrap_or(defaults.interval_sec);
        if !(MIN_INTERVAL_SEC..=MAX_INTERVAL_SEC).contains(&interval_sec) {
            return Err(ChartError::InvalidInterval(interval_sec));
        }

        let to_ts = self.to_ts.unwrap_or(now);
        let from_ts = self
            .from_ts
            .unwrap_or_else(|| to_ts.saturating_sub(defaults.window_sec));
        // The first bucket must start at or above i64::MIN
        if from_ts >= to_ts || checked_bucket_start(from_ts, interval_sec).is_none() {
            return Err(ChartError::InvalidRange {
                from: from_ts,
                to: to_ts,
            });
        }

        let candles = bucket_count(from_ts, to_ts, interval_sec);
        if candles > MAX_CANDLES {
            return Err(ChartError::TooManyCandles(candles));
        }

        Ok(ChartWindow {
            from_ts,
            to_ts,
            interval_sec,
        })
    }
}

/// Chart history of one campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartHistory {
    pub campaign_id: String,
    pub from_ts: i64,
    pub to_ts: i64,
    pub interval_sec: i64,
    pub series: Vec<SeriesPoint>,
    /// Gap-filled over the whole window
    pub candles: Vec<Candle>,
    pub summary: ChartSummary,
    pub fuel_usd: Option<f64>,
    pub fuel_usd_updated_at: Option<String>,
}

/// Answers chart history queries
pub struct ChartService {
    trades: Arc<dyn TradeSource>,
    price_feed: Arc<PriceFeed>,
    defaults: ChartDefaults,
}

impl ChartService {
    pub fn new(
        trades: Arc<dyn TradeSource>,
        price_feed: Arc<PriceFeed>,
        defaults: ChartDefaults,
    ) -> Self {
        Self {
            trades,
            price_feed,
            defaults,
        }
    }

    /// Build the chart history for `query`, relative to the current time
    pub async fn history(&self, query: &ChartQuery) -> Result<ChartHistory, ChartError> {
        self.history_at(query, chrono::Utc::now().timestamp()).await
    }

    /// Build the chart history for `query`, relative to `now`
    #[instrument(skip(self, query), fields(campaign_id = %query.campaign_id))]
    pub async fn history_at(&self, query: &ChartQuery, now: i64) -> Result<ChartHistory, ChartError> {
        let window = query.resolve(now, self.defaults)?;

        let quote = self.price_feed.quote().await;
        let usd_rate = quote.as_ref().map(|q| q.price);

        let trades = self
            .trades
            .trades(&query.campaign_id, window.from_ts, window.to_ts)
            .await?;
        debug!(
            "Building chart from {} trades ({}..{} every {}s)",
            trades.len(),
            window.from_ts,
            window.to_ts,
            window.interval_sec
        );

        let (series, candles) = build_series_and_candles(&trades, window.interval_sec, usd_rate);
        let summary = build_summary(&trades, usd_rate);
        let candles = fill_gaps(&candles, window.from_ts, window.to_ts, window.interval_sec);

        Ok(ChartHistory {
            campaign_id: query.campaign_id.clone(),
            from_ts: window.from_ts,
            to_ts: window.to_ts,
            interval_sec: window.interval_sec,
            series,
            candles,
            summary,
            fuel_usd: usd_rate,
            fuel_usd_updated_at: quote.and_then(|q| q.updated_at),
        })
    }
}
