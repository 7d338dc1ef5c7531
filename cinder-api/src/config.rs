//! Service configuration from environment variables

use cinder_core::{CinderError, CinderResult};
use cinder_services::{ChartDefaults, SessionConfig};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_INDEXER_URL: &str = "http://host.docker.internal:8080";

/// CoinMarketCap settings; absent when no API key is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteConfig {
    pub api_key: String,
    pub endpoint: String,
    pub symbol: String,
    pub poll_interval: Duration,
}

/// Everything the server reads from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub indexer_url: String,
    pub hasura_admin_secret: Option<String>,
    pub session: SessionConfig,
    pub chart: ChartDefaults,
    pub quotes: Option<QuoteConfig>,
}

impl ServiceConfig {
    /// Read the process environment
    pub fn from_env() -> CinderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CinderResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let quotes = match (get("COINMK_API_KEY"), get("COINMK_API_ENDPOINT")) {
            (Some(api_key), Some(endpoint)) => Some(QuoteConfig {
                api_key,
                endpoint,
                symbol: get("COINMK_SYMBOL").unwrap_or_else(|| "FUEL".to_string()),
                poll_interval: Duration::from_secs(parse_or(&get, "COINMK_POLL_SECONDS", 20)?),
            }),
            _ => None,
        };

        Ok(Self {
            port: parse_or(&get, "SERVER_PORT", 8000)?,
            indexer_url: get("INDEXER_URL").unwrap_or_else(|| DEFAULT_INDEXER_URL.to_string()),
            hasura_admin_secret: get("HASURA_ADMIN_SECRET"),
            session: SessionConfig {
                queue_capacity: parse_or(&get, "SSE_QUEUE_CAPACITY", 200)?,
                heartbeat_interval: Duration::from_secs(parse_or(&get, "SSE_HEARTBEAT_SECONDS", 15)?),
            },
            chart: ChartDefaults {
                window_sec: parse_or(&get, "DEFAULT_CHART_WINDOW_SEC", 86_400)?,
                interval_sec: parse_or(&get, "DEFAULT_CHART_INTERVAL_SEC", 60)?,
            },
            quotes,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> CinderResult<T> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| CinderError::config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
