//! CoinMarketCap quotes client
//!
//! Fetches the latest USD price of a single symbol from the
//! `cryptocurrency/quotes/latest` endpoint.

use cinder_core::UsdQuote;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::QuoteError;

/// Path used when the configured endpoint only names a host
pub const DEFAULT_QUOTES_PATH: &str = "/v1/cryptocurrency/quotes/latest";

const DEFAULT_CONVERT: &str = "USD";

/// Normalize a configured endpoint into a full quotes URL
///
/// Accepts bare hosts ("pro-api.coinmarketcap.com"), trailing dots and
/// slashes. Returns `None` for blank or unparseable input.
pub fn normalize_endpoint(endpoint: &str) -> Option<String> {
    let raw = endpoint.trim().trim_end_matches('.');
    if raw.is_empty() {
        return None;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let mut url = Url::parse(&with_scheme).ok()?;

    let path = url.path().trim_end_matches('/').to_string();
    if path.is_empty() {
        url.set_path(DEFAULT_QUOTES_PATH);
    } else {
        url.set_path(&path);
    }

    Some(url.to_string())
}

/// Pull the quote for `symbol` out of a quotes/latest response
///
/// `data[symbol]` is a list in the v2 API and an object in v1.
fn parse_quote(payload: &Value, symbol: &str, convert: &str) -> Option<UsdQuote> {
    let entry = match payload.get("data")?.get(symbol)? {
        Value::Array(rows) => rows.first().filter(|row| row.is_object())?,
        row @ Value::Object(_) => row,
        _ => return None,
    };

    let quote = entry.get("quote")?.get(convert)?;
    let price = match quote.get("price")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let updated_at = quote
        .get("last_updated")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(UsdQuote::new(price, updated_at))
}

/// CoinMarketCap API client
#[derive(Clone)]
pub struct CoinMarketCapClient {
    http: Client,
    endpoint: String,
    api_key: String,
    symbol: String,
    convert: String,
}

impl CoinMarketCapClient {
    /// Create a client for `symbol`, converting to USD
    pub fn new(api_key: &str, endpoint: &str, symbol: &str) -> Result<Self, QuoteError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(QuoteError::InvalidConfig("missing API key".to_string()));
        }
        let endpoint = normalize_endpoint(endpoint)
            .ok_or_else(|| QuoteError::InvalidConfig(format!("bad endpoint '{}'", endpoint)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| QuoteError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key: api_key.to_string(),
            symbol: symbol.to_string(),
            convert: DEFAULT_CONVERT.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fetch the latest quote
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn fetch_quote(&self) -> Result<UsdQuote, QuoteError> {
        debug!("Fetching quote from {}", self.endpoint);

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("symbol", &self.symbol), ("convert", &self.convert)])
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| QuoteError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuoteError::ApiError {
                status: response.status().as_u16(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| QuoteError::ParseError(e.to_string()))?;

        parse_quote(&payload, &self.symbol, &self.convert)
            .ok_or_else(|| QuoteError::MissingQuote(self.symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("pro-api.coinmarketcap.com").as_deref(),
            Some("https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest")
        );
        assert_eq!(
            normalize_endpoint("  https://pro-api.coinmarketcap.com/. ").as_deref(),
            Some("https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest")
        );
        assert_eq!(
            normalize_endpoint("https://pro-api.coinmarketcap.com/v2/cryptocurrency/quotes/latest/")
                .as_deref(),
            Some("https://pro-api.coinmarketcap.com/v2/cryptocurrency/quotes/latest")
        );
        assert_eq!(normalize_endpoint("   "), None);
        assert_eq!(normalize_endpoint("..."), None);
    }

    #[test]
    fn test_parse_quote_list_and_object() {
        let v2 = json!({
            "data": { "FUEL": [{ "quote": { "USD": { "price": 0.0123, "last_updated": "2024-05-01T12:00:00.000Z" } } }] }
        });
        let quote = parse_quote(&v2, "FUEL", "USD").unwrap();
        assert_eq!(quote.price, 0.0123);
        assert_eq!(quote.updated_at.as_deref(), Some("2024-05-01T12:00:00.000Z"));
        assert_eq!(quote.source, "coinmarketcap");

        let v1 = json!({ "data": { "FUEL": { "quote": { "USD": { "price": "0.5" } } } } });
        let quote = parse_quote(&v1, "FUEL", "USD").unwrap();
        assert_eq!(quote.price, 0.5);
        assert!(quote.updated_at.is_none());
    }

    #[test]
    fn test_parse_quote_missing_price() {
        assert!(parse_quote(&json!({ "data": { "FUEL": [] } }), "FUEL", "USD").is_none());
        assert!(parse_quote(&json!({ "data": {} }), "FUEL", "USD").is_none());
        assert!(parse_quote(
            &json!({ "data": { "FUEL": { "quote": { "USD": { "price": null } } } } }),
            "FUEL",
            "USD"
        )
        .is_none());
    }

    #[test]
    fn test_client_requires_key_and_endpoint() {
        assert!(matches!(
            CoinMarketCapClient::new("", "pro-api.coinmarketcap.com", "FUEL"),
            Err(QuoteError::InvalidConfig(_))
        ));
        assert!(matches!(
            CoinMarketCapClient::new("key", " ", "FUEL"),
            Err(QuoteError::InvalidConfig(_))
        ));
        let client = CoinMarketCapClient::new("key", "pro-api.coinmarketcap.com", "FUEL").unwrap();
        assert_eq!(client.symbol(), "FUEL");
    }
}
