//! Chart output shapes: raw series points, OHLCV candles and summaries

use serde::{Deserialize, Serialize};

use crate::{Amount, ScaledPrice};

/// One point of the raw per-trade price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Trade time, unix seconds
    pub t: i64,
    pub price_scaled: ScaledPrice,
    /// Human price (display only)
    pub price: f64,
    /// Human price in USD, absent when no quote is available
    pub price_usd: Option<f64>,
}

/// A single OHLCV candle
///
/// Prices are scaled integers, volumes are exact unit counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, a multiple of the interval
    #[serde(rename = "t")]
    pub bucket_start: i64,
    #[serde(rename = "o")]
    pub open: ScaledPrice,
    #[serde(rename = "h")]
    pub high: ScaledPrice,
    #[serde(rename = "l")]
    pub low: ScaledPrice,
    #[serde(rename = "c")]
    pub close: ScaledPrice,
    #[serde(rename = "v_base")]
    pub volume_base: Amount,
    #[serde(rename = "v_token")]
    pub volume_token: Amount,
    #[serde(rename = "n")]
    pub trade_count: u64,
}

impl Candle {
    /// Open a candle with its first trade
    pub fn open_with(
        bucket_start: i64,
        price: &ScaledPrice,
        amount_base: &Amount,
        amount_token: &Amount,
    ) -> Self {
        Self {
            bucket_start,
            open: price.clone(),
            high: price.clone(),
            low: price.clone(),
            close: price.clone(),
            volume_base: amount_base.clone(),
            volume_token: amount_token.clone(),
            trade_count: 1,
        }
    }

    /// A zero-activity candle pinned at `price`
    pub fn flat(bucket_start: i64, price: &ScaledPrice) -> Self {
        Self {
            bucket_start,
            open: price.clone(),
            high: price.clone(),
            low: price.clone(),
            close: price.clone(),
            volume_base: Amount::zero(),
            volume_token: Amount::zero(),
            trade_count: 0,
        }
    }

    /// Fold a later trade of the same bucket into this candle
    pub fn absorb(&mut self, price: &ScaledPrice, amount_base: &Amount, amount_token: &Amount) {
        if *price > self.high {
            self.high = price.clone();
        }
        if *price < self.low {
            self.low = price.clone();
        }
        self.close = price.clone();
        self.volume_base += amount_base;
        self.volume_token += amount_token;
        self.trade_count += 1;
    }
}

/// Summary statistics over a set of trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    pub first_price_scaled: Option<ScaledPrice>,
    pub last_price_scaled: Option<ScaledPrice>,
    pub first_price: Option<f64>,
    pub first_price_usd: Option<f64>,
    pub last_price: Option<f64>,
    pub last_price_usd: Option<f64>,
    /// Percent change from first to last price, 4 decimals
    pub price_change_pct: f64,
    pub high_price_scaled: Option<ScaledPrice>,
    pub low_price_scaled: Option<ScaledPrice>,
    pub high_price: Option<f64>,
    pub high_price_usd: Option<f64>,
    pub low_price: Option<f64>,
    pub low_price_usd: Option<f64>,
    pub volume_base: Amount,
    pub volume_usd: Option<f64>,
    pub volume_token: Amount,
    pub trade_count: u64,
}

impl Default for ChartSummary {
    fn default() -> Self {
        Self {
            first_price_scaled: None,
            last_price_scaled: None,
            first_price: None,
            first_price_usd: None,
            last_price: None,
            last_price_usd: None,
            price_change_pct: 0.0,
            high_price_scaled: None,
            low_price_scaled: None,
            high_price: None,
            high_price_usd: None,
            low_price: None,
            low_price_usd: None,
            volume_base: Amount::zero(),
            volume_usd: None,
            volume_token: Amount::zero(),
            trade_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> ScaledPrice {
        s.parse().unwrap()
    }

    #[test]
    fn test_candle_absorb() {
        let mut candle = Candle::open_with(100, &price("10"), &Amount::from(1), &Amount::from(2));
        candle.absorb(&price("30"), &Amount::from(1), &Amount::from(2));
        candle.absorb(&price("5"), &Amount::from(1), &Amount::from(2));
        candle.absorb(&price("20"), &Amount::from(1), &Amount::from(2));

        assert_eq!(candle.open, price("10"));
        assert_eq!(candle.high, price("30"));
        assert_eq!(candle.low, price("5"));
        assert_eq!(candle.close, price("20"));
        assert_eq!(candle.volume_base, Amount::from(4));
        assert_eq!(candle.volume_token, Amount::from(8));
        assert_eq!(candle.trade_count, 4);
    }

    #[test]
    fn test_candle_wire_format() {
        let candle = Candle::flat(60, &price("1000000000"));
        let json = serde_json::to_value(&candle).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "t": 60, "o": "1000000000", "h": "1000000000", "l": "1000000000",
                "c": "1000000000", "v_base": "0", "v_token": "0", "n": 0
            })
        );
    }

    #[test]
    fn test_default_summary_wire_format() {
        let json = serde_json::to_value(ChartSummary::default()).unwrap();
        assert_eq!(json["volumeBase"], "0");
        assert_eq!(json["volumeToken"], "0");
        assert_eq!(json["tradeCount"], 0);
        assert_eq!(json["priceChangePct"], 0.0);
        assert!(json["firstPriceScaled"].is_null());
    }
}
