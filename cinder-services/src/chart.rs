//! Chart aggregation
//!
//! Turns an ordered trade list into a raw price series, OHLCV candles, a
//! gap-filled candle sequence and summary statistics. Prices and volumes
//! stay in exact integer form; `f64` values are derived for display only.
//!
//! Everything here is pure and can run concurrently.

use cinder_core::{round_dp, to_usd, Amount, Candle, ChartSummary, SeriesPoint, TradeRecord};
use std::collections::BTreeMap;

/// Start of the bucket containing `timestamp`
///
/// Floor division, so negative timestamps land in the bucket below.
/// Saturates at `i64::MIN` when that bucket is not representable.
pub fn bucket_start(timestamp: i64, interval: i64) -> i64 {
    checked_bucket_start(timestamp, interval).unwrap_or(i64::MIN)
}

/// Start of the bucket containing `timestamp`, `None` below `i64::MIN`
pub fn checked_bucket_start(timestamp: i64, interval: i64) -> Option<i64> {
    let interval = interval.max(1);
    timestamp.checked_sub(timestamp.rem_euclid(interval))
}

/// Build the raw series and per-bucket candles
///
/// Trades must already be sorted by `(timestamp, block_height)`. Trades
/// without a price or with a non-positive timestamp are skipped. Within a
/// bucket the close follows input order.
pub fn build_series_and_candles(
    trades: &[TradeRecord],
    interval: i64,
    usd_rate: Option<f64>,
) -> (Vec<SeriesPoint>, Vec<Candle>) {
    let mut series = Vec::new();
    let mut buckets: BTreeMap<i64, Candle> = BTreeMap::new();

    for trade in trades {
        let Some((timestamp, price_scaled)) = trade.chart_point() else {
            continue;
        };

        let price = price_scaled.to_human();
        series.push(SeriesPoint {
            t: timestamp,
            price_scaled: price_scaled.clone(),
            price,
            price_usd: to_usd(price, usd_rate),
        });

        let bucket = bucket_start(timestamp, interval);
        buckets
            .entry(bucket)
            .and_modify(|candle| {
                candle.absorb(price_scaled, &trade.amount_base, &trade.amount_token)
            })
            .or_insert_with(|| {
                Candle::open_with(bucket, price_scaled, &trade.amount_base, &trade.amount_token)
            });
    }

    (series, buckets.into_values().collect())
}

/// Number of buckets `fill_gaps` emits for a range
pub fn bucket_count(from_ts: i64, to_ts: i64, interval: i64) -> u64 {
    let interval = i128::from(interval.max(1));
    let start = i128::from(from_ts).div_euclid(interval);
    let end = i128::from(to_ts).div_euclid(interval);
    if end < start {
        return 0;
    }
    u64::try_from(end - start + 1).unwrap_or(u64::MAX)
}

/// One candle per bucket of `[from_ts, to_ts]`
///
/// Missing buckets repeat the last seen close with zero volume. Before the
/// first real candle the carried price is that candle's open. Candles
/// outside the range are dropped. No candles in means no candles out.
pub fn fill_gaps(candles: &[Candle], from_ts: i64, to_ts: i64, interval: i64) -> Vec<Candle> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };

    let interval = interval.max(1);
    let Some(end) = checked_bucket_start(to_ts, interval) else {
        return Vec::new();
    };
    // First whole bucket when the one holding `from_ts` underflows
    let start = checked_bucket_start(from_ts, interval)
        .unwrap_or_else(|| from_ts + (interval - from_ts.rem_euclid(interval)));

    let by_bucket: BTreeMap<i64, &Candle> =
        candles.iter().map(|c| (c.bucket_start, c)).collect();
    let mut last_close = &first.open;
    let mut filled = Vec::new();

    let mut next = Some(start);
    while let Some(bucket) = next.filter(|b| *b <= end) {
        match by_bucket.get(&bucket) {
            Some(candle) => {
                filled.push((*candle).clone());
                last_close = &candle.close;
            }
            None => filled.push(Candle::flat(bucket, last_close)),
        }
        next = bucket.checked_add(interval);
    }

    filled
}

/// Summary statistics over a trade list
///
/// First and last price follow input order; high and low scan every priced
/// trade. Volumes and the trade count cover all trades, priced or not.
pub fn build_summary(trades: &[TradeRecord], usd_rate: Option<f64>) -> ChartSummary {
    if trades.is_empty() {
        return ChartSummary::default();
    }

    let volume_base: Amount = trades.iter().map(|t| &t.amount_base).sum();
    let volume_token: Amount = trades.iter().map(|t| &t.amount_token).sum();
    let mut summary = ChartSummary {
        volume_usd: to_usd(volume_base.to_f64_lossy(), usd_rate),
        volume_base,
        volume_token,
        trade_count: trades.len() as u64,
        ..ChartSummary::default()
    };

    let mut prices = trades.iter().filter_map(|t| t.price_scaled.as_ref());
    let Some(first) = prices.next() else {
        return summary;
    };

    let (mut last, mut high, mut low) = (first, first, first);
    for price in prices {
        last = price;
        if price > high {
            high = price;
        }
        if price < low {
            low = price;
        }
    }

    let first_price = first.to_human();
    let last_price = last.to_human();
    let high_price = high.to_human();
    let low_price = low.to_human();

    summary.price_change_pct = if first_price > 0.0 {
        round_dp((last_price - first_price) / first_price * 100.0, 4)
    } else {
        0.0
    };
    summary.first_price_scaled = Some(first.clone());
    summary.last_price_scaled = Some(last.clone());
    summary.high_price_scaled = Some(high.clone());
    summary.low_price_scaled = Some(low.clone());
    summary.first_price = Some(first_price);
    summary.first_price_usd = to_usd(first_price, usd_rate);
    summary.last_price = Some(last_price);
    summary.last_price_usd = to_usd(last_price, usd_rate);
    summary.high_price = Some(high_price);
    summary.high_price_usd = to_usd(high_price, usd_rate);
    summary.low_price = Some(low_price);
    summary.low_price_usd = to_usd(low_price, usd_rate);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::ScaledPrice;

    fn scaled(s: &str) -> ScaledPrice {
        s.parse().unwrap()
    }

    fn trade(timestamp: i64, price: Option<&str>, base: u64, token: u64) -> TradeRecord {
        TradeRecord {
            id: format!("t{}", timestamp),
            campaign_id: "c1".to_string(),
            side: Some("buy".to_string()),
            amount_base: Amount::from(base),
            amount_token: Amount::from(token),
            price_scaled: price.map(scaled),
            price: None,
            timestamp,
            block_height: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_bucket_start() {
        assert_eq!(bucket_start(150, 100), 100);
        assert_eq!(bucket_start(200, 100), 200);
        assert_eq!(bucket_start(-1, 100), -100);
        assert_eq!(bucket_start(5, 0), 5);
        assert_eq!(checked_bucket_start(i64::MIN, 10), None);
        assert_eq!(checked_bucket_start(i64::MIN, 1), Some(i64::MIN));
        assert_eq!(checked_bucket_start(i64::MAX, 10), Some(i64::MAX - 7));
    }

    #[test]
    fn test_bucket_count_at_i64_extremes() {
        assert_eq!(bucket_count(i64::MIN, 0, 10), 922_337_203_685_477_582);
        assert_eq!(bucket_count(i64::MIN, i64::MAX, 1), u64::MAX);
        assert_eq!(bucket_count(i64::MAX - 30, i64::MAX, 10), 4);
        assert_eq!(bucket_count(10, 0, 10), 0);
    }

    #[test]
    fn test_fill_gaps_at_i64_extremes() {
        let candles = vec![Candle::flat(0, &scaled("5"))];

        let top = fill_gaps(&candles, i64::MAX - 30, i64::MAX, 10);
        let buckets: Vec<i64> = top.iter().map(|c| c.bucket_start).collect();
        assert_eq!(
            buckets,
            vec![i64::MAX - 37, i64::MAX - 27, i64::MAX - 17, i64::MAX - 7]
        );
        assert!(top.iter().all(|c| c.close == scaled("5")));

        // The bucket holding i64::MIN starts below it and is skipped
        let bottom = fill_gaps(&candles, i64::MIN, i64::MIN + 25, 10);
        let buckets: Vec<i64> = bottom.iter().map(|c| c.bucket_start).collect();
        assert_eq!(buckets, vec![i64::MIN + 8, i64::MIN + 18]);
    }

    #[test]
    fn test_two_trades_share_a_bucket() {
        let trades = vec![
            trade(100, Some("1000000000"), 10, 1),
            trade(150, Some("2000000000"), 20, 2),
        ];

        let (series, candles) = build_series_and_candles(&trades, 100, None);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].price, 1.0);
        assert!(series[0].price_usd.is_none());

        assert_eq!(candles.len(), 1);
        let candle = &candles[0];
        assert_eq!(candle.bucket_start, 100);
        assert_eq!(candle.open, scaled("1000000000"));
        assert_eq!(candle.high, scaled("2000000000"));
        assert_eq!(candle.low, scaled("1000000000"));
        assert_eq!(candle.close, scaled("2000000000"));
        assert_eq!(candle.volume_base, Amount::from(30));
        assert_eq!(candle.volume_token, Amount::from(3));
        assert_eq!(candle.trade_count, 2);
    }

    #[test]
    fn test_low_tracks_minimum() {
        let trades = vec![
            trade(10, Some("500"), 1, 1),
            trade(11, Some("900"), 1, 1),
            trade(12, Some("300"), 1, 1),
            trade(13, Some("700"), 1, 1),
        ];

        let (_, candles) = build_series_and_candles(&trades, 60, None);
        assert_eq!(candles[0].high, scaled("900"));
        assert_eq!(candles[0].low, scaled("300"));
        assert_eq!(candles[0].close, scaled("700"));
    }

    #[test]
    fn test_unusable_trades_are_skipped() {
        let trades = vec![
            trade(0, Some("1000"), 1, 1),
            trade(-5, Some("1000"), 1, 1),
            trade(100, None, 1, 1),
            trade(120, Some("2000"), 4, 4),
        ];

        let (series, candles) = build_series_and_candles(&trades, 60, Some(2.0));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].t, 120);
        assert_eq!(series[0].price_usd, Some(0.000004));
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].trade_count, 1);
    }

    #[test]
    fn test_candles_sorted_by_bucket() {
        let trades = vec![
            trade(300, Some("3"), 1, 1),
            trade(100, Some("1"), 1, 1),
            trade(200, Some("2"), 1, 1),
        ];

        let (_, candles) = build_series_and_candles(&trades, 100, None);
        let buckets: Vec<i64> = candles.iter().map(|c| c.bucket_start).collect();
        assert_eq!(buckets, vec![100, 200, 300]);
    }

    #[test]
    fn test_empty_input() {
        let (series, candles) = build_series_and_candles(&[], 60, Some(1.0));
        assert!(series.is_empty());
        assert!(candles.is_empty());
        assert!(fill_gaps(&candles, 0, 1000, 60).is_empty());

        let summary = build_summary(&[], Some(1.0));
        assert_eq!(summary, ChartSummary::default());
    }

    #[test]
    fn test_fill_gaps_carries_close_forward() {
        let trades = vec![
            trade(120, Some("100"), 1, 1),
            trade(130, Some("150"), 1, 1),
            trade(300, Some("200"), 1, 1),
        ];
        let (_, candles) = build_series_and_candles(&trades, 60, None);

        let filled = fill_gaps(&candles, 0, 400, 60);
        assert_eq!(filled.len() as u64, bucket_count(0, 400, 60));
        let buckets: Vec<i64> = filled.iter().map(|c| c.bucket_start).collect();
        assert_eq!(buckets, vec![0, 60, 120, 180, 240, 300, 360]);

        // Before the first real candle: its open
        assert_eq!(filled[0].close, scaled("100"));
        assert_eq!(filled[0].trade_count, 0);
        // After it: the previous close
        assert_eq!(filled[3].open, scaled("150"));
        assert_eq!(filled[3].high, scaled("150"));
        assert_eq!(filled[3].low, scaled("150"));
        assert_eq!(filled[3].close, scaled("150"));
        assert!(filled[3].volume_base.is_zero());
        assert_eq!(filled[6].close, scaled("200"));
        assert_eq!(filled[2], candles[0]);
    }

    #[test]
    fn test_fill_gaps_bucket_count() {
        let trades = vec![trade(1000, Some("1"), 1, 1)];
        let (_, candles) = build_series_and_candles(&trades, 10, None);

        for (from, to, interval) in [(995, 1005, 10), (0, 86_400, 60), (1, 2, 10), (-25, 25, 10)] {
            let filled = fill_gaps(&candles, from, to, interval);
            let expected = (bucket_start(to, interval) - bucket_start(from, interval)) / interval + 1;
            assert_eq!(filled.len() as i64, expected);
        }
    }

    #[test]
    fn test_fill_gaps_drops_out_of_range_candles() {
        let trades = vec![trade(100, Some("1"), 1, 1), trade(900, Some("9"), 1, 1)];
        let (_, candles) = build_series_and_candles(&trades, 100, None);

        let filled = fill_gaps(&candles, 300, 500, 100);
        assert_eq!(filled.len(), 3);
        assert!(filled.iter().all(|c| c.trade_count == 0));
        // Seeded from the first candle's open, never reached the one at 900
        assert!(filled.iter().all(|c| c.close == scaled("1")));
    }

    #[test]
    fn test_summary_price_change() {
        let trades = vec![
            trade(10, Some("100000000000"), 1, 1),
            trade(20, Some("90000000000"), 1, 1),
            trade(30, Some("110000000000"), 1, 1),
        ];

        let summary = build_summary(&trades, None);
        assert_eq!(summary.first_price, Some(100.0));
        assert_eq!(summary.last_price, Some(110.0));
        assert_eq!(summary.price_change_pct, 10.0);
        assert_eq!(summary.high_price_scaled, Some(scaled("110000000000")));
        assert_eq!(summary.low_price_scaled, Some(scaled("90000000000")));
        assert!(summary.first_price_usd.is_none());
        assert!(summary.volume_usd.is_none());
    }

    #[test]
    fn test_summary_zero_first_price() {
        let trades = vec![trade(10, Some("0"), 1, 1), trade(20, Some("5000"), 1, 1)];
        let summary = build_summary(&trades, None);
        assert_eq!(summary.first_price, Some(0.0));
        assert_eq!(summary.price_change_pct, 0.0);
    }

    #[test]
    fn test_summary_without_prices() {
        let trades = vec![trade(10, None, 7, 70), trade(20, None, 3, 30)];
        let summary = build_summary(&trades, Some(2.0));

        assert_eq!(summary.volume_base, Amount::from(10));
        assert_eq!(summary.volume_token, Amount::from(100));
        assert_eq!(summary.volume_usd, Some(20.0));
        assert_eq!(summary.trade_count, 2);
        assert!(summary.first_price_scaled.is_none());
        assert!(summary.high_price.is_none());
        assert_eq!(summary.price_change_pct, 0.0);
    }

    #[test]
    fn test_summary_counts_unpriced_volume() {
        let trades = vec![
            trade(10, Some("1000000000"), 5, 50),
            trade(0, None, 5, 50),
        ];
        let summary = build_summary(&trades, Some(0.5));

        assert_eq!(summary.trade_count, 2);
        assert_eq!(summary.volume_base, Amount::from(10));
        assert_eq!(summary.first_price_usd, Some(0.5));
        assert_eq!(summary.volume_usd, Some(5.0));
    }

    #[test]
    fn test_candle_volumes_match_summary() {
        let trades: Vec<TradeRecord> = (1..=50)
            .map(|i| {
                let price = (i * 1_000).to_string();
                trade(i * 37, Some(price.as_str()), i as u64, 2 * i as u64)
            })
            .collect();

        let (_, candles) = build_series_and_candles(&trades, 300, None);
        let summary = build_summary(&trades, None);

        let base: Amount = candles.iter().map(|c| &c.volume_base).sum();
        let token: Amount = candles.iter().map(|c| &c.volume_token).sum();
        assert_eq!(base, summary.volume_base);
        assert_eq!(token, summary.volume_token);
        assert_eq!(
            candles.iter().map(|c| c.trade_count).sum::<u64>(),
            summary.trade_count
        );
    }

    #[test]
    fn test_candles_are_deterministic() {
        let trades = vec![
            trade(5, Some("3"), 1, 1),
            trade(6, Some("1"), 2, 2),
            trade(65, Some("2"), 3, 3),
        ];
        assert_eq!(
            build_series_and_candles(&trades, 60, Some(1.5)),
            build_series_and_candles(&trades, 60, Some(1.5))
        );
    }
}
