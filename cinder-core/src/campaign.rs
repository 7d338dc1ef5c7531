//! Campaign (bonding-curve launch) records

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{round_dp, Amount, ScaledPrice, PRICE_SCALE};

/// Kind of change that produced a campaign notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
    /// Snapshot requested explicitly rather than triggered by a change
    Manual,
}

/// Current state of a campaign as stored by the indexer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: String,
    /// Upstream display price, passed through untouched
    pub current_price: Option<String>,
    pub current_price_scaled: Option<ScaledPrice>,
    pub total_volume_base: Option<Amount>,
    pub total_pledged: Option<Amount>,
    pub curve_sold_supply: Option<Amount>,
    pub curve_max_supply: Option<Amount>,
    pub token_decimals: Option<u32>,
    pub status: Option<String>,
}

impl CampaignRecord {
    fn max_supply(&self) -> Option<&Amount> {
        self.curve_max_supply.as_ref().filter(|max| !max.is_zero())
    }

    /// Percentage of the curve supply sold, rounded to 4 decimals
    pub fn progress(&self) -> Option<f64> {
        let max = self.max_supply()?;
        let sold = self
            .curve_sold_supply
            .as_ref()
            .map(Amount::to_f64_lossy)
            .unwrap_or(0.0);
        Some(round_dp(sold / max.to_f64_lossy() * 100.0, 4))
    }

    /// Fully-diluted market cap in base units
    ///
    /// `current_price_scaled * (max_supply / 10^decimals) / 10^9`, all in
    /// integer arithmetic. Only defined for a positive price and supply.
    pub fn market_cap_base(&self) -> Option<Amount> {
        let price = self.current_price_scaled.as_ref().filter(|p| p.is_positive())?;
        let max = self.max_supply()?;

        let mut supply = max.as_raw().clone();
        let decimals = self.token_decimals.unwrap_or(0);
        if decimals > 0 {
            supply /= BigUint::from(10u32).pow(decimals);
        }

        let cap = price.as_raw().magnitude() * supply / BigUint::from(PRICE_SCALE);
        Some(Amount::from(cap))
    }

    /// Total volume as a display value
    pub fn total_volume_display(&self) -> f64 {
        self.total_volume_base
            .as_ref()
            .map(Amount::to_f64_lossy)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> CampaignRecord {
        CampaignRecord {
            id: "c1".to_string(),
            current_price_scaled: Some("2000000000".parse().unwrap()),
            curve_sold_supply: Some(Amount::from(250)),
            curve_max_supply: Some(Amount::from(1000)),
            ..Default::default()
        }
    }

    #[test]
    fn test_progress() {
        assert_eq!(campaign().progress(), Some(25.0));

        let no_max = CampaignRecord {
            curve_max_supply: Some(Amount::zero()),
            ..campaign()
        };
        assert_eq!(no_max.progress(), None);
    }

    #[test]
    fn test_market_cap_base() {
        // 2.0 per token * 1000 tokens
        assert_eq!(campaign().market_cap_base(), Some(Amount::from(2000)));

        let with_decimals = CampaignRecord {
            curve_max_supply: Some(Amount::from(1_000_000)),
            token_decimals: Some(3),
            ..campaign()
        };
        assert_eq!(with_decimals.market_cap_base(), Some(Amount::from(2000)));

        let unpriced = CampaignRecord {
            current_price_scaled: Some("0".parse().unwrap()),
            ..campaign()
        };
        assert_eq!(unpriced.market_cap_base(), None);
    }
}
