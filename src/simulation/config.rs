// src/simulation/config.rs

use crate::error::{Result, ShopError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuning knobs of the shop management cycle.
///
/// Every field has a default, so a JSON file only needs to list the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Lower allocation bound as a share of the local market.
    pub min_market_share: f64,
    /// Upper allocation bound as a share of the local market.
    pub max_market_share: f64,
    /// Most stock a shop may keep, relative to its market.
    pub max_market_share_stock: f64,
    /// Asymptotic bound of the price-driven sales target correction.
    pub max_sales_adjustment: f64,
    /// Base price step per cycle.
    pub max_price_adjustment: f64,
    pub elasticity: f64,
    /// Multiplier on the clearance price for products without a price yet.
    pub sales_price_factor: f64,
    /// Never aim to sell more than this fraction of the shelf stock.
    pub target_stock_ratio: f64,
    /// Multiplier on the clearance price used by `set_default_prices`.
    pub default_price_factor: f64,
    /// Upper bound of the random pause before each game request.
    pub request_delay_ms: u64,
    /// Copy missing reference-shop contracts before each cycle.
    pub propagate_contracts: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            min_market_share: 0.005,
            max_market_share: 0.4,
            max_market_share_stock: 0.8,
            max_sales_adjustment: 0.1,
            max_price_adjustment: 0.02,
            elasticity: 40.0,
            sales_price_factor: 2.0,
            target_stock_ratio: 0.8,
            default_price_factor: 2.0,
            request_delay_ms: 200,
            propagate_contracts: false,
        }
    }
}

impl ShopConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ShopConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("min_market_share", self.min_market_share),
            ("max_market_share", self.max_market_share),
            ("max_sales_adjustment", self.max_sales_adjustment),
            ("max_price_adjustment", self.max_price_adjustment),
            ("target_stock_ratio", self.target_stock_ratio),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ShopError::Config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.min_market_share > self.max_market_share {
            return Err(ShopError::Config(format!(
                "min_market_share {} exceeds max_market_share {}",
                self.min_market_share, self.max_market_share
            )));
        }
        if self.max_market_share_stock < 0.0 {
            return Err(ShopError::Config(
                "max_market_share_stock must not be negative".to_string(),
            ));
        }
        if self.elasticity <= 0.0 {
            return Err(ShopError::Config(format!(
                "elasticity must be positive, got {}",
                self.elasticity
            )));
        }
        if self.sales_price_factor <= 0.0 || self.default_price_factor <= 0.0 {
            return Err(ShopError::Config(
                "price factors must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
