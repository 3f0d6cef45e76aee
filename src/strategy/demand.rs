// src/strategy/demand.rs

use crate::model::records::TradeRecord;
use crate::simulation::config::ShopConfig;
use crate::strategy::allocation::TargetRange;
use crate::strategy::math::{ln_or, sigmoid};

/// One shop's view of a product, as far as the demand model cares.
#[derive(Debug, Clone, Copy)]
pub struct ShopDemand<'a> {
    pub record: &'a TradeRecord,
    /// Estimated size of the shop's local market, in units per cycle.
    pub market_size: f64,
}

/// Cross-shop price statistics of one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    /// Sales-weighted mean price, `None` when nothing sold anywhere.
    pub mean_price: Option<f64>,
    /// Sales-weighted standard deviation of log prices.
    pub log_std_dev: f64,
    /// Slope of the price-deviation sigmoid.
    pub adjustment_rate: f64,
}

impl PriceStats {
    pub fn from_records(records: &[&TradeRecord], max_sales_adjustment: f64) -> Self {
        let total_sold: u64 = records.iter().map(|r| r.sold).sum();
        if total_sold == 0 {
            return Self {
                mean_price: None,
                log_std_dev: 0.0,
                adjustment_rate: max_sales_adjustment,
            };
        }

        let total_sold = total_sold as f64;
        let mean_price = records
            .iter()
            .map(|r| r.price * r.sold as f64)
            .sum::<f64>()
            / total_sold;
        let log_mean = ln_or(mean_price, 0.0);
        let variance = records
            .iter()
            .map(|r| r.sold as f64 * (ln_or(r.price, log_mean) - log_mean).powi(2))
            .sum::<f64>()
            / total_sold;
        let log_std_dev = variance.sqrt();

        // All sellers at one price: every deviation is zero anyway.
        let adjustment_rate = if log_std_dev > f64::EPSILON {
            max_sales_adjustment / (2.0_f64.sqrt() * log_std_dev)
        } else {
            max_sales_adjustment
        };

        Self {
            mean_price: Some(mean_price).filter(|p| *p > 0.0),
            log_std_dev,
            adjustment_rate,
        }
    }
}

/// Sum of the market sizes of all shops selling a product.
pub fn total_market_size(shops: &[ShopDemand]) -> f64 {
    shops.iter().map(|s| s.market_size).sum()
}

/// Plan-wide inputs shared by every shop of one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandContext {
    pub stats: PriceStats,
    pub quantity_to_distribute: u64,
    pub total_market_size: f64,
    pub shop_count: usize,
}

/// Desired sales of one shop before the supply is split.
pub fn target_sale(shop: &ShopDemand, context: &DemandContext, config: &ShopConfig) -> f64 {
    let record = shop.record;
    if record.sold > 0 {
        let mut target = record.sold as f64;
        match context.stats.mean_price {
            Some(mean_price) if record.has_leftover() => {
                // Demand was fully served, so the sales figure is exact.
                // Cheaper than average should sell more, pricier less.
                let log_mean = mean_price.ln();
                let deviation = log_mean - ln_or(record.price, log_mean);
                target *= sigmoid(
                    deviation + 1.0,
                    context.stats.adjustment_rate,
                    config.max_sales_adjustment,
                );
            }
            _ if record.is_sold_out() => {
                target = ((record.sold + record.stock) / 2) as f64;
            }
            _ => {}
        }
        target
    } else if record.is_sold_out() && record.purchase > 0 {
        record.purchase as f64
    } else if context.total_market_size > 0.0 {
        context.quantity_to_distribute as f64 * shop.market_size / context.total_market_size
    } else {
        context.quantity_to_distribute as f64 / context.shop_count.max(1) as f64
    }
}

/// Target triples for every shop selling a product, index-aligned with `shops`.
pub fn target_ranges(
    shops: &[ShopDemand],
    quantity_to_distribute: u64,
    config: &ShopConfig,
) -> Vec<TargetRange> {
    let records: Vec<&TradeRecord> = shops.iter().map(|s| s.record).collect();
    let context = DemandContext {
        stats: PriceStats::from_records(&records, config.max_sales_adjustment),
        quantity_to_distribute,
        total_market_size: total_market_size(shops),
        shop_count: shops.len(),
    };

    shops
        .iter()
        .map(|shop| {
            TargetRange::new(
                target_sale(shop, &context, config).max(1.0),
                (config.min_market_share * shop.market_size).max(1.0),
                (config.max_market_share * shop.market_size).max(1.0),
            )
        })
        .collect()
}
