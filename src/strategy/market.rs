// src/strategy/market.rs

use crate::error::Result;
use crate::model::records::{RetailMetrics, TradeRecord};

/// Local market size seen through a shop's own sales: `sold / market_share`.
/// `None` when the shop holds no share to extrapolate from.
pub fn size_from_share(record: &TradeRecord) -> Option<f64> {
    if record.market_share > 0.0 {
        Some(record.sold as f64 / record.market_share)
    } else {
        None
    }
}

/// Estimates the local market of one shop for one product.
///
/// Prefers the share-based estimate and only calls `report` (the regional
/// retail report, a network round trip) when the shop has no share yet.
/// A missing report stays missing: the caller decides what an unknown market
/// means.
pub fn estimate_market_size<F>(record: &TradeRecord, report: F) -> Result<Option<f64>>
where
    F: FnOnce() -> Result<Option<RetailMetrics>>,
{
    if let Some(size) = size_from_share(record) {
        return Ok(Some(size));
    }
    Ok(report()?
        .map(|metrics| metrics.local_market_size)
        .filter(|size| size.is_finite() && *size >= 0.0))
}
