// src/strategy/repatriation.rs

/// Stock a shop should keep on the shelf for the coming cycle.
///
/// With sales, the need spans today's target and yesterday's sales, smoothing
/// between days. Without sales, two cycles' worth of target. Either way capped
/// at `max_market_share_stock` of the local market.
pub fn stock_need(target_sale: u64, sold: u64, market_size: f64, max_market_share_stock: f64) -> f64 {
    let need = if sold > 0 {
        (target_sale + sold) as f64
    } else {
        2.0 * target_sale as f64
    };
    need.min(max_market_share_stock * market_size)
}

/// Units to ship back to the warehouse, zero when nothing is surplus.
pub fn surplus(
    target_sale: u64,
    sold: u64,
    current_stock: u64,
    market_size: f64,
    max_market_share_stock: f64,
) -> u64 {
    let need = stock_need(target_sale, sold, market_size, max_market_share_stock);
    let stock = current_stock as f64;
    if stock > need {
        (stock - need.max(0.0)) as u64
    } else {
        0
    }
}
