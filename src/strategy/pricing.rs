// src/strategy/pricing.rs

use crate::model::records::TradeRecord;
use crate::simulation::config::ShopConfig;
use crate::strategy::math::{round_price, sigmoid};
use std::f64::consts::{FRAC_PI_2, PI};

/// Shelf state read back after the shop switched to clearance prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShelfReadback {
    /// Units on the shelf right now; part of the stock may already be gone.
    pub current_stock: u64,
    /// The automatic clearance price, the lowest price we ever set.
    pub sale_price: f64,
}

/// Feedback controller steering each shop's price towards its sales target.
///
/// A shop that sold out gets a price increase whose size grows with the share
/// of shops that sold out too. A shop with stock left over gets a bounded
/// sigmoid correction by how far sales fell short of the target.
#[derive(Debug, Clone)]
pub struct PriceController {
    max_price_adjustment: f64,
    elasticity: f64,
    target_stock_ratio: f64,
    sales_price_factor: f64,
}

impl PriceController {
    pub fn new(config: &ShopConfig) -> Self {
        Self {
            max_price_adjustment: config.max_price_adjustment,
            elasticity: config.elasticity,
            target_stock_ratio: config.target_stock_ratio,
            sales_price_factor: config.sales_price_factor,
        }
    }

    /// Scales the sell-out increase from 0.4 (nobody else sold out) to 10
    /// (every shop sold out).
    pub fn clearance_factor(clearance_rate: f64) -> f64 {
        0.4 + 9.6 * clearance_rate.clamp(0.0, 1.0).powf(1.5)
    }

    /// Extra push when a shop sold more than it was meant to. Saturates
    /// below 2.
    pub fn stock_factor(&self, sold: f64, target: f64) -> f64 {
        if target < sold {
            1.0 + 2.0 / PI * (FRAC_PI_2 * (sold / target - 1.0) / self.elasticity).atan()
        } else {
            1.0
        }
    }

    /// Sales volume the price should aim at.
    pub fn effective_target(&self, target_sale: u64, current_stock: u64) -> f64 {
        (target_sale as f64).min(current_stock as f64 * self.target_stock_ratio)
    }

    /// Next listed price for one product of one shop, rounded to cents and
    /// never below the clearance price.
    pub fn next_price(
        &self,
        record: &TradeRecord,
        target_sale: u64,
        shelf: &ShelfReadback,
        clearance_rate: f64,
    ) -> f64 {
        let mut new_price = if record.price > 0.0 {
            self.adjust(record, target_sale, shelf, clearance_rate)
        } else {
            // New product: start well above the clearance price.
            self.sales_price_factor * shelf.sale_price
        };

        if new_price < shelf.sale_price {
            new_price = shelf.sale_price;
        }
        let rounded = round_price(new_price);
        if rounded < shelf.sale_price {
            (shelf.sale_price * 100.0).ceil() / 100.0
        } else {
            rounded
        }
    }

    fn adjust(
        &self,
        record: &TradeRecord,
        target_sale: u64,
        shelf: &ShelfReadback,
        clearance_rate: f64,
    ) -> f64 {
        let price = record.price;
        let target = self.effective_target(target_sale, shelf.current_stock);
        if target <= 0.0 {
            return price;
        }

        let sold = record.sold as f64;
        if record.is_cleared() {
            let increase = self.max_price_adjustment
                * self.stock_factor(sold, target)
                * Self::clearance_factor(clearance_rate);
            price * (1.0 + increase)
        } else if record.has_leftover() {
            // Nothing moved at all: discount twice as fast.
            let discount_factor = if record.sold == 0 { 2.0 } else { 1.0 };
            price
                * sigmoid(
                    sold / target,
                    1.0 / self.elasticity,
                    discount_factor * self.max_price_adjustment,
                )
        } else {
            price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sold: u64, purchase: u64, stock: u64, price: f64) -> TradeRecord {
        TradeRecord {
            product_id: 3,
            offer_ids: "{3}".to_string(),
            sold,
            purchase,
            stock,
            price,
            market_share: 0.05,
        }
    }

    fn controller() -> PriceController {
        PriceController::new(&ShopConfig::default())
    }

    #[test]
    fn test_clearance_factor_range() {
        assert!((PriceController::clearance_factor(0.0) - 0.4).abs() < 1e-12);
        assert!((PriceController::clearance_factor(1.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_stock_factor_saturates() {
        let c = controller();
        assert_eq!(c.stock_factor(50.0, 80.0), 1.0);
        let f = c.stock_factor(1_000_000.0, 1.0);
        assert!(f > 1.9 && f < 2.0);
    }

    #[test]
    fn test_sold_out_raises_price() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 100, sale_price: 4.0 };
        let price = c.next_price(&record(100, 100, 100, 10.0), 125, &shelf, 0.5);
        assert!(price > 10.0);
        // max step 0.02, clearance factor ~3.79, stock factor just above 1
        assert!(price < 10.0 * (1.0 + 0.02 * 2.0 * 3.8));
    }

    #[test]
    fn test_undersold_lowers_price() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 4.0 };
        let price = c.next_price(&record(20, 40, 50, 10.0), 25, &shelf, 0.5);
        assert!(price < 10.0);
        assert!(price >= 10.0 * (1.0 - 0.02));
    }

    #[test]
    fn test_nothing_sold_discounts_faster() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 1.0 };
        let stalled = c.next_price(&record(0, 40, 50, 100.0), 25, &shelf, 0.0);
        let slow = c.next_price(&record(1, 40, 50, 100.0), 25, &shelf, 0.0);
        assert!(stalled < slow);
        assert!(stalled >= 100.0 * (1.0 - 0.04));
    }

    #[test]
    fn test_on_target_keeps_price() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 4.0 };
        let price = c.next_price(&record(25, 40, 50, 10.0), 25, &shelf, 0.3);
        assert_eq!(price, 10.0);
    }

    #[test]
    fn test_step_shrinks_as_sales_near_target() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 4.0 };
        let steps: Vec<f64> = [5, 10, 15, 20, 24, 25]
            .iter()
            .map(|&sold| 100.0 - c.next_price(&record(sold, 40, 50, 100.0), 25, &shelf, 0.0))
            .collect();
        for pair in steps.windows(2) {
            assert!(pair[1] < pair[0], "{:?}", steps);
        }
        assert_eq!(steps[5], 0.0);
    }

    #[test]
    fn test_repeated_steps_settle() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 80.0 };
        let mut price = 100.0;
        for _ in 0..200 {
            let next = c.next_price(&record(20, 40, 50, price), 25, &shelf, 0.0);
            assert!(next <= price);
            assert!(price - next <= 0.02 * price + 0.01);
            price = next;
        }
        // Pinned at the floor: feeding the price back changes nothing
        assert_eq!(price, 80.0);
        assert_eq!(c.next_price(&record(20, 40, 50, price), 25, &shelf, 0.0), price);
    }

    #[test]
    fn test_never_below_clearance_price() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 50, sale_price: 9.95 };
        let price = c.next_price(&record(0, 40, 50, 10.0), 25, &shelf, 0.0);
        assert_eq!(price, 9.95);

        let odd = ShelfReadback { current_stock: 50, sale_price: 9.997 };
        let price = c.next_price(&record(0, 40, 50, 10.0), 25, &odd, 0.0);
        assert!(price >= 9.997);
    }

    #[test]
    fn test_new_product_starts_above_clearance() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 30, sale_price: 3.3 };
        assert_eq!(c.next_price(&record(0, 30, 30, 0.0), 10, &shelf, 0.0), 6.6);
    }

    #[test]
    fn test_empty_shelf_keeps_price() {
        let c = controller();
        let shelf = ShelfReadback { current_stock: 0, sale_price: 2.0 };
        assert_eq!(c.next_price(&record(0, 0, 10, 7.5), 10, &shelf, 0.0), 7.5);
    }
}
