// src/io/synthetic.rs

use crate::error::{Result, ShopError};
use crate::io::telemetry::{Telemetry, TelemetryRow};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};

/// Shape of a generated market.
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    pub shops: usize,
    pub products: usize,
    /// Mean units sold per shop per cycle.
    pub mean_sales: f64,
    /// Standard deviation of units sold (volatility).
    pub sales_std_dev: f64,
    pub mean_price: f64,
    /// Spread of prices across shops, as a log-normal sigma.
    pub price_sigma: f64,
}

impl Default for SyntheticMarket {
    fn default() -> Self {
        Self {
            shops: 6,
            products: 3,
            mean_sales: 120.0,
            sales_std_dev: 40.0,
            mean_price: 25.0,
            price_sigma: 0.15,
        }
    }
}

/// Samples a non-negative whole number of units.
fn sample_units<R: Rng>(dist: &Normal<f64>, rng: &mut R) -> u64 {
    // Round, and clamp negative draws to 0 (sales cannot be negative)
    let value = dist.sample(rng).round();
    if value < 0.0 {
        0
    } else {
        value as u64
    }
}

/// Generates a telemetry snapshot in which some shops sold out and others
/// kept stock, with a few shops holding no market share yet.
pub fn generate_market<R: Rng>(market: &SyntheticMarket, rng: &mut R) -> Result<Telemetry> {
    let sales = Normal::new(market.mean_sales, market.sales_std_dev)
        .map_err(|e| ShopError::Config(format!("sales distribution: {}", e)))?;
    let prices = LogNormal::new(market.mean_price.max(0.01).ln(), market.price_sigma)
        .map_err(|e| ShopError::Config(format!("price distribution: {}", e)))?;

    let mut rows = Vec::with_capacity(market.shops * market.products);
    for product in 0..market.products {
        let product_id = 1000 + product as u64;
        let supplier_id = 9000 + product as u64;
        let quantity_at_supplier_storage = (market.mean_sales * market.shops as f64) as u64;

        for shop in 0..market.shops {
            let shop_id = 100 + shop as u64;
            let sold = sample_units(&sales, rng);
            let purchase = sample_units(&sales, rng);
            // Roughly a third of the shops sold out
            let stock = if rng.gen_bool(1.0 / 3.0) {
                purchase
            } else {
                purchase + rng.gen_range(1..=market.mean_sales.max(1.0) as u64)
            };
            let sold = sold.min(stock);
            let price = (prices.sample(rng) * 100.0).round() / 100.0;
            let market_size = sold as f64 * rng.gen_range(20.0..80.0);
            let market_share = if sold > 0 && rng.gen_bool(0.8) {
                sold as f64 / market_size
            } else {
                0.0
            };

            rows.push(TelemetryRow {
                shop_id,
                shop_name: format!("Shop {}", shop + 1),
                country_id: 1,
                region_id: 10 + (shop % 2) as u64,
                city_id: 100 + shop as u64,
                product_id,
                offer_id: product_id * 10,
                offer_ids: format!("{{{}{}}}", product_id, shop_id),
                supplier_id,
                quantity_at_supplier_storage,
                sold,
                purchase,
                stock,
                price,
                market_share,
                clearance_price: (price * 0.4 * 100.0).round() / 100.0,
                local_market_size: Some(market_size.max(market.mean_sales * 20.0)),
            });
        }
    }

    Ok(Telemetry::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::client::GameClient;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generates_every_pair() {
        let mut rng = StdRng::seed_from_u64(7);
        let market = SyntheticMarket::default();
        let mut telemetry = generate_market(&market, &mut rng).unwrap();
        assert_eq!(telemetry.shops.len(), market.shops);
        for shop in &telemetry.shops {
            let hall = telemetry.game.trading_hall(shop.id).unwrap();
            assert_eq!(hall.len(), market.products);
            for record in hall.values() {
                assert!(record.stock >= record.purchase);
                assert!(record.sold <= record.stock);
                assert!(record.price > 0.0);
            }
        }
    }

    #[test]
    fn test_same_seed_same_market() {
        let market = SyntheticMarket::default();
        let mut a = generate_market(&market, &mut StdRng::seed_from_u64(1)).unwrap();
        let mut b = generate_market(&market, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a.game.trading_hall(100).unwrap(), b.game.trading_hall(100).unwrap());
    }

    #[test]
    fn test_negative_spread_is_rejected() {
        let market = SyntheticMarket {
            sales_std_dev: -1.0,
            ..SyntheticMarket::default()
        };
        let result = generate_market(&market, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(ShopError::Config(_))));
    }
}
