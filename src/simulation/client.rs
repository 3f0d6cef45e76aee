// src/simulation/client.rs

use crate::error::Result;
use crate::model::cache::TradingHall;
use crate::model::records::{
    Geo, OfferId, ProductId, RetailMetrics, ShopId, SupplyContract, SupplyOrder, UnitId,
};
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

/// The game as the management cycle sees it.
///
/// Implementations own transport, page parsing and authentication. Every
/// method is one blocking round trip; failures are reported once and never
/// retried by the cycle.
pub trait GameClient: Debug {
    /// Supply contracts of a shop, keyed by offer.
    fn supply_contracts(&mut self, shop_id: ShopId) -> Result<BTreeMap<OfferId, SupplyContract>>;

    /// Current trading hall of a shop.
    fn trading_hall(&mut self, shop_id: ShopId) -> Result<TradingHall>;

    /// Sets listed prices. Keys are the trade records' `offer_ids`.
    fn set_shop_sale_prices(&mut self, shop_id: ShopId, offers: &BTreeMap<String, f64>) -> Result<()>;

    /// Switches every offer of the shop to the game's automatic clearance price.
    fn set_shop_clearance_prices(&mut self, shop_id: ShopId) -> Result<()>;

    /// Updates order quantities of existing contracts.
    fn set_supply_contracts(
        &mut self,
        shop_id: ShopId,
        orders: &BTreeMap<OfferId, SupplyOrder>,
    ) -> Result<()>;

    /// Signs a new contract for an offer the shop is not supplied from yet.
    fn create_supply_contract(&mut self, shop_id: ShopId, offer_id: OfferId, max_increase: u8) -> Result<()>;

    /// Regional retail report. `None` when the location cannot be resolved.
    fn retail_metrics(&mut self, product_id: ProductId, geo: &Geo) -> Result<Option<RetailMetrics>>;

    /// Ships `quantity` units of a product from a shop back to a warehouse.
    fn product_move_to_warehouse(
        &mut self,
        shop_id: ShopId,
        product_id: ProductId,
        warehouse_id: UnitId,
        quantity: u64,
    ) -> Result<()>;
}

/// Wraps a client so each request waits a random moment first, keeping the
/// request rate under the game's throttling radar.
#[derive(Debug)]
pub struct Throttled<C> {
    inner: C,
    max_delay: Duration,
}

impl<C: GameClient> Throttled<C> {
    pub fn new(inner: C, max_delay: Duration) -> Self {
        Self { inner, max_delay }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn pause(&self) {
        if self.max_delay.is_zero() {
            return;
        }
        let max_ms = self.max_delay.as_millis() as u64;
        let ms = rand::thread_rng().gen_range(0..=max_ms);
        std::thread::sleep(Duration::from_millis(ms));
    }
}

impl<C: GameClient> GameClient for Throttled<C> {
    fn supply_contracts(&mut self, shop_id: ShopId) -> Result<BTreeMap<OfferId, SupplyContract>> {
        self.pause();
        self.inner.supply_contracts(shop_id)
    }

    fn trading_hall(&mut self, shop_id: ShopId) -> Result<TradingHall> {
        self.pause();
        self.inner.trading_hall(shop_id)
    }

    fn set_shop_sale_prices(&mut self, shop_id: ShopId, offers: &BTreeMap<String, f64>) -> Result<()> {
        self.pause();
        self.inner.set_shop_sale_prices(shop_id, offers)
    }

    fn set_shop_clearance_prices(&mut self, shop_id: ShopId) -> Result<()> {
        self.pause();
        self.inner.set_shop_clearance_prices(shop_id)
    }

    fn set_supply_contracts(
        &mut self,
        shop_id: ShopId,
        orders: &BTreeMap<OfferId, SupplyOrder>,
    ) -> Result<()> {
        self.pause();
        self.inner.set_supply_contracts(shop_id, orders)
    }

    fn create_supply_contract(&mut self, shop_id: ShopId, offer_id: OfferId, max_increase: u8) -> Result<()> {
        self.pause();
        self.inner.create_supply_contract(shop_id, offer_id, max_increase)
    }

    fn retail_metrics(&mut self, product_id: ProductId, geo: &Geo) -> Result<Option<RetailMetrics>> {
        self.pause();
        self.inner.retail_metrics(product_id, geo)
    }

    fn product_move_to_warehouse(
        &mut self,
        shop_id: ShopId,
        product_id: ProductId,
        warehouse_id: UnitId,
        quantity: u64,
    ) -> Result<()> {
        self.pause();
        self.inner
            .product_move_to_warehouse(shop_id, product_id, warehouse_id, quantity)
    }
}
