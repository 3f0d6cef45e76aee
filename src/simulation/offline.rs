// src/simulation/offline.rs

use crate::error::{Result, ShopError};
use crate::model::cache::TradingHall;
use crate::model::records::{
    Geo, OfferId, ProductId, RetailMetrics, ShopId, SupplyContract, SupplyOrder, TradeRecord,
    UnitId,
};
use crate::simulation::client::GameClient;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A trading hall row together with the clearance price the game would
/// apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedShelf {
    pub record: TradeRecord,
    pub clearance_price: f64,
}

/// One surplus shipment issued by the cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseMove {
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub warehouse_id: UnitId,
    pub quantity: u64,
}

/// In-memory stand-in for the game, replaying a fixed snapshot of telemetry.
///
/// Mutations are applied to the snapshot and logged, so a run can be
/// inspected afterwards or replayed into a second cycle.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGame {
    contracts: BTreeMap<ShopId, BTreeMap<OfferId, SupplyContract>>,
    shelves: BTreeMap<ShopId, BTreeMap<ProductId, SimulatedShelf>>,
    metrics: HashMap<(ProductId, Geo), RetailMetrics>,
    failing_shops: Vec<ShopId>,

    // Call log
    pub orders: Vec<(ShopId, OfferId, SupplyOrder)>,
    pub price_updates: Vec<(ShopId, String, f64)>,
    pub moves: Vec<WarehouseMove>,
    pub created_contracts: Vec<(ShopId, OfferId)>,
    pub trading_hall_reads: usize,
    pub metrics_reads: usize,
}

impl SimulatedGame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contract(&mut self, shop_id: ShopId, contract: SupplyContract) {
        self.contracts
            .entry(shop_id)
            .or_default()
            .insert(contract.offer_id, contract);
    }

    pub fn add_shelf(&mut self, shop_id: ShopId, record: TradeRecord, clearance_price: f64) {
        self.shelves.entry(shop_id).or_default().insert(
            record.product_id,
            SimulatedShelf {
                record,
                clearance_price,
            },
        );
    }

    pub fn set_retail_metrics(&mut self, product_id: ProductId, geo: Geo, local_market_size: f64) {
        self.metrics
            .insert((product_id, geo), RetailMetrics { local_market_size });
    }

    /// Makes every trading hall read of `shop_id` fail, to exercise error paths.
    pub fn fail_trading_hall(&mut self, shop_id: ShopId) {
        self.failing_shops.push(shop_id);
    }

    pub fn shelf(&self, shop_id: ShopId, product_id: ProductId) -> Option<&SimulatedShelf> {
        self.shelves.get(&shop_id)?.get(&product_id)
    }

    pub fn contracts_of(&self, shop_id: ShopId) -> Option<&BTreeMap<OfferId, SupplyContract>> {
        self.contracts.get(&shop_id)
    }

    /// Latest order placed for an offer of a shop.
    pub fn last_order(&self, shop_id: ShopId, offer_id: OfferId) -> Option<SupplyOrder> {
        self.orders
            .iter()
            .rev()
            .find(|(shop, offer, _)| *shop == shop_id && *offer == offer_id)
            .map(|(_, _, order)| *order)
    }

    fn find_offer(&self, offer_id: OfferId) -> Option<SupplyContract> {
        self.contracts
            .values()
            .find_map(|contracts| contracts.get(&offer_id))
            .cloned()
    }
}

impl GameClient for SimulatedGame {
    fn supply_contracts(&mut self, shop_id: ShopId) -> Result<BTreeMap<OfferId, SupplyContract>> {
        Ok(self.contracts.get(&shop_id).cloned().unwrap_or_default())
    }

    fn trading_hall(&mut self, shop_id: ShopId) -> Result<TradingHall> {
        if self.failing_shops.contains(&shop_id) {
            return Err(ShopError::Client(format!(
                "trading hall of shop {} is unavailable",
                shop_id
            )));
        }
        self.trading_hall_reads += 1;
        Ok(self
            .shelves
            .get(&shop_id)
            .map(|shelves| {
                shelves
                    .iter()
                    .map(|(product_id, shelf)| (*product_id, shelf.record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_shop_sale_prices(&mut self, shop_id: ShopId, offers: &BTreeMap<String, f64>) -> Result<()> {
        let shelves = self
            .shelves
            .get_mut(&shop_id)
            .ok_or_else(|| ShopError::Client(format!("unknown shop {}", shop_id)))?;
        for (offer_ids, price) in offers {
            let shelf = shelves
                .values_mut()
                .find(|shelf| &shelf.record.offer_ids == offer_ids)
                .ok_or_else(|| {
                    ShopError::Client(format!("shop {} has no offer {}", shop_id, offer_ids))
                })?;
            shelf.record.price = *price;
            self.price_updates.push((shop_id, offer_ids.clone(), *price));
        }
        Ok(())
    }

    fn set_shop_clearance_prices(&mut self, shop_id: ShopId) -> Result<()> {
        if let Some(shelves) = self.shelves.get_mut(&shop_id) {
            for shelf in shelves.values_mut() {
                shelf.record.price = shelf.clearance_price;
            }
        }
        Ok(())
    }

    fn set_supply_contracts(
        &mut self,
        shop_id: ShopId,
        orders: &BTreeMap<OfferId, SupplyOrder>,
    ) -> Result<()> {
        let contracts = self.contracts.get(&shop_id);
        for (offer_id, order) in orders {
            if !contracts.is_some_and(|c| c.contains_key(offer_id)) {
                return Err(ShopError::Client(format!(
                    "shop {} has no contract for offer {}",
                    shop_id, offer_id
                )));
            }
            self.orders.push((shop_id, *offer_id, *order));
        }
        Ok(())
    }

    fn create_supply_contract(&mut self, shop_id: ShopId, offer_id: OfferId, _max_increase: u8) -> Result<()> {
        let contract = self
            .find_offer(offer_id)
            .ok_or_else(|| ShopError::Client(format!("unknown offer {}", offer_id)))?;
        self.add_contract(shop_id, contract);
        self.created_contracts.push((shop_id, offer_id));
        Ok(())
    }

    fn retail_metrics(&mut self, product_id: ProductId, geo: &Geo) -> Result<Option<RetailMetrics>> {
        self.metrics_reads += 1;
        Ok(self.metrics.get(&(product_id, *geo)).copied())
    }

    fn product_move_to_warehouse(
        &mut self,
        shop_id: ShopId,
        product_id: ProductId,
        warehouse_id: UnitId,
        quantity: u64,
    ) -> Result<()> {
        let shelf = self
            .shelves
            .get_mut(&shop_id)
            .and_then(|shelves| shelves.get_mut(&product_id))
            .ok_or_else(|| {
                ShopError::Client(format!("shop {} does not sell product {}", shop_id, product_id))
            })?;
        shelf.record.stock = shelf.record.stock.saturating_sub(quantity);
        self.moves.push(WarehouseMove {
            shop_id,
            product_id,
            warehouse_id,
            quantity,
        });
        Ok(())
    }
}
