// src/simulation/engine.rs

use crate::error::{Result, ShopError};
use crate::model::cache::{TradingHall, TradingHallCache};
use crate::model::records::{
    ManagedShop, OfferId, ProductId, ShopId, SupplyContract, SupplyOrder, TradeRecord, UnitId,
};
use crate::simulation::client::{GameClient, Throttled};
use crate::simulation::config::ShopConfig;
use crate::strategy::allocation::allocate;
use crate::strategy::demand::{target_ranges, ShopDemand};
use crate::strategy::market::estimate_market_size;
use crate::strategy::math::round_price;
use crate::strategy::pricing::{PriceController, ShelfReadback};
use crate::strategy::repatriation::surplus;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Per-product figures of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPlan {
    pub product_id: ProductId,
    pub supplier_id: UnitId,
    pub quantity_at_supplier_storage: u64,
    /// Units shipped to the managed shops last cycle.
    pub shipped: u64,
    pub quantity_to_distribute: u64,
    /// Share of selling shops that sold out with sales.
    pub clearance_rate: f64,
    /// Sum of the known local market sizes.
    pub total_market_size: f64,
}

impl ProductPlan {
    fn from_contract(contract: &SupplyContract) -> Self {
        Self {
            product_id: contract.product_id,
            supplier_id: contract.supplier_id,
            quantity_at_supplier_storage: contract.quantity_at_supplier_storage,
            shipped: 0,
            quantity_to_distribute: contract.quantity_at_supplier_storage,
            clearance_rate: 0.0,
            total_market_size: 0.0,
        }
    }

    /// When the warehouse holds more than the shops took last cycle, ship
    /// the midpoint to soften swings; otherwise ship everything.
    pub fn distributable(quantity: u64, shipped: u64) -> u64 {
        if quantity > shipped && shipped > 0 {
            (shipped + quantity) / 2
        } else {
            quantity
        }
    }
}

/// One shop × product pair moving through the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub shop_id: ShopId,
    pub offer_id: OfferId,
    pub supplier_id: UnitId,
    pub record: TradeRecord,
    pub market_size: f64,
    // Filled in as the cycle progresses
    pub target_sale: u64,
    pub current_stock: u64,
    pub sale_price: f64,
}

// We make this Serialize so we can write it to CSV later
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub sold: u64,
    pub stock: u64,
    pub market_size: f64,
    pub target_sale: u64,
    pub old_price: f64,
    pub sale_price: f64,
    pub new_price: f64,
    pub repatriated: u64,
}

/// What one management cycle decided.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub date: NaiveDate,
    pub plans: Vec<ProductPlan>,
    pub rows: Vec<ReportRow>,
    /// Pairs left out because their local market size is unknown.
    pub unknown_markets: Vec<(ShopId, ProductId)>,
}

impl CycleReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            plans: Vec::new(),
            rows: Vec::new(),
            unknown_markets: Vec::new(),
        }
    }

    pub fn row(&self, shop_id: ShopId, product_id: ProductId) -> Option<&ReportRow> {
        self.rows
            .iter()
            .find(|r| r.shop_id == shop_id && r.product_id == product_id)
    }

    pub fn plan(&self, product_id: ProductId) -> Option<&ProductPlan> {
        self.plans.iter().find(|p| p.product_id == product_id)
    }

    /// Units ordered for a product across all shops.
    pub fn total_allocated(&self, product_id: ProductId) -> u64 {
        self.rows
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.target_sale)
            .sum()
    }

    pub fn total_repatriated(&self) -> u64 {
        self.rows.iter().map(|r| r.repatriated).sum()
    }
}

/// Fills in each product's distributable quantity and clearance rate from
/// the trades collected for it.
pub fn finalize_plans(plans: &mut BTreeMap<ProductId, ProductPlan>, trades: &[Trade]) {
    for plan in plans.values_mut() {
        plan.quantity_to_distribute =
            ProductPlan::distributable(plan.quantity_at_supplier_storage, plan.shipped);

        let (cleared, count) = trades
            .iter()
            .filter(|t| t.record.product_id == plan.product_id)
            .fold((0usize, 0usize), |(cleared, count), t| {
                (cleared + usize::from(t.record.is_cleared()), count + 1)
            });
        plan.clearance_rate = cleared as f64 / count.max(1) as f64;
    }
}

/// Sets every trade's `target_sale` by splitting each product's distributable
/// quantity across the shops selling it.
pub fn plan_targets(
    plans: &BTreeMap<ProductId, ProductPlan>,
    trades: &mut [Trade],
    config: &ShopConfig,
) {
    for plan in plans.values() {
        let indices: Vec<usize> = trades
            .iter()
            .enumerate()
            .filter(|(_, t)| t.record.product_id == plan.product_id)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }

        let demand: Vec<ShopDemand> = indices
            .iter()
            .map(|&i| ShopDemand {
                record: &trades[i].record,
                market_size: trades[i].market_size,
            })
            .collect();
        let ranges = target_ranges(&demand, plan.quantity_to_distribute, config);
        let shares = allocate(&ranges, plan.quantity_to_distribute);

        for (&i, share) in indices.iter().zip(shares) {
            trades[i].target_sale = share;
        }
        debug!(
            product_id = plan.product_id,
            quantity = plan.quantity_to_distribute,
            shops = indices.len(),
            "distributed product"
        );
    }
}

/// Runs the shop management cycle against a game client.
#[derive(Debug)]
pub struct ShopManager<C: GameClient> {
    client: Throttled<C>,
    config: ShopConfig,
    cache: TradingHallCache,
    today: NaiveDate,
}

impl<C: GameClient> ShopManager<C> {
    pub fn new(client: C, config: ShopConfig, today: NaiveDate) -> Self {
        let client = Throttled::new(client, config.request_delay());
        Self {
            client,
            config,
            cache: TradingHallCache::new(),
            today,
        }
    }

    pub fn client(&self) -> &C {
        self.client.inner()
    }

    pub fn client_mut(&mut self) -> &mut C {
        self.client.inner_mut()
    }

    pub fn into_client(self) -> C {
        self.client.into_inner()
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Moves to a new game day; telemetry cached for earlier days is dropped.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
        self.cache.evict_before(today);
    }

    /// Reads a trading hall, through the same-day cache when `cache` is set.
    pub fn trading_hall(&mut self, shop_id: ShopId, cache: bool) -> Result<TradingHall> {
        let today = self.today;
        let client = &mut self.client;
        self.cache
            .read(shop_id, today, cache, || client.trading_hall(shop_id))
    }

    /// Signs, in every managed shop, the reference shop's contracts it lacks.
    /// Returns the number of contracts created.
    pub fn propagate_contracts(&mut self, shops: &[ManagedShop], reference_shop_id: ShopId) -> Result<usize> {
        info!(reference_shop_id, "copying contracts");
        let reference = self.client.supply_contracts(reference_shop_id)?;
        let mut created = 0;
        for shop in shops.iter().filter(|s| s.id != reference_shop_id) {
            let contracts = self.client.supply_contracts(shop.id)?;
            for offer_id in reference.keys().filter(|id| !contracts.contains_key(*id)) {
                info!(shop_id = shop.id, offer_id, "creating supply contract");
                self.client.create_supply_contract(shop.id, *offer_id, 0)?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Resets a shop's prices: keeps existing prices unless they fell below
    /// the clearance price, and prices new products at a multiple of it.
    pub fn set_default_prices(&mut self, shop_id: ShopId) -> Result<()> {
        let previous = self.trading_hall(shop_id, false)?;
        self.client.set_shop_clearance_prices(shop_id)?;
        let clearance = self.trading_hall(shop_id, false)?;

        let offers: BTreeMap<String, f64> = clearance
            .iter()
            .map(|(product_id, record)| {
                let price = match previous.get(product_id) {
                    Some(prev) if prev.price > 0.0 => prev.price.max(record.price),
                    _ => self.config.default_price_factor * record.price,
                };
                (record.offer_ids.clone(), round_price(price))
            })
            .collect();
        self.client.set_shop_sale_prices(shop_id, &offers)
    }

    /// One full pass: allocation, ordering, repricing and surplus shipping
    /// for every product of the reference shop's catalog.
    ///
    /// A failing request aborts the pass; shops handled before the failure
    /// keep their changes.
    pub fn manage_shops(&mut self, shops: &[ManagedShop], reference_shop_id: ShopId) -> Result<CycleReport> {
        if self.config.propagate_contracts {
            self.propagate_contracts(shops, reference_shop_id)?;
        }

        let catalog: BTreeSet<ProductId> = self
            .client
            .supply_contracts(reference_shop_id)?
            .values()
            .map(|c| c.product_id)
            .collect();
        info!(
            shops = shops.len(),
            products = catalog.len(),
            "reading shops info"
        );

        let mut report = CycleReport::new(self.today);
        let (mut plans, mut trades) = self.collect_trades(shops, &catalog, &mut report)?;
        finalize_plans(&mut plans, &trades);

        info!("distributing sales");
        plan_targets(&plans, &mut trades, &self.config);

        info!("managing shops");
        for shop in shops {
            let mut shop_trades: Vec<&mut Trade> =
                trades.iter_mut().filter(|t| t.shop_id == shop.id).collect();
            if shop_trades.is_empty() {
                continue;
            }
            self.manage_shop(shop, &plans, &mut shop_trades, &mut report)?;
        }

        report.plans = plans.into_values().collect();
        info!(
            rows = report.rows.len(),
            repatriated = report.total_repatriated(),
            "cycle complete"
        );
        Ok(report)
    }

    fn collect_trades(
        &mut self,
        shops: &[ManagedShop],
        catalog: &BTreeSet<ProductId>,
        report: &mut CycleReport,
    ) -> Result<(BTreeMap<ProductId, ProductPlan>, Vec<Trade>)> {
        let mut plans: BTreeMap<ProductId, ProductPlan> = BTreeMap::new();
        let mut trades = Vec::new();

        for shop in shops {
            let contracts: Vec<SupplyContract> = self
                .client
                .supply_contracts(shop.id)?
                .into_values()
                .filter(|c| catalog.contains(&c.product_id))
                .collect();
            if contracts.is_empty() {
                continue;
            }
            let hall = self.trading_hall(shop.id, true)?;

            for contract in contracts {
                let plan = plans
                    .entry(contract.product_id)
                    .or_insert_with(|| ProductPlan::from_contract(&contract));

                let Some(record) = hall.get(&contract.product_id) else {
                    // Contract signed but nothing delivered yet
                    debug!(shop_id = shop.id, product_id = contract.product_id, "no shelf yet");
                    continue;
                };

                let client = &mut self.client;
                let market_size = estimate_market_size(record, || {
                    client.retail_metrics(contract.product_id, &shop.geo)
                })?;
                let Some(market_size) = market_size else {
                    warn!(
                        shop_id = shop.id,
                        product_id = contract.product_id,
                        geo = %shop.geo.path(),
                        "market size unknown, leaving shop out"
                    );
                    report.unknown_markets.push((shop.id, contract.product_id));
                    continue;
                };

                plan.total_market_size += market_size;
                plan.shipped += record.purchase;
                trades.push(Trade {
                    shop_id: shop.id,
                    offer_id: contract.offer_id,
                    supplier_id: contract.supplier_id,
                    record: record.clone(),
                    market_size,
                    target_sale: 0,
                    current_stock: record.stock,
                    sale_price: 0.0,
                });
            }
        }
        Ok((plans, trades))
    }

    fn manage_shop(
        &mut self,
        shop: &ManagedShop,
        plans: &BTreeMap<ProductId, ProductPlan>,
        trades: &mut [&mut Trade],
        report: &mut CycleReport,
    ) -> Result<()> {
        info!(shop_id = shop.id, name = %shop.name, "managing shop");

        let orders: BTreeMap<OfferId, SupplyOrder> = trades
            .iter()
            .map(|t| {
                (
                    t.offer_id,
                    SupplyOrder {
                        quantity: t.target_sale,
                        max_increase: 0,
                    },
                )
            })
            .collect();
        self.client.set_supply_contracts(shop.id, &orders)?;

        // Clearance pricing hits every offer of the shop. Products this cycle
        // does not price get their morning price back.
        let traded: BTreeSet<ProductId> = trades.iter().map(|t| t.record.product_id).collect();
        let untouched: BTreeMap<String, f64> = self
            .trading_hall(shop.id, true)?
            .into_values()
            .filter(|record| !traded.contains(&record.product_id))
            .map(|record| (record.offer_ids, record.price))
            .collect();

        // Zero the offers, then let the game fill in clearance prices so we
        // can read them back as the price floor.
        let zeroed: BTreeMap<String, f64> = trades
            .iter()
            .map(|t| (t.record.offer_ids.clone(), 0.0))
            .collect();
        self.client.set_shop_sale_prices(shop.id, &zeroed)?;
        self.client.set_shop_clearance_prices(shop.id)?;
        let readback = self.trading_hall(shop.id, false)?;

        let controller = PriceController::new(&self.config);
        let mut offers = BTreeMap::new();
        let mut new_prices = Vec::with_capacity(trades.len());
        for trade in trades.iter_mut() {
            let product_id = trade.record.product_id;
            let shelf = readback.get(&product_id).ok_or(ShopError::MissingTrade {
                shop_id: shop.id,
                product_id,
            })?;
            // Part of the stock may already have left since the morning read
            trade.current_stock = shelf.stock;
            trade.sale_price = shelf.price;

            let clearance_rate = plans.get(&product_id).map_or(0.0, |p| p.clearance_rate);
            let new_price = controller.next_price(
                &trade.record,
                trade.target_sale,
                &ShelfReadback {
                    current_stock: trade.current_stock,
                    sale_price: trade.sale_price,
                },
                clearance_rate,
            );
            debug!(
                shop_id = shop.id,
                product_id,
                old_price = trade.record.price,
                new_price,
                target_sale = trade.target_sale,
                "repriced"
            );
            offers.insert(trade.record.offer_ids.clone(), new_price);
            new_prices.push(new_price);
        }
        if !untouched.is_empty() {
            debug!(shop_id = shop.id, offers = untouched.len(), "restoring unmanaged prices");
            offers.extend(untouched);
        }
        self.client.set_shop_sale_prices(shop.id, &offers)?;

        for (trade, new_price) in trades.iter().zip(new_prices) {
            let quantity = surplus(
                trade.target_sale,
                trade.record.sold,
                trade.current_stock,
                trade.market_size,
                self.config.max_market_share_stock,
            );
            if quantity > 0 {
                debug!(
                    shop_id = shop.id,
                    product_id = trade.record.product_id,
                    quantity,
                    "shipping surplus back"
                );
                self.client.product_move_to_warehouse(
                    shop.id,
                    trade.record.product_id,
                    trade.supplier_id,
                    quantity,
                )?;
            }
            report.rows.push(ReportRow {
                shop_id: shop.id,
                product_id: trade.record.product_id,
                sold: trade.record.sold,
                stock: trade.record.stock,
                market_size: trade.market_size,
                target_sale: trade.target_sale,
                old_price: trade.record.price,
                sale_price: trade.sale_price,
                new_price,
                repatriated: quantity,
            });
        }
        Ok(())
    }
}
