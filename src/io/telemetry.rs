// src/io/telemetry.rs

use crate::error::Result;
use crate::model::records::{
    Geo, ManagedShop, OfferId, ProductId, ShopId, SupplyContract, TradeRecord, UnitId,
};
use crate::simulation::offline::SimulatedGame;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One shop × product line of a telemetry snapshot.
///
/// Columns match a trading hall row plus the contract and location data the
/// cycle needs. `local_market_size` may be left empty; it stands in for the
/// regional retail report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryRow {
    pub shop_id: ShopId,
    pub shop_name: String,
    pub country_id: u64,
    pub region_id: u64,
    pub city_id: u64,
    pub product_id: ProductId,
    pub offer_id: OfferId,
    pub offer_ids: String,
    pub supplier_id: UnitId,
    pub quantity_at_supplier_storage: u64,
    pub sold: u64,
    pub purchase: u64,
    pub stock: u64,
    pub price: f64,
    pub market_share: f64,
    pub clearance_price: f64,
    pub local_market_size: Option<f64>,
}

/// A replayable snapshot: the shops it covers and a game seeded with them.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub shops: Vec<ManagedShop>,
    pub game: SimulatedGame,
}

impl Telemetry {
    pub fn from_rows(rows: Vec<TelemetryRow>) -> Self {
        let mut shops: BTreeMap<ShopId, ManagedShop> = BTreeMap::new();
        let mut game = SimulatedGame::new();

        for row in rows {
            let geo = Geo::new(row.country_id, row.region_id, row.city_id);
            shops.entry(row.shop_id).or_insert_with(|| ManagedShop {
                id: row.shop_id,
                name: row.shop_name.clone(),
                geo,
            });
            game.add_contract(
                row.shop_id,
                SupplyContract {
                    offer_id: row.offer_id,
                    product_id: row.product_id,
                    supplier_id: row.supplier_id,
                    quantity_at_supplier_storage: row.quantity_at_supplier_storage,
                },
            );
            game.add_shelf(
                row.shop_id,
                TradeRecord {
                    product_id: row.product_id,
                    offer_ids: row.offer_ids,
                    sold: row.sold,
                    purchase: row.purchase,
                    stock: row.stock,
                    price: row.price,
                    market_share: row.market_share,
                },
                row.clearance_price,
            );
            if let Some(size) = row.local_market_size {
                game.set_retail_metrics(row.product_id, geo, size);
            }
        }

        Self {
            shops: shops.into_values().collect(),
            game,
        }
    }
}

/// Reads a telemetry snapshot from any CSV source.
pub fn read_telemetry<R: Read>(reader: R) -> Result<Telemetry> {
    let mut rdr = csv::Reader::from_reader(reader);
    let rows = rdr
        .deserialize::<TelemetryRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Telemetry::from_rows(rows))
}

/// Reads a telemetry snapshot from a CSV file.
pub fn load_telemetry(path: &Path) -> Result<Telemetry> {
    let file = std::fs::File::open(path)?;
    read_telemetry(file)
}
