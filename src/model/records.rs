// src/model/records.rs

use serde::{Deserialize, Serialize};

pub type ShopId = u64;
pub type ProductId = u64;
pub type OfferId = u64;
pub type UnitId = u64;

/// Location of a shop, used to look up the regional retail report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geo {
    pub country_id: u64,
    pub region_id: u64,
    pub city_id: u64,
}

impl Geo {
    pub fn new(country_id: u64, region_id: u64, city_id: u64) -> Self {
        Self {
            country_id,
            region_id,
            city_id,
        }
    }

    /// Path form used by the retail report endpoint: `country/region/city`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.country_id, self.region_id, self.city_id)
    }
}

/// A shop taking part in the management cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedShop {
    pub id: ShopId,
    pub name: String,
    pub geo: Geo,
}

/// One supply contract of a shop, as listed by the supply API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyContract {
    pub offer_id: OfferId,
    pub product_id: ProductId,
    /// The warehouse shipping this product; surplus goes back here.
    pub supplier_id: UnitId,
    pub quantity_at_supplier_storage: u64,
}

/// New order parameters for an existing supply contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyOrder {
    pub quantity: u64,
    /// Relative price-change constraint, 0 means unconstrained.
    pub max_increase: u8,
}

/// Aggregate retail report for one product in one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetailMetrics {
    pub local_market_size: f64,
}

/// One row of a shop's trading hall: what happened to a product last cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub product_id: ProductId,
    /// Opaque key the price setter expects, e.g. `{58728937,58982206}`.
    pub offer_ids: String,
    pub sold: u64,
    /// Amount shipped in last cycle.
    pub purchase: u64,
    /// Amount currently on the shelf.
    pub stock: u64,
    pub price: f64,
    pub market_share: f64,
}

impl TradeRecord {
    /// Everything on the shelf arrived with the last shipment, so the
    /// previous stock ran out.
    pub fn is_sold_out(&self) -> bool {
        self.stock == self.purchase
    }

    /// Sold out with actual sales. Counts towards the clearance rate.
    pub fn is_cleared(&self) -> bool {
        self.is_sold_out() && self.sold > 0
    }

    /// Some stock lingered from before the last shipment.
    pub fn has_leftover(&self) -> bool {
        self.stock > self.purchase
    }
}
