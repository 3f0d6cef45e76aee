// src/model/cache.rs

use crate::error::Result;
use crate::model::records::{ProductId, ShopId, TradeRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// A shop's trading hall keyed by product.
pub type TradingHall = BTreeMap<ProductId, TradeRecord>;

/// Same-day memo of trading hall reads.
///
/// Telemetry only changes once per game day, so one read per shop per date
/// is enough for every cycle run that day. Reads that must observe the effect
/// of a mutation (the clearance price read-back) bypass the memo entirely.
#[derive(Debug, Clone, Default)]
pub struct TradingHallCache {
    entries: HashMap<(ShopId, NaiveDate), TradingHall>,
}

impl TradingHallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a non-empty hall has been fetched for this shop on this date.
    pub fn is_fetched(&self, shop_id: ShopId, date: NaiveDate) -> bool {
        self.entries
            .get(&(shop_id, date))
            .is_some_and(|hall| !hall.is_empty())
    }

    pub fn get(&self, shop_id: ShopId, date: NaiveDate) -> Option<&TradingHall> {
        self.entries
            .get(&(shop_id, date))
            .filter(|hall| !hall.is_empty())
    }

    pub fn insert(&mut self, shop_id: ShopId, date: NaiveDate, hall: TradingHall) {
        self.entries.insert((shop_id, date), hall);
    }

    /// Returns the hall for `shop_id`, calling `fetch` when needed.
    ///
    /// With `cache == true` a same-day entry is reused and a fresh fetch is
    /// stored. With `cache == false` the fetch always happens and the memo is
    /// left alone.
    pub fn read<F>(
        &mut self,
        shop_id: ShopId,
        date: NaiveDate,
        cache: bool,
        fetch: F,
    ) -> Result<TradingHall>
    where
        F: FnOnce() -> Result<TradingHall>,
    {
        if cache {
            if let Some(hall) = self.get(shop_id, date) {
                return Ok(hall.clone());
            }
        }

        let hall = fetch()?;
        if cache {
            self.insert(shop_id, date, hall.clone());
        }
        Ok(hall)
    }

    /// Drops everything recorded before `date`.
    pub fn evict_before(&mut self, date: NaiveDate) {
        self.entries.retain(|(_, day), _| *day >= date);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
