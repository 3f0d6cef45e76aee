//! Shelf allocation and dynamic pricing for a chain of retail shops.
//!
//! Each cycle splits a warehouse's stock across the shops selling a product,
//! reprices every shelf towards its sales target and ships surplus back.

pub mod error;
pub mod io;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use error::{Result, ShopError};
pub use model::records::{Geo, ManagedShop, SupplyContract, SupplyOrder, TradeRecord};
pub use simulation::client::{GameClient, Throttled};
pub use simulation::config::ShopConfig;
pub use simulation::engine::{CycleReport, ShopManager};
pub use simulation::offline::SimulatedGame;
