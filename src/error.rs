// src/error.rs

use crate::model::records::{ProductId, ShopId};

/// Everything that can abort a management cycle.
///
/// Client failures are never retried: they bubble up through `?` and end the
/// cycle wherever it happens to be. Stores updated before the failure keep
/// their new orders and prices.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("game client error: {0}")]
    Client(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("shop {shop_id} has no trading hall entry for product {product_id}")]
    MissingTrade {
        shop_id: ShopId,
        product_id: ProductId,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShopError>;
