//! Error taxonomy for the matching core

use crate::ids::MarketId;
use crate::numeric::{Price, Quantity};
use thiserror::Error;

/// Structural validation failures.
///
/// Reported synchronously to the caller; the operation is REJECTED and no
/// book state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown market: {market}")]
    UnknownMarket { market: MarketId },

    #[error("market disabled: {market}")]
    MarketDisabled { market: MarketId },

    #[error("price {price} is not a multiple of tick size {tick_size}")]
    InvalidPrice { price: Price, tick_size: Price },

    #[error("quantity {quantity} is not a multiple of lot size {lot_size}")]
    InvalidQuantity {
        quantity: Quantity,
        lot_size: Quantity,
    },

    #[error("quantity must be positive")]
    ZeroQuantity,
}
