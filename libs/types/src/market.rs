//! Market definitions and structural validation
//!
//! Markets are created at configuration time and never mutated at runtime.

use crate::errors::ValidationError;
use crate::ids::MarketId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// An immutable market definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub base: String,
    pub quote: String,
    /// Smallest price increment; every limit price must be a multiple.
    pub tick_size: Price,
    /// Smallest quantity increment; every quantity must be a multiple.
    pub lot_size: Quantity,
    /// Disabled markets reject all incoming intents.
    pub enabled: bool,
}

impl Market {
    pub fn new(id: MarketId, tick_size: Price, lot_size: Quantity) -> Self {
        let (base, quote) = id.split();
        let (base, quote) = (base.to_string(), quote.to_string());
        Self {
            id,
            base,
            quote,
            tick_size,
            lot_size,
            enabled: true,
        }
    }

    /// Structural validation of an incoming price/quantity pair.
    ///
    /// This is the only validation the core performs; authenticity and
    /// collateral checks happen upstream.
    pub fn validate(&self, price: Price, quantity: Quantity) -> Result<(), ValidationError> {
        if !self.enabled {
            return Err(ValidationError::MarketDisabled {
                market: self.id.clone(),
            });
        }
        if !price.is_multiple_of(self.tick_size) {
            return Err(ValidationError::InvalidPrice {
                price,
                tick_size: self.tick_size,
            });
        }
        if quantity.is_zero() {
            return Err(ValidationError::ZeroQuantity);
        }
        if !quantity.is_multiple_of(self.lot_size) {
            return Err(ValidationError::InvalidQuantity {
                quantity,
                lot_size: self.lot_size,
            });
        }
        Ok(())
    }
}
