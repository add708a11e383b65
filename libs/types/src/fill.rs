//! Fill records — one immutable record per match leg

use crate::ids::{FillId, MarketId, OrderId, OwnerId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An immutable record of one match leg.
///
/// The execution price is always the maker's (resting order's) limit price.
/// Created exactly once, never mutated, append-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: FillId,
    pub market: MarketId,

    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_owner: OwnerId,
    pub taker_owner: OwnerId,

    pub price: Price,
    pub quantity: Quantity,

    /// Sequence number of the taker operation that produced this fill.
    pub sequence: u64,
    /// Unix nanos at commit time of the taker operation.
    pub executed_at: i64,
}

impl Fill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: MarketId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_owner: OwnerId,
        taker_owner: OwnerId,
        price: Price,
        quantity: Quantity,
        sequence: u64,
        executed_at: i64,
    ) -> Self {
        Self {
            fill_id: FillId::new(),
            market,
            maker_order_id,
            taker_order_id,
            maker_owner,
            taker_owner,
            price,
            quantity,
            sequence,
            executed_at,
        }
    }

    /// Notional value (price × quantity) in quote units.
    pub fn notional(&self) -> Decimal {
        self.price.as_decimal() * self.quantity.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fill() -> Fill {
        Fill::new(
            MarketId::new("BTC/USDC"),
            OrderId::new(),
            OrderId::new(),
            OwnerId::new(),
            OwnerId::new(),
            Price::from_u64(50_000),
            "0.5".parse().unwrap(),
            123,
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_fill_notional() {
        let fill = sample_fill();
        assert_eq!(fill.notional(), Decimal::from(25_000));
    }

    #[test]
    fn test_fill_serialization_roundtrip() {
        let fill = sample_fill();
        let json = serde_json::to_string(&fill).unwrap();
        let back: Fill = serde_json::from_str(&json).unwrap();
        assert_eq!(fill, back);
    }
}
