//! Events emitted per applied operation

use serde::{Deserialize, Serialize};
use types::fill::Fill;
use types::ids::{MarketId, OrderId};
use types::numeric::Quantity;
use types::order::OrderStatus;

/// Status of an order after an operation was applied, tagged with that
/// operation's sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub order_id: OrderId,
    pub market: MarketId,
    pub sequence: u64,
    pub status: OrderStatus,
    pub remaining: Quantity,
}

/// One publication-stream item. Downstream consumers (fan-out, settlement
/// batching, audit) order by `sequence()` within a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineEvent {
    Order(OrderStatusUpdate),
    Fill(Fill),
}

impl EngineEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            EngineEvent::Order(update) => update.sequence,
            EngineEvent::Fill(fill) => fill.sequence,
        }
    }

    pub fn market(&self) -> &MarketId {
        match self {
            EngineEvent::Order(update) => &update.market,
            EngineEvent::Fill(fill) => &fill.market,
        }
    }
}
