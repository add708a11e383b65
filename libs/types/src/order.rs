//! Order lifecycle types

use crate::ids::{MarketId, OrderId, OwnerId};
use crate::intent::IdempotencyKey;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order status lifecycle.
///
/// `Pending` → `Open` → `PartiallyFilled` → `Filled` | `Cancelled`.
/// `Rejected` orders never enter the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Received, not yet sequenced.
    Pending,
    /// Resting with its full original quantity.
    Open,
    /// Resting (or just matched) with 0 < remaining < original.
    PartiallyFilled,
    /// Remaining reached zero (terminal).
    Filled,
    /// Removed before a full fill (terminal).
    Cancelled,
    /// Failed structural validation, never entered the book (terminal).
    Rejected,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A limit order, resting or incoming.
///
/// Once admitted, an order is owned exclusively by its market's actor and is
/// mutated only while that market's operations are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub market: MarketId,
    pub owner: OwnerId,
    pub side: Side,
    pub price: Price,
    pub original: Quantity,
    pub remaining: Quantity,
    pub status: OrderStatus,
    /// Caller-supplied idempotency key (signer + nonce).
    pub key: IdempotencyKey,
    /// Per-market arrival sequence number, assigned at commit time.
    pub sequence: u64,
    /// Unix nanos at commit time.
    pub accepted_at: i64,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        market: MarketId,
        owner: OwnerId,
        side: Side,
        price: Price,
        quantity: Quantity,
        key: IdempotencyKey,
        sequence: u64,
        accepted_at: i64,
    ) -> Self {
        Self {
            order_id,
            market,
            owner,
            side,
            price,
            original: quantity,
            remaining: quantity,
            status: OrderStatus::Pending,
            key,
            sequence,
            accepted_at,
        }
    }

    /// Check quantity invariant: 0 <= remaining <= original, and
    /// remaining == 0 exactly when the order is filled.
    pub fn check_invariant(&self) -> bool {
        self.remaining <= self.original
            && matches!(self.status, OrderStatus::Filled) == self.remaining.is_zero()
    }

    pub fn is_filled(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn filled_quantity(&self) -> Quantity {
        // remaining <= original always holds
        self.original - self.remaining
    }

    /// Reduce remaining by a fill and advance the status.
    ///
    /// # Panics
    /// Panics if the fill exceeds the remaining quantity.
    pub fn apply_fill(&mut self, quantity: Quantity) {
        let remaining = self
            .remaining
            .checked_sub(quantity)
            .expect("fill exceeds remaining quantity");
        self.remaining = remaining;
        self.status = if remaining.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    /// Mark the order resting after matching completed with quantity left.
    pub fn rest(&mut self) {
        if self.remaining == self.original {
            self.status = OrderStatus::Open;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    /// Cancel the order.
    ///
    /// # Panics
    /// Panics if the order is already in a terminal state; callers check
    /// `status.is_terminal()` first, which makes cancels of terminal orders a
    /// benign no-op rather than an error.
    pub fn cancel(&mut self) {
        assert!(!self.status.is_terminal(), "cannot cancel terminal order");
        self.status = OrderStatus::Cancelled;
    }
}
