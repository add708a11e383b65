//! Per-market engine state machine
//!
//! One `MarketEngine` per market, applying sequenced operations one at a
//! time. The same operation stream applied to the same starting state always
//! yields the same book, statuses, and fills — live processing and recovery
//! replay run this exact code path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::events::OrderStatusUpdate;
use crate::matching::matcher;
use types::errors::ValidationError;
use types::ids::OrderId;
use types::intent::IdempotencyKey;
use types::market::Market;
use types::numeric::Quantity;
use types::operation::Operation;
use types::order::{Order, OrderStatus, Side};

/// Compact record of a committed operation's outcome, returned to callers
/// that redeliver the same idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedResult {
    pub sequence: u64,
    pub order_id: OrderId,
    /// None when the operation was a cancel of an unknown order.
    pub status: Option<OrderStatus>,
    pub remaining: Quantity,
}

/// Everything produced by applying one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub sequence: u64,
    /// Status of the operation's target order. None only for a cancel that
    /// referenced an unknown order.
    pub update: Option<OrderStatusUpdate>,
    pub fills: Vec<types::fill::Fill>,
}

/// Result of `MarketEngine::apply`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    /// Operation applied (possibly as a benign no-op cancel).
    Applied(ApplyOutcome),
    /// Idempotency key already committed; nothing changed. Carries the
    /// previously recorded result.
    Duplicate(CommittedResult),
}

/// Serializable engine state, the snapshot payload.
///
/// The book is not stored: it is derived from the resting subset of
/// `orders`, rebuilt on restore. BTreeMaps keep serialization order
/// deterministic, so identical states produce identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub orders: BTreeMap<OrderId, Order>,
    pub committed: BTreeMap<IdempotencyKey, CommittedResult>,
    pub next_sequence: u64,
}

impl EngineState {
    pub fn empty() -> Self {
        Self {
            orders: BTreeMap::new(),
            committed: BTreeMap::new(),
            next_sequence: 1,
        }
    }
}

/// One market's matching state: the book, every order ever admitted, and the
/// committed idempotency records.
#[derive(Debug)]
pub struct MarketEngine {
    market: Market,
    book: Book,
    orders: BTreeMap<OrderId, Order>,
    committed: BTreeMap<IdempotencyKey, CommittedResult>,
    next_sequence: u64,
}

impl MarketEngine {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            book: Book::new(),
            orders: BTreeMap::new(),
            committed: BTreeMap::new(),
            next_sequence: 1,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Next sequence number this market will assign.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Previously recorded result for an idempotency key, if committed.
    pub fn recorded(&self, key: &IdempotencyKey) -> Option<&CommittedResult> {
        self.committed.get(key)
    }

    /// Current status of an order, if it was ever admitted.
    pub fn order_status(&self, order_id: &OrderId) -> Option<OrderStatus> {
        self.orders.get(order_id).map(|o| o.status)
    }

    pub fn depth_snapshot(
        &self,
        side: Side,
        depth: usize,
    ) -> Vec<(types::numeric::Price, Quantity)> {
        self.book.depth_snapshot(side, depth)
    }

    pub fn resting_count(&self) -> usize {
        self.book.resting_count()
    }

    /// Apply one sequenced operation.
    ///
    /// `sequence` must be this market's next sequence number; the caller
    /// (actor or recovery replay) has already logged the operation under it.
    /// `timestamp` is the commit timestamp recorded in the log entry.
    pub fn apply(&mut self, operation: &Operation, sequence: u64, timestamp: i64) -> ApplyResult {
        debug_assert_eq!(sequence, self.next_sequence, "operation out of order");

        if let Some(prior) = self.committed.get(&operation.key()) {
            return ApplyResult::Duplicate(prior.clone());
        }
        self.next_sequence = sequence + 1;

        match operation {
            Operation::Admit { order_id, intent } => {
                self.admit(*order_id, intent, sequence, timestamp)
            }
            Operation::Cancel { order_id, key } => self.cancel(*order_id, *key, sequence),
        }
    }

    fn admit(
        &mut self,
        order_id: OrderId,
        intent: &types::intent::Intent,
        sequence: u64,
        timestamp: i64,
    ) -> ApplyResult {
        let mut order = Order::new(
            order_id,
            intent.market.clone(),
            intent.owner,
            intent.side,
            intent.price,
            intent.quantity,
            intent.key,
            sequence,
            timestamp,
        );

        // The router validates before admission; this re-check keeps the
        // engine safe when driven directly and stays deterministic under
        // replay (the same operation always validates the same way).
        if self.validate(intent).is_err() {
            order.status = OrderStatus::Rejected;
            let update = Self::status_update(&order, sequence);
            self.orders.insert(order_id, order);
            return self.commit(
                intent.key,
                ApplyOutcome {
                    sequence,
                    update: Some(update),
                    fills: Vec::new(),
                },
            );
        }

        let result = matcher::match_order(&mut self.book, &mut order, timestamp);

        for maker_fill in &result.maker_fills {
            if let Some(maker) = self.orders.get_mut(&maker_fill.order_id) {
                maker.apply_fill(maker_fill.filled);
            }
        }

        if result.blocked_self_trade {
            // Self-trade prevention: the remainder is cancelled, the resting
            // order keeps its place.
            order.status = OrderStatus::Cancelled;
        } else if !order.remaining.is_zero() {
            order.rest();
            self.book.insert(&order);
        }

        let update = Self::status_update(&order, sequence);
        self.orders.insert(order_id, order);
        self.commit(
            intent.key,
            ApplyOutcome {
                sequence,
                update: Some(update),
                fills: result.fills,
            },
        )
    }

    fn cancel(&mut self, order_id: OrderId, key: IdempotencyKey, sequence: u64) -> ApplyResult {
        let current = self.orders.get(&order_id).map(|o| o.status);
        let update = match current {
            // Unknown order: benign no-op with nothing to report.
            None => None,
            // Already terminal: benign no-op reporting the current status.
            Some(status) if status.is_terminal() => self
                .orders
                .get(&order_id)
                .map(|o| Self::status_update(o, sequence)),
            Some(_) => {
                self.book.remove(&order_id);
                if let Some(order) = self.orders.get_mut(&order_id) {
                    order.cancel();
                }
                self.orders
                    .get(&order_id)
                    .map(|o| Self::status_update(o, sequence))
            }
        };

        self.commit(
            key,
            ApplyOutcome {
                sequence,
                update,
                fills: Vec::new(),
            },
        )
    }

    fn validate(&self, intent: &types::intent::Intent) -> Result<(), ValidationError> {
        if intent.market != self.market.id {
            return Err(ValidationError::UnknownMarket {
                market: intent.market.clone(),
            });
        }
        self.market.validate(intent.price, intent.quantity)
    }

    fn status_update(order: &Order, sequence: u64) -> OrderStatusUpdate {
        OrderStatusUpdate {
            order_id: order.order_id,
            market: order.market.clone(),
            sequence,
            status: order.status,
            remaining: order.remaining,
        }
    }

    fn commit(&mut self, key: IdempotencyKey, outcome: ApplyOutcome) -> ApplyResult {
        let recorded = CommittedResult {
            sequence: outcome.sequence,
            order_id: outcome
                .update
                .as_ref()
                .map(|u| u.order_id)
                .unwrap_or_default(),
            status: outcome.update.as_ref().map(|u| u.status),
            remaining: outcome
                .update
                .as_ref()
                .map(|u| u.remaining)
                .unwrap_or_else(Quantity::zero),
        };
        self.committed.insert(key, recorded);
        ApplyResult::Applied(outcome)
    }

    /// Capture the serializable state for a snapshot.
    pub fn capture(&self) -> EngineState {
        EngineState {
            orders: self.orders.clone(),
            committed: self.committed.clone(),
            next_sequence: self.next_sequence,
        }
    }

    /// Rebuild an engine from a captured state, reconstructing the book from
    /// the resting orders in arrival-sequence order.
    pub fn restore(market: Market, state: EngineState) -> Self {
        let mut book = Book::new();
        let mut resting: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Open | OrderStatus::PartiallyFilled))
            .collect();
        resting.sort_by_key(|o| o.sequence);
        for order in resting {
            book.insert(order);
        }
        Self {
            market,
            book,
            orders: state.orders,
            committed: state.committed,
            next_sequence: state.next_sequence,
        }
    }
}
