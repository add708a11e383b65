//! Bid (buy-side) book half
//!
//! Price levels in a BTreeMap so iteration order is deterministic; the best
//! bid is the highest key.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::{PriceLevel, RestingOrder};

#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, price: Price, entry: RestingOrder) {
        self.levels.entry(price).or_default().push(entry);
    }

    /// Remove an order at a known price, dropping the level if emptied.
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<RestingOrder> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// Best bid (highest price) with its total level quantity.
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    pub fn best_level(&self) -> Option<(Price, &PriceLevel)> {
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level))
    }

    /// Reduce the front order of the best level, dropping the level when it
    /// empties.
    pub fn consume_front(&mut self, quantity: Quantity) -> Option<(OrderId, Quantity)> {
        let (price, level) = self.levels.iter_mut().next_back()?;
        let price = *price;
        let consumed = level.consume_front(quantity)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(consumed)
    }

    /// Top-N levels, best first.
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
