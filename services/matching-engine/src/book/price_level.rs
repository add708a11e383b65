//! Price level with a FIFO queue of resting orders
//!
//! A level holds every resting order at one price, in arrival-sequence
//! order. Time priority within a level is exactly queue position: a
//! partially filled maker keeps the front, and nothing ever reorders.

use std::collections::VecDeque;
use types::ids::{OrderId, OwnerId};
use types::numeric::Quantity;

/// One resting order's entry in a level queue.
#[derive(Debug, Clone, PartialEq)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub owner: OwnerId,
    /// Arrival sequence number; strictly increasing along the queue.
    pub sequence: u64,
    pub remaining: Quantity,
}

/// FIFO queue of resting orders at a single price.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<RestingOrder>,
    total: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back of the queue (time priority).
    pub fn push(&mut self, entry: RestingOrder) {
        self.total = self.total + entry.remaining;
        self.orders.push_back(entry);
    }

    /// Remove an order anywhere in the queue by id.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let position = self.orders.iter().position(|e| &e.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total = self
            .total
            .checked_sub(entry.remaining)
            .unwrap_or_else(Quantity::zero);
        Some(entry)
    }

    /// Peek at the front order without removing it.
    pub fn front(&self) -> Option<&RestingOrder> {
        self.orders.front()
    }

    /// Reduce the front order by `quantity`, removing it at zero.
    ///
    /// Returns the front order's id and its remaining quantity after the
    /// reduction. Returns None if the level is empty or `quantity` exceeds
    /// the front order's remaining (which would make a level total negative).
    pub fn consume_front(&mut self, quantity: Quantity) -> Option<(OrderId, Quantity)> {
        let front = self.orders.front_mut()?;
        let remaining = front.remaining.checked_sub(quantity)?;
        let order_id = front.order_id;

        front.remaining = remaining;
        self.total = self
            .total
            .checked_sub(quantity)
            .unwrap_or_else(Quantity::zero);

        if remaining.is_zero() {
            self.orders.pop_front();
        }
        Some((order_id, remaining))
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Total remaining quantity across the queue.
    pub fn total_quantity(&self) -> Quantity {
        self.total
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64, qty: &str) -> RestingOrder {
        RestingOrder {
            order_id: OrderId::new(),
            owner: OwnerId::new(),
            sequence: seq,
            remaining: qty.parse().unwrap(),
        }
    }

    #[test]
    fn test_push_tracks_total() {
        let mut level = PriceLevel::new();
        level.push(entry(1, "1.5"));
        level.push(entry(2, "2.5"));
        level.push(entry(3, "3.0"));

        assert_eq!(level.order_count(), 3);
        assert_eq!(level.total_quantity(), "7.0".parse().unwrap());
    }

    #[test]
    fn test_fifo_front_is_lowest_sequence() {
        let mut level = PriceLevel::new();
        let first = entry(10, "1");
        let first_id = first.order_id;
        level.push(first);
        level.push(entry(11, "2"));

        assert_eq!(level.front().unwrap().order_id, first_id);
        assert_eq!(level.front().unwrap().sequence, 10);
    }

    #[test]
    fn test_remove_mid_queue() {
        let mut level = PriceLevel::new();
        let a = entry(1, "1");
        let b = entry(2, "2");
        let b_id = b.order_id;
        let c = entry(3, "3");
        level.push(a);
        level.push(b);
        level.push(c);

        let removed = level.remove(&b_id).unwrap();
        assert_eq!(removed.remaining, "2".parse().unwrap());
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), "4".parse().unwrap());
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut level = PriceLevel::new();
        level.push(entry(1, "1"));
        assert!(level.remove(&OrderId::new()).is_none());
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_consume_front_partial() {
        let mut level = PriceLevel::new();
        level.push(entry(1, "5"));

        let (_, remaining) = level.consume_front("2".parse().unwrap()).unwrap();
        assert_eq!(remaining, "3".parse().unwrap());
        assert_eq!(level.total_quantity(), "3".parse().unwrap());
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_consume_front_exact_removes_order() {
        let mut level = PriceLevel::new();
        level.push(entry(1, "5"));
        level.push(entry(2, "7"));

        let (_, remaining) = level.consume_front("5".parse().unwrap()).unwrap();
        assert!(remaining.is_zero());
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.front().unwrap().sequence, 2);
        assert_eq!(level.total_quantity(), "7".parse().unwrap());
    }

    #[test]
    fn test_consume_front_rejects_oversize() {
        let mut level = PriceLevel::new();
        level.push(entry(1, "5"));
        assert!(level.consume_front("6".parse().unwrap()).is_none());
        // Untouched on failure.
        assert_eq!(level.total_quantity(), "5".parse().unwrap());
    }

    #[test]
    fn test_consume_front_empty_level() {
        let mut level = PriceLevel::new();
        assert!(level.consume_front("1".parse().unwrap()).is_none());
    }
}
