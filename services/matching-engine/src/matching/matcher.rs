//! Price-time match loop
//!
//! A pure function over one market's book and one incoming order: walks the
//! opposite side while the order is marketable, consuming FIFO heads at the
//! best level and emitting one fill per leg at the maker's limit price.

use crate::book::Book;
use crate::matching::crossing;
use types::fill::Fill;
use types::ids::OrderId;
use types::numeric::Quantity;
use types::order::Order;

/// A maker-side quantity change produced by the loop; the engine applies it
/// to the maker's order record.
#[derive(Debug, Clone, PartialEq)]
pub struct MakerFill {
    pub order_id: OrderId,
    /// Quantity consumed from the maker by this taker.
    pub filled: Quantity,
    /// Maker's remaining quantity after the fill (zero means fully filled
    /// and removed from its level).
    pub remaining: Quantity,
}

/// Output of one match loop run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    pub fills: Vec<Fill>,
    pub maker_fills: Vec<MakerFill>,
    /// True when matching stopped because the front maker belongs to the
    /// taker's owner; the engine cancels the taker's remainder.
    pub blocked_self_trade: bool,
}

/// Match `taker` against the opposite side of `book`.
///
/// Mutates the book (consuming maker quantity, dropping emptied levels) and
/// the taker (remaining + status via `apply_fill`). Does NOT insert the
/// remainder; resting is the engine's decision.
pub fn match_order(book: &mut Book, taker: &mut Order, timestamp: i64) -> MatchResult {
    let mut result = MatchResult::default();
    let opposite = taker.side.opposite();

    while !taker.remaining.is_zero() {
        let Some(best_price) = book.best_price(opposite) else {
            break;
        };
        if !crossing::crosses(taker.side, taker.price, best_price) {
            break;
        }
        let Some(front) = book.front_of_best(opposite) else {
            break;
        };
        if front.owner == taker.owner {
            result.blocked_self_trade = true;
            break;
        }

        let maker_owner = front.owner;
        let trade_qty = taker.remaining.min(front.remaining);
        let Some((maker_order_id, maker_remaining)) = book.consume_front(opposite, trade_qty)
        else {
            break;
        };

        result.fills.push(Fill::new(
            taker.market.clone(),
            maker_order_id,
            taker.order_id,
            maker_owner,
            taker.owner,
            best_price,
            trade_qty,
            taker.sequence,
            timestamp,
        ));
        result.maker_fills.push(MakerFill {
            order_id: maker_order_id,
            filled: trade_qty,
            remaining: maker_remaining,
        });
        taker.apply_fill(trade_qty);
    }

    result
}
