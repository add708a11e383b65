//! Crossing detection
//!
//! Determines when an incoming order is marketable against a resting price.

use types::numeric::Price;
use types::order::Side;

/// Check if a bid and an ask can match: bid >= ask.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order crosses a resting price on the opposite side.
pub fn crosses(incoming_side: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming_side {
        Side::Buy => incoming_price >= resting_price,
        Side::Sell => incoming_price <= resting_price,
    }
}
