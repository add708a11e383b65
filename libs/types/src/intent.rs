//! Validated upstream intents and idempotency keys
//!
//! An intent is a signed, off-chain expression of a trading order. By the
//! time it reaches the core its signature has been verified; the core only
//! performs structural validation.

use crate::ids::{MarketId, OwnerId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied deduplication key: the signing identity plus a nonce.
///
/// Redelivery of an already-committed key returns the recorded result instead
/// of applying the operation a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub signer: OwnerId,
    pub nonce: u64,
}

impl IdempotencyKey {
    pub fn new(signer: OwnerId, nonce: u64) -> Self {
        Self { signer, nonce }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.signer, self.nonce)
    }
}

/// A trading intent as delivered by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub market: MarketId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub owner: OwnerId,
    pub key: IdempotencyKey,
    /// Where the gateway believed the market's sequence stood at submission.
    /// Advisory only: the actor assigns the authoritative sequence number.
    #[serde(default)]
    pub sequence_hint: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_equality() {
        let signer = OwnerId::new();
        let a = IdempotencyKey::new(signer, 42);
        let b = IdempotencyKey::new(signer, 42);
        let c = IdempotencyKey::new(signer, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_intent_serialization_roundtrip() {
        let intent = Intent {
            market: MarketId::new("ETH/USDC"),
            side: Side::Sell,
            price: "3000.50".parse().unwrap(),
            quantity: "2.5".parse().unwrap(),
            owner: OwnerId::new(),
            key: IdempotencyKey::new(OwnerId::new(), 9),
            sequence_hint: None,
        };

        let json = serde_json::to_string(&intent).unwrap();
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(intent, back);
    }
}
