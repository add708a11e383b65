//! Sequenced operations — the durability unit
//!
//! Every state change to a market's book is one of these, appended to the
//! operation log with its assigned sequence number before its effects become
//! visible. The in-memory book is a cache reconstructible by replaying them.

use crate::ids::OrderId;
use crate::intent::{IdempotencyKey, Intent};
use serde::{Deserialize, Serialize};

/// An operation admitted into a market's total order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Admit a structurally valid intent. The order id is assigned at
    /// admission and recorded here so replay reconstructs the same book.
    Admit { order_id: OrderId, intent: Intent },
    /// Cancel a previously admitted order. A benign no-op when the order is
    /// unknown or already terminal.
    Cancel {
        order_id: OrderId,
        key: IdempotencyKey,
    },
}

impl Operation {
    /// Tag stored alongside the serialized payload in log frames.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Admit { .. } => "ADMIT",
            Operation::Cancel { .. } => "CANCEL",
        }
    }

    /// The idempotency key carried by this operation.
    pub fn key(&self) -> IdempotencyKey {
        match self {
            Operation::Admit { intent, .. } => intent.key,
            Operation::Cancel { key, .. } => *key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MarketId, OwnerId};
    use crate::order::Side;

    #[test]
    fn test_operation_kind_tags() {
        let owner = OwnerId::new();
        let admit = Operation::Admit {
            order_id: OrderId::new(),
            intent: Intent {
                market: MarketId::new("BTC/USDC"),
                side: Side::Buy,
                price: "100".parse().unwrap(),
                quantity: "1".parse().unwrap(),
                owner,
                key: IdempotencyKey::new(owner, 1),
                sequence_hint: None,
            },
        };
        let cancel = Operation::Cancel {
            order_id: OrderId::new(),
            key: IdempotencyKey::new(owner, 2),
        };

        assert_eq!(admit.kind(), "ADMIT");
        assert_eq!(cancel.kind(), "CANCEL");
        assert_eq!(admit.key().nonce, 1);
        assert_eq!(cancel.key().nonce, 2);
    }
}
