//! Event publication
//!
//! The core emits status updates and fills per applied operation and never
//! blocks on downstream consumption. `BroadcastSink` fans out on a tokio
//! broadcast channel: slow subscribers lag and drop, then catch up by
//! sequence number from the audit stream.

use matching_engine::events::EngineEvent;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// Publication interface. Implementations must not block the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Fan-out to any number of subscribers over a bounded broadcast channel.
pub struct BroadcastSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: EngineEvent) {
        trace!(sequence = event.sequence(), market = %event.market(), "publish");
        // No subscribers is fine; events are durable in the log regardless.
        let _ = self.tx.send(event);
    }
}

/// Collects events in memory; test support.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collected(&self) -> Vec<EngineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn fills(&self) -> Vec<types::fill::Fill> {
        self.collected()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Fill(fill) => Some(fill),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching_engine::events::OrderStatusUpdate;
    use types::ids::{MarketId, OrderId};
    use types::numeric::Quantity;
    use types::order::OrderStatus;

    fn update(seq: u64) -> EngineEvent {
        EngineEvent::Order(OrderStatusUpdate {
            order_id: OrderId::new(),
            market: MarketId::new("BTC/USDC"),
            sequence: seq,
            status: OrderStatus::Open,
            remaining: Quantity::from_u64(1),
        })
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_block() {
        let sink = BroadcastSink::new(8);
        for seq in 1..=100 {
            sink.publish(update(seq));
        }
    }

    #[tokio::test]
    async fn test_broadcast_delivers_in_order() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        for seq in 1..=5 {
            sink.publish(update(seq));
        }
        for expected in 1..=5 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.sequence(), expected);
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_drops_not_blocks() {
        let sink = BroadcastSink::new(4);
        let mut rx = sink.subscribe();

        // Overflow the channel; the publisher never blocks.
        for seq in 1..=20 {
            sink.publish(update(seq));
        }

        // The lagged subscriber gets an error, then the retained tail.
        let result = rx.recv().await;
        assert!(matches!(
            result,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        let event = rx.recv().await.unwrap();
        assert!(event.sequence() > 1);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.publish(update(1));
        sink.publish(update(2));
        assert_eq!(sink.collected().len(), 2);
        assert!(sink.fills().is_empty());
    }
}
