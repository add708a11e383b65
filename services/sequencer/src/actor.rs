//! Market actor — one thread, one book, total order
//!
//! The actor drains its bounded mailbox one operation at a time. Per
//! operation: check idempotency, assign the next sequence number, append to
//! the durable log (the only blocking I/O on the hot path — nothing is
//! visible downstream until this returns), run the engine, publish the
//! status update and fills under that sequence number, reply to the
//! submitter.
//!
//! A failed log append stops the market: continuing would let effects
//! outrun durability.

use std::sync::Arc;

use matching_engine::engine::{ApplyOutcome, ApplyResult, CommittedResult, MarketEngine};
use matching_engine::events::EngineEvent;
use persistence::journal::LogEntry;
use persistence::log::{OperationLog, SnapshotStore};
use persistence::snapshot::{Snapshot, SnapshotPolicy};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::SubmitError;
use crate::publisher::EventSink;
use types::ids::MarketId;
use types::numeric::{Price, Quantity};
use types::operation::Operation;
use types::order::Side;

/// Acknowledgement delivered to the submitter once its operation commits.
#[derive(Debug)]
pub enum SubmitAck {
    /// The operation was sequenced, logged, and applied.
    Applied(ApplyOutcome),
    /// The idempotency key was already committed; this is the recorded
    /// result of the original delivery. Not an error.
    Duplicate(CommittedResult),
}

/// Aggregated top-of-book copy handed to external readers.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDepth {
    pub market: MarketId,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// Mailbox messages.
pub(crate) enum Command {
    Operation {
        operation: Operation,
        reply: oneshot::Sender<Result<SubmitAck, SubmitError>>,
    },
    /// Copy of the aggregated book, so readers never touch the live one.
    Depth {
        levels: usize,
        reply: oneshot::Sender<BookDepth>,
    },
    /// Flush, snapshot, stop.
    Shutdown { reply: oneshot::Sender<()> },
}

pub(crate) struct MarketActor {
    engine: MarketEngine,
    log: Box<dyn OperationLog>,
    store: Box<dyn SnapshotStore>,
    policy: SnapshotPolicy,
    sink: Arc<dyn EventSink>,
}

impl MarketActor {
    pub(crate) fn new(
        engine: MarketEngine,
        log: Box<dyn OperationLog>,
        store: Box<dyn SnapshotStore>,
        policy: SnapshotPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            engine,
            log,
            store,
            policy,
            sink,
        }
    }

    /// Actor loop. Runs on a dedicated thread until shutdown or a storage
    /// failure.
    pub(crate) fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let market = self.engine.market().id.clone();
        info!(%market, next_sequence = self.engine.next_sequence(), "market actor running");

        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Operation { operation, reply } => {
                    let (ack, fatal) = self.handle_operation(&market, operation);
                    let _ = reply.send(ack);
                    if fatal {
                        error!(%market, "stopping market actor after storage failure");
                        return;
                    }
                }
                Command::Depth { levels, reply } => {
                    let _ = reply.send(BookDepth {
                        market: market.clone(),
                        bids: self.engine.depth_snapshot(Side::Buy, levels),
                        asks: self.engine.depth_snapshot(Side::Sell, levels),
                    });
                }
                Command::Shutdown { reply } => {
                    self.shutdown(&market);
                    let _ = reply.send(());
                    return;
                }
            }
        }
        // All senders dropped: clean up the same way as an explicit stop.
        self.shutdown(&market);
    }

    /// Returns (ack for the submitter, whether the actor must stop).
    fn handle_operation(
        &mut self,
        market: &MarketId,
        operation: Operation,
    ) -> (Result<SubmitAck, SubmitError>, bool) {
        // Redelivery never re-applies: return the recorded result without
        // consuming a sequence number or writing a log entry.
        if let Some(prior) = self.engine.recorded(&operation.key()) {
            debug!(%market, key = %operation.key(), "duplicate operation");
            return (Ok(SubmitAck::Duplicate(prior.clone())), false);
        }

        let sequence = self.engine.next_sequence();
        let timestamp = types::time::now_nanos();

        let entry = match LogEntry::from_operation(sequence, timestamp, &operation) {
            Ok(entry) => entry,
            Err(e) => {
                return (
                    Err(SubmitError::Storage {
                        market: market.clone(),
                        detail: e.to_string(),
                    }),
                    true,
                )
            }
        };
        // Durability point: effects become visible only after this append.
        if let Err(e) = self.log.append(&entry) {
            return (
                Err(SubmitError::Storage {
                    market: market.clone(),
                    detail: e.to_string(),
                }),
                true,
            );
        }

        let outcome = match self.engine.apply(&operation, sequence, timestamp) {
            ApplyResult::Applied(outcome) => outcome,
            // The pre-check makes this unreachable, but redelivery between
            // check and apply resolves the same way.
            ApplyResult::Duplicate(prior) => {
                return (Ok(SubmitAck::Duplicate(prior)), false);
            }
        };

        if let Some(update) = &outcome.update {
            self.sink.publish(EngineEvent::Order(update.clone()));
        }
        for fill in &outcome.fills {
            self.sink.publish(EngineEvent::Fill(fill.clone()));
        }

        if self.policy.should_snapshot(sequence) {
            self.take_snapshot(market, sequence, timestamp);
        }

        (Ok(SubmitAck::Applied(outcome)), false)
    }

    /// Serialize the book state and store it. Snapshot failure is not fatal:
    /// snapshots only bound replay time, the log remains the truth.
    fn take_snapshot(&mut self, market: &MarketId, sequence: u64, timestamp: i64) {
        let state = self.engine.capture();
        let payload = match bincode::serialize(&state) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%market, error = %e, "snapshot serialization failed");
                return;
            }
        };
        let snapshot = Snapshot::new(market.storage_key(), sequence, timestamp, payload);
        match self.store.put(&snapshot) {
            Ok(()) => {
                self.policy.record_snapshot(sequence);
                debug!(%market, sequence, "snapshot written");
            }
            Err(e) => warn!(%market, error = %e, "snapshot write failed"),
        }
    }

    fn shutdown(&mut self, market: &MarketId) {
        if let Err(e) = self.log.sync() {
            error!(%market, error = %e, "final journal sync failed");
        }
        let sequence = self.engine.next_sequence().saturating_sub(1);
        if sequence > 0 {
            self.take_snapshot(market, sequence, types::time::now_nanos());
        }
        info!(%market, sequence, "market actor stopped");
    }
}
