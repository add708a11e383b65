//! Router — validated intents into per-market mailboxes
//!
//! The single structure touched by multiple producers. Looks up the market,
//! performs structural validation synchronously, assigns the order id, and
//! hands the operation to the market's bounded mailbox with `try_send`: a
//! full mailbox is an immediate `QueueSaturated`, never an indefinite block.

use std::collections::BTreeMap;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::actor::{BookDepth, Command, SubmitAck};
use crate::error::SubmitError;
use types::errors::ValidationError;
use types::ids::{MarketId, OrderId};
use types::intent::{IdempotencyKey, Intent};
use types::market::Market;
use types::operation::Operation;

/// One market's entry in the routing table.
pub(crate) struct MarketHandle {
    pub(crate) market: Market,
    pub(crate) tx: mpsc::Sender<Command>,
    pub(crate) thread: Option<JoinHandle<()>>,
}

/// A submitted operation awaiting its actor's acknowledgement.
///
/// The submission itself already succeeded (the operation is in the
/// market's total order); this resolves once it is logged and applied.
pub struct Pending {
    pub order_id: OrderId,
    reply: oneshot::Receiver<Result<SubmitAck, SubmitError>>,
}

impl Pending {
    pub(crate) fn new(
        order_id: OrderId,
        reply: oneshot::Receiver<Result<SubmitAck, SubmitError>>,
    ) -> Self {
        Self { order_id, reply }
    }

    /// Block until the operation commits. For use off the async runtime.
    pub fn wait(self, market: &MarketId) -> Result<SubmitAck, SubmitError> {
        match self.reply.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(SubmitError::MarketUnavailable {
                market: market.clone(),
            }),
        }
    }

    /// Await the commit from async code.
    pub async fn resolved(self, market: &MarketId) -> Result<SubmitAck, SubmitError> {
        match self.reply.await {
            Ok(result) => result,
            Err(_) => Err(SubmitError::MarketUnavailable {
                market: market.clone(),
            }),
        }
    }
}

/// Maps intents to their market's actor; enforces one writer per market.
pub struct Router {
    markets: BTreeMap<MarketId, MarketHandle>,
}

impl Router {
    pub(crate) fn new(markets: BTreeMap<MarketId, MarketHandle>) -> Self {
        Self { markets }
    }

    /// Submit a new-order intent.
    ///
    /// Validation failures and backpressure are reported synchronously; the
    /// returned `Pending` resolves once the operation is durable and applied.
    pub fn submit(&self, intent: Intent) -> Result<Pending, SubmitError> {
        let handle = self.lookup(&intent.market)?;
        handle.market.validate(intent.price, intent.quantity)?;

        let order_id = OrderId::new();
        let operation = Operation::Admit { order_id, intent };
        let reply = self.dispatch(handle, operation)?;
        Ok(Pending::new(order_id, reply))
    }

    /// Submit a cancel request. Unknown or already-terminal orders resolve
    /// as benign no-ops, not errors.
    pub fn cancel(
        &self,
        market: &MarketId,
        order_id: OrderId,
        key: IdempotencyKey,
    ) -> Result<Pending, SubmitError> {
        let handle = self.lookup(market)?;
        let operation = Operation::Cancel { order_id, key };
        let reply = self.dispatch(handle, operation)?;
        Ok(Pending::new(order_id, reply))
    }

    /// Aggregated depth copy for external readers.
    pub fn depth(&self, market: &MarketId, levels: usize) -> Result<BookDepth, SubmitError> {
        let handle = self.lookup(market)?;
        let (reply, rx) = oneshot::channel();
        handle
            .tx
            .try_send(Command::Depth { levels, reply })
            .map_err(|e| Self::send_error(market, e))?;
        rx.blocking_recv()
            .map_err(|_| SubmitError::MarketUnavailable {
                market: market.clone(),
            })
    }

    pub fn market_ids(&self) -> impl Iterator<Item = &MarketId> {
        self.markets.keys()
    }

    /// Stop every market actor: flush, snapshot, join.
    pub(crate) fn shutdown(&mut self) {
        for (market, handle) in self.markets.iter_mut() {
            let (reply, rx) = oneshot::channel();
            if handle.tx.try_send(Command::Shutdown { reply }).is_ok() {
                let _ = rx.blocking_recv();
            }
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    warn!(%market, "market actor thread panicked");
                }
            }
        }
    }

    // ── Internal ────────────────────────────────────────────────────

    fn lookup(&self, market: &MarketId) -> Result<&MarketHandle, SubmitError> {
        self.markets
            .get(market)
            .ok_or_else(|| ValidationError::UnknownMarket {
                market: market.clone(),
            })
            .map_err(SubmitError::from)
    }

    fn dispatch(
        &self,
        handle: &MarketHandle,
        operation: Operation,
    ) -> Result<oneshot::Receiver<Result<SubmitAck, SubmitError>>, SubmitError> {
        let (reply, rx) = oneshot::channel();
        handle
            .tx
            .try_send(Command::Operation { operation, reply })
            .map_err(|e| Self::send_error(&handle.market.id, e))?;
        Ok(rx)
    }

    fn send_error(market: &MarketId, error: mpsc::error::TrySendError<Command>) -> SubmitError {
        match error {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueSaturated {
                market: market.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => SubmitError::MarketUnavailable {
                market: market.clone(),
            },
        }
    }
}
