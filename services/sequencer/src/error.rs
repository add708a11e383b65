//! Sequencer error taxonomy
//!
//! `Validation` and `QueueSaturated` are expected in normal operation and
//! never crash an actor; storage failures stop the affected market.

use thiserror::Error;
use types::errors::ValidationError;
use types::ids::MarketId;

/// Errors returned to submitters.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Structural validation failed; nothing was sequenced or logged.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The market's mailbox is full. The caller retries; nothing was
    /// accepted.
    #[error("queue saturated for market {market}")]
    QueueSaturated { market: MarketId },

    /// The market's actor is not running (shut down or stopped on a storage
    /// failure).
    #[error("market unavailable: {market}")]
    MarketUnavailable { market: MarketId },

    /// The durable-log append failed; the operation was not applied and the
    /// market actor has stopped.
    #[error("storage failure for market {market}: {detail}")]
    Storage { market: MarketId, detail: String },
}

/// Errors starting the service.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("recovery failed for market {market}: {source}")]
    Recovery {
        market: MarketId,
        #[source]
        source: persistence::RecoveryError,
    },

    #[error("journal open failed for market {market}: {source}")]
    Journal {
        market: MarketId,
        #[source]
        source: persistence::ReaderError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
