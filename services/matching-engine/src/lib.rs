//! Matching engine — per-market order book, matcher, and engine state
//!
//! One `MarketEngine` per market, owned by exactly one sequential processing
//! unit. Applying the same sequenced operations to the same starting state
//! always produces the same book and the same fills; that determinism is what
//! replay-based recovery relies on.

pub mod book;
pub mod engine;
pub mod events;
pub mod matching;

pub use book::Book;
pub use engine::{ApplyOutcome, ApplyResult, CommittedResult, EngineState, MarketEngine};
pub use events::{EngineEvent, OrderStatusUpdate};
