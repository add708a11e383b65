//! Sequencer — per-market actors behind a validating router
//!
//! Each market owns exactly one processing thread; operations for a market
//! are totally ordered by its actor and applied one at a time, so the
//! matcher never needs locks. The router is the only multi-producer
//! structure: a bounded mailbox per market with fail-fast backpressure.
//!
//! Within a market: arrival order = sequence order = log order = apply
//! order = publication order. Across markets, nothing is guaranteed.

pub mod actor;
pub mod config;
pub mod error;
pub mod publisher;
pub mod recovery;
pub mod router;
pub mod service;

pub use actor::{BookDepth, SubmitAck};
pub use config::{MarketSpec, SequencerConfig};
pub use error::{StartError, SubmitError};
pub use publisher::{BroadcastSink, EventSink, MemorySink};
pub use router::{Pending, Router};
pub use service::Sequencer;
