//! Types library for the intent matching core
//!
//! Shared type definitions used across the matching engine, persistence,
//! and sequencer services. Everything here is deterministic by construction:
//! fixed-point decimals, time-sortable identifiers, and ordered collections.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, FillId, OwnerId, MarketId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `market`: Market definitions and structural validation
//! - `order`: Order lifecycle types
//! - `intent`: Validated upstream intents and idempotency keys
//! - `fill`: Fill (match leg) records
//! - `operation`: Sequenced operations, the durability unit
//! - `errors`: Error taxonomy

pub mod errors;
pub mod fill;
pub mod ids;
pub mod intent;
pub mod market;
pub mod numeric;
pub mod operation;
pub mod order;
pub mod time;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::fill::*;
    pub use crate::ids::*;
    pub use crate::intent::*;
    pub use crate::market::*;
    pub use crate::numeric::*;
    pub use crate::operation::*;
    pub use crate::order::*;
}
