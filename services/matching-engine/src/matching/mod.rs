//! Matching logic
//!
//! The crossing predicate and the price-time match loop.

pub mod crossing;
pub mod matcher;

pub use matcher::{match_order, MakerFill, MatchResult};
