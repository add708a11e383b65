//! Sequencer configuration
//!
//! Plain serde-deserializable structs with defaults; markets are defined
//! here at configuration time and never mutated by the core at runtime.

use persistence::journal::{FlushPolicy, FsyncPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use types::ids::MarketId;
use types::market::Market;
use types::numeric::{Price, Quantity};

/// One market's static definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSpec {
    pub market: MarketId,
    pub tick_size: Price,
    pub lot_size: Quantity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl MarketSpec {
    pub fn to_market(&self) -> Market {
        let mut market = Market::new(self.market.clone(), self.tick_size, self.lot_size);
        market.enabled = self.enabled;
        market
    }
}

/// Top-level configuration for the sequencer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Root directory for journals and snapshots (one subtree per market).
    pub data_dir: PathBuf,
    /// Bounded mailbox size per market; a full mailbox rejects immediately.
    pub queue_capacity: usize,
    /// Snapshot every N applied operations.
    pub snapshot_interval: u64,
    /// Keep the most recent N snapshots per market.
    pub snapshot_retention: usize,
    /// zstd-compress snapshot files.
    pub compress_snapshots: bool,
    pub flush_policy: FlushPolicy,
    pub fsync_policy: FsyncPolicy,
    pub markets: Vec<MarketSpec>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            queue_capacity: 1024,
            snapshot_interval: 100_000,
            snapshot_retention: 3,
            compress_snapshots: false,
            flush_policy: FlushPolicy::EveryWrite,
            fsync_policy: FsyncPolicy::EveryWrite,
            markets: Vec::new(),
        }
    }
}
