//! Service assembly — recover every market, then start its actor
//!
//! Startup sequence per market: open the journal and snapshot store, run
//! recovery (snapshot restore + ordered replay with emission suppressed),
//! then hand the rebuilt engine to a dedicated actor thread. A market only
//! accepts operations once its derived state matches what live processing
//! would have produced.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::actor::MarketActor;
use crate::config::SequencerConfig;
use crate::error::StartError;
use crate::publisher::EventSink;
use crate::recovery::EngineApplier;
use crate::router::{MarketHandle, Router};
use persistence::journal::JournalConfig;
use persistence::log::{FileOperationLog, FileSnapshotStore};
use persistence::recovery::recover;
use persistence::snapshot::{RetentionPolicy, SnapshotPolicy};

/// The assembled matching core: a router over recovered, running markets.
pub struct Sequencer {
    router: Router,
}

impl Sequencer {
    /// Recover all configured markets and start their actors.
    pub fn start(config: SequencerConfig, sink: Arc<dyn EventSink>) -> Result<Self, StartError> {
        let mut markets = BTreeMap::new();

        for spec in &config.markets {
            let market = spec.to_market();
            let market_id = market.id.clone();
            let key = market_id.storage_key();

            // The log re-roots the directory under its market key.
            let journal_config = JournalConfig {
                flush_policy: config.flush_policy,
                fsync_policy: config.fsync_policy,
                ..JournalConfig::new(&config.data_dir)
            };
            let log =
                FileOperationLog::open_with_config(&config.data_dir, &key, journal_config)
                    .map_err(|source| StartError::Journal {
                        market: market_id.clone(),
                        source,
                    })?;
            let store = FileSnapshotStore::open(&config.data_dir, &key, config.compress_snapshots)
                .with_retention(RetentionPolicy::new(config.snapshot_retention));

            let mut applier = EngineApplier::new(market.clone());
            let report = recover(&log, &store, &mut applier, None).map_err(|source| {
                StartError::Recovery {
                    market: market_id.clone(),
                    source,
                }
            })?;
            info!(
                market = %market_id,
                snapshot_sequence = report.snapshot_sequence,
                replayed = report.replayed,
                final_sequence = report.final_sequence,
                "market recovered"
            );

            let actor = MarketActor::new(
                applier.into_engine(),
                Box::new(log),
                Box::new(store),
                SnapshotPolicy::with_interval(config.snapshot_interval),
                sink.clone(),
            );
            let (tx, rx) = mpsc::channel(config.queue_capacity);
            let thread = std::thread::Builder::new()
                .name(format!("market-{}", key))
                .spawn(move || actor.run(rx))?;

            markets.insert(
                market_id,
                MarketHandle {
                    market,
                    tx,
                    thread: Some(thread),
                },
            );
        }

        Ok(Self {
            router: Router::new(markets),
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Clean shutdown: every actor flushes its journal, writes a final
    /// snapshot, and stops.
    pub fn shutdown(mut self) {
        self.router.shutdown();
    }
}
