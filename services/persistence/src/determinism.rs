//! Determinism verification — double replay comparison
//!
//! Replaying the same log twice from the same snapshot must produce
//! bit-identical state. Divergence means non-determinism crept into the
//! apply path (iteration order, clock reads, floating point) and the
//! replay-based recovery guarantee is void.

use crate::log::{OperationLog, SnapshotStore};
use crate::recovery::{recover, OperationApplier, RecoveryError};

/// Result of comparing two replay runs.
#[derive(Debug, Clone)]
pub struct DivergenceReport {
    pub hash_a: String,
    pub hash_b: String,
    pub replayed: u64,
}

impl DivergenceReport {
    pub fn is_match(&self) -> bool {
        self.hash_a == self.hash_b
    }
}

/// Run recovery twice with independently constructed appliers and compare
/// the resulting state hashes.
pub fn verify_double_replay<A, F>(
    log: &impl OperationLog,
    store: &impl SnapshotStore,
    mut make_applier: F,
) -> Result<DivergenceReport, RecoveryError>
where
    A: OperationApplier,
    F: FnMut() -> A,
{
    let mut applier_a = make_applier();
    let report_a = recover(log, store, &mut applier_a, None)?;

    let mut applier_b = make_applier();
    let report_b = recover(log, store, &mut applier_b, None)?;

    Ok(DivergenceReport {
        hash_a: report_a.state_hash,
        hash_b: report_b.state_hash,
        replayed: report_b.replayed,
    })
}

/// Compare two recorded entry streams (for example, a re-read of the same
/// journal) for exact equality.
pub fn entry_streams_match(
    a: &[crate::journal::LogEntry],
    b: &[crate::journal::LogEntry],
) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}
