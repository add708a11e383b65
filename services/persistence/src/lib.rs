//! Persistence — durable operation log, snapshots, and crash recovery
//!
//! The append-only log is the source of truth; in-memory book state is a
//! derived cache rebuilt by replaying it. Snapshots only bound replay time.
//!
//! The log and snapshot store are exposed as abstract capabilities
//! (`OperationLog`, `SnapshotStore`) with file-backed implementations, keyed
//! per market so markets never coordinate on shared state.

pub mod determinism;
pub mod journal;
pub mod log;
pub mod reader;
pub mod recovery;
pub mod snapshot;

pub use journal::{FlushPolicy, FsyncPolicy, JournalConfig, JournalError, JournalWriter, LogEntry};
pub use log::{FileOperationLog, FileSnapshotStore, OperationLog, SnapshotStore};
pub use reader::{JournalReader, ReaderError};
pub use recovery::{OperationApplier, RecoveryError, RecoveryReport};
pub use snapshot::{RetentionPolicy, Snapshot, SnapshotError, SnapshotPolicy};
