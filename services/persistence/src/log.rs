//! Abstract storage capabilities and their file-backed implementations
//!
//! The core requires exactly two capabilities from its environment: an
//! append-only operation log and a keyed snapshot store. Both are traits so
//! the concrete backend stays outside the core's concern; the file-backed
//! implementations here key everything per market under a shared root
//! directory, which keeps markets isolated without cross-market coordination.

use crate::journal::{JournalConfig, JournalError, JournalWriter, LogEntry};
use crate::reader::{JournalReader, ReaderError};
use crate::snapshot::{RetentionPolicy, Snapshot, SnapshotError, SnapshotLoader, SnapshotWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only durable log, keyed by market at construction time.
pub trait OperationLog: Send {
    /// Append one entry. The append is durable (per the configured fsync
    /// policy) when this returns.
    fn append(&mut self, entry: &LogEntry) -> Result<(), JournalError>;

    /// Every entry with `sequence >= from`, in order.
    fn read_from(&self, from: u64) -> Result<Vec<LogEntry>, ReaderError>;

    /// Force outstanding writes to disk.
    fn sync(&mut self) -> Result<(), JournalError>;
}

/// Keyed snapshot store, keyed by market at construction time.
pub trait SnapshotStore: Send {
    fn put(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
    fn latest(&self) -> Result<Option<Snapshot>, SnapshotError>;
}

// ── File-backed operation log ───────────────────────────────────────

/// Journal-file log under `<root>/<market_key>/journal/`.
pub struct FileOperationLog {
    dir: PathBuf,
    writer: JournalWriter,
}

impl FileOperationLog {
    /// Open (or create) the log for one market. Scans existing files so the
    /// writer continues at the next sequence after a restart.
    pub fn open(root: &Path, market_key: &str) -> Result<Self, ReaderError> {
        let dir = root.join(market_key).join("journal");
        let mut writer = JournalWriter::open(JournalConfig::new(&dir))?;

        let mut reader = JournalReader::open(&dir)?;
        while reader.next_entry()?.is_some() {}
        if let Some(last) = reader.last_sequence() {
            writer.set_next_sequence(last + 1);
            debug!(market_key, last, "continuing existing journal");
        }

        Ok(Self { dir, writer })
    }

    /// Open with a custom journal configuration rooted at the market dir.
    pub fn open_with_config(
        root: &Path,
        market_key: &str,
        mut config: JournalConfig,
    ) -> Result<Self, ReaderError> {
        let dir = root.join(market_key).join("journal");
        config.dir = dir.clone();
        let mut writer = JournalWriter::open(config)?;

        let mut reader = JournalReader::open(&dir)?;
        while reader.next_entry()?.is_some() {}
        if let Some(last) = reader.last_sequence() {
            writer.set_next_sequence(last + 1);
        }

        Ok(Self { dir, writer })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OperationLog for FileOperationLog {
    fn append(&mut self, entry: &LogEntry) -> Result<(), JournalError> {
        self.writer.append(entry)
    }

    fn read_from(&self, from: u64) -> Result<Vec<LogEntry>, ReaderError> {
        let mut reader = JournalReader::open(&self.dir)?;
        reader.read_from(from)
    }

    fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.sync()
    }
}

// ── File-backed snapshot store ──────────────────────────────────────

/// Snapshot files under `<root>/<market_key>/snapshots/`, with retention.
pub struct FileSnapshotStore {
    dir: PathBuf,
    writer: SnapshotWriter,
    loader: SnapshotLoader,
    retention: RetentionPolicy,
}

impl FileSnapshotStore {
    pub fn open(root: &Path, market_key: &str, compress: bool) -> Self {
        let dir = root.join(market_key).join("snapshots");
        Self {
            writer: SnapshotWriter::new(&dir, compress),
            loader: SnapshotLoader::new(&dir),
            retention: RetentionPolicy::default(),
            dir,
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn put(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.writer.write(snapshot)?;
        self.retention.cleanup(&self.dir)?;
        Ok(())
    }

    fn latest(&self) -> Result<Option<Snapshot>, SnapshotError> {
        self.loader.load_latest()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
