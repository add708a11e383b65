//! Append-only operation journal with per-frame checksums
//!
//! # Binary format (per entry)
//! ```text
//! [total_len: u32]
//! [sequence:  u64]
//! [timestamp: i64]
//! [kind_len: u16][kind: bytes]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence+timestamp+kind+payload
//! ```
//!
//! Appends must be durable (per the configured fsync policy) before an
//! operation's effects become visible downstream.

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::operation::Operation;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("sequence error: expected {expected}, got {got}")]
    SequenceError { expected: u64, got: u64 },
}

// ── Log Entry ───────────────────────────────────────────────────────

/// One persisted operation: the durability unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Per-market monotonic sequence number.
    pub sequence: u64,
    /// Unix nanos at commit time; replay reuses this value.
    pub timestamp: i64,
    /// Operation kind tag ("ADMIT", "CANCEL"), for diagnostics and tooling.
    pub kind: String,
    /// Bincode-serialized `Operation`.
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ kind ++ payload).
    pub checksum: u32,
}

impl LogEntry {
    /// Create an entry, computing the checksum.
    pub fn new(sequence: u64, timestamp: i64, kind: String, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &kind, &payload);
        Self {
            sequence,
            timestamp,
            kind,
            payload,
            checksum,
        }
    }

    /// Serialize an operation into an entry.
    pub fn from_operation(
        sequence: u64,
        timestamp: i64,
        operation: &Operation,
    ) -> Result<Self, JournalError> {
        let payload = bincode::serialize(operation)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        Ok(Self::new(
            sequence,
            timestamp,
            operation.kind().to_string(),
            payload,
        ))
    }

    /// Decode the operation carried in the payload.
    pub fn operation(&self) -> Result<Operation, JournalError> {
        bincode::deserialize(&self.payload).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    pub fn compute_checksum(sequence: u64, timestamp: i64, kind: &str, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(8 + 8 + kind.len() + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(kind.as_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        let expected =
            Self::compute_checksum(self.sequence, self.timestamp, &self.kind, &self.payload);
        self.checksum == expected
    }

    /// Serialize to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let kind_bytes = self.kind.as_bytes();
        let kind_len = kind_bytes.len() as u16;
        let payload_len = self.payload.len() as u32;

        // body = 8 (seq) + 8 (ts) + 2 (kind_len) + kind + 4 (pl_len) + pl + 4 (crc)
        let body_len: u32 = 8 + 8 + 2 + (kind_len as u32) + 4 + payload_len + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&kind_len.to_le_bytes());
        buf.extend_from_slice(kind_bytes);
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize from the binary wire format.
    ///
    /// Returns `(entry, bytes_consumed)`; corrupted or truncated input is an
    /// error, never a panic.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        if data.len() < 4 {
            return Err(JournalError::Serialization(
                "not enough data for length prefix".into(),
            ));
        }

        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        // Reject implausible lengths early (likely corruption).
        if body_len > 100_000_000 {
            return Err(JournalError::Serialization(format!(
                "implausible body length: {}",
                body_len
            )));
        }

        let total = 4 + body_len;
        if data.len() < total {
            return Err(JournalError::Serialization(format!(
                "incomplete entry: need {} bytes, have {}",
                total,
                data.len()
            )));
        }

        // Minimum body: 8 + 8 + 2 + 0 + 4 + 0 + 4 = 26
        if body_len < 26 {
            return Err(JournalError::Serialization(format!(
                "body too small: {} bytes",
                body_len
            )));
        }

        let body = &data[4..total];
        let mut pos: usize = 0;

        let sequence = u64::from_le_bytes(body[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let timestamp = i64::from_le_bytes(body[pos..pos + 8].try_into().unwrap());
        pos += 8;

        let kind_len = u16::from_le_bytes(body[pos..pos + 2].try_into().unwrap()) as usize;
        pos += 2;
        if pos + kind_len > body.len() {
            return Err(JournalError::Serialization(format!(
                "kind_len {} exceeds remaining body",
                kind_len
            )));
        }
        let kind = String::from_utf8(body[pos..pos + kind_len].to_vec())
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        pos += kind_len;

        if pos + 4 > body.len() {
            return Err(JournalError::Serialization(
                "not enough data for payload length".into(),
            ));
        }
        let payload_len = u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if pos + payload_len > body.len() {
            return Err(JournalError::Serialization(format!(
                "payload_len {} exceeds remaining body",
                payload_len
            )));
        }
        let payload = body[pos..pos + payload_len].to_vec();
        pos += payload_len;

        if pos + 4 > body.len() {
            return Err(JournalError::Serialization(
                "not enough data for checksum".into(),
            ));
        }
        let checksum = u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap());

        Ok((
            Self {
                sequence,
                timestamp,
                kind,
                payload,
                checksum,
            },
            total,
        ))
    }
}

// ── Flush / Fsync Policies ──────────────────────────────────────────

/// Controls when buffered data is flushed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FlushPolicy {
    EveryWrite,
    EveryN(usize),
}

/// Controls when `fsync` is called.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FsyncPolicy {
    EveryWrite,
    EveryN(usize),
    OnRotation,
}

// ── Journal Writer Configuration ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory for journal files.
    pub dir: PathBuf,
    /// Maximum file size in bytes before rotation.
    pub max_file_size: u64,
    pub flush_policy: FlushPolicy,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024, // 64 MiB
            flush_policy: FlushPolicy::EveryWrite,
            fsync_policy: FsyncPolicy::EveryWrite,
        }
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

/// Append-only journal writer with checksums, rotation, and fsync control.
pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    /// Next expected sequence; None until the first append or an explicit
    /// `set_next_sequence` after recovery.
    next_sequence: Option<u64>,
    writes_since_flush: usize,
    writes_since_fsync: usize,
    file_index: u64,
}

impl JournalWriter {
    /// Open a writer, creating the directory if needed and continuing the
    /// highest-numbered existing file.
    pub fn open(config: JournalConfig) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = Self::find_latest_index(&config.dir);
        let current_file = Self::journal_path(&config.dir, file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;
        let current_file_size = file.metadata()?.len();

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size,
            next_sequence: None,
            writes_since_flush: 0,
            writes_since_fsync: 0,
            file_index,
        })
    }

    /// Set the next expected sequence number (used after recovery).
    pub fn set_next_sequence(&mut self, seq: u64) {
        self.next_sequence = Some(seq);
    }

    pub fn next_sequence(&self) -> Option<u64> {
        self.next_sequence
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    /// Append an entry, validating sequence monotonicity.
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), JournalError> {
        if let Some(expected) = self.next_sequence {
            if entry.sequence != expected {
                return Err(JournalError::SequenceError {
                    expected,
                    got: entry.sequence,
                });
            }
        }

        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let bytes = entry.to_bytes();
        self.writer.write_all(&bytes)?;

        self.current_file_size += bytes.len() as u64;
        self.next_sequence = Some(entry.sequence + 1);
        self.writes_since_flush += 1;
        self.writes_since_fsync += 1;

        self.apply_flush_policy()?;
        self.apply_fsync_policy()?;
        Ok(())
    }

    /// Force flush + fsync (used before shutdown / snapshot).
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_flush = 0;
        self.writes_since_fsync = 0;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn apply_flush_policy(&mut self) -> Result<(), JournalError> {
        let should_flush = match self.config.flush_policy {
            FlushPolicy::EveryWrite => true,
            FlushPolicy::EveryN(n) => self.writes_since_flush >= n,
        };
        if should_flush {
            self.writer.flush()?;
            self.writes_since_flush = 0;
        }
        Ok(())
    }

    fn apply_fsync_policy(&mut self) -> Result<(), JournalError> {
        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::OnRotation => false,
        };
        if should_fsync {
            self.writer.flush()?;
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;

        self.file_index += 1;
        self.current_file = Self::journal_path(&self.config.dir, self.file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;
        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        Ok(())
    }

    pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("journal-{:06}.bin", index))
    }

    pub(crate) fn find_latest_index(dir: &Path) -> u64 {
        fs::read_dir(dir)
            .ok()
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let name = e.file_name().to_string_lossy().to_string();
                        name.strip_prefix("journal-")
                            .and_then(|n| n.strip_suffix(".bin"))
                            .and_then(|n| n.parse::<u64>().ok())
                    })
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry(seq: u64) -> LogEntry {
        LogEntry::new(
            seq,
            1_708_123_456_789_000_000 + seq as i64,
            "ADMIT".to_string(),
            vec![1, 2, 3, 4, 5],
        )
    }

    #[test]
    fn test_checksum_roundtrip() {
        let entry = sample_entry(1);
        assert!(entry.verify_checksum());
    }

    #[test]
    fn test_checksum_detects_tamper() {
        let mut entry = sample_entry(1);
        entry.payload = vec![9, 9, 9];
        assert!(!entry.verify_checksum());
    }

    #[test]
    fn test_wire_format_roundtrip() {
        let entry = sample_entry(42);
        let bytes = entry.to_bytes();
        let (decoded, consumed) = LogEntry::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(entry, decoded);
    }

    #[test]
    fn test_from_bytes_rejects_truncation() {
        let entry = sample_entry(1);
        let bytes = entry.to_bytes();
        assert!(LogEntry::from_bytes(&bytes[..bytes.len() - 3]).is_err());
        assert!(LogEntry::from_bytes(&bytes[..2]).is_err());
    }

    #[test]
    fn test_append_advances_sequence() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        writer.set_next_sequence(1);

        for seq in 1..=100 {
            writer.append(&sample_entry(seq)).unwrap();
        }
        assert_eq!(writer.next_sequence(), Some(101));
    }

    #[test]
    fn test_append_rejects_gap() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        writer.set_next_sequence(1);

        writer.append(&sample_entry(1)).unwrap();
        match writer.append(&sample_entry(5)) {
            Err(JournalError::SequenceError { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 5);
            }
            other => panic!("expected sequence error, got {:?}", other),
        }
    }

    #[test]
    fn test_flush_every_write_lands_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        writer.set_next_sequence(1);

        writer.append(&sample_entry(1)).unwrap();
        let size = fs::metadata(writer.current_file_path()).unwrap().len();
        assert!(size > 0);
    }

    #[test]
    fn test_rotation_on_size_limit() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            max_file_size: 100,
            ..JournalConfig::new(tmp.path())
        };
        let mut writer = JournalWriter::open(config).unwrap();
        writer.set_next_sequence(1);

        for seq in 1..=20 {
            writer.append(&sample_entry(seq)).unwrap();
        }

        let files: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("journal-"))
            .collect();
        assert!(files.len() > 1, "expected rotation to create multiple files");
    }

    #[test]
    fn test_operation_payload_roundtrip() {
        use types::ids::{MarketId, OrderId, OwnerId};
        use types::intent::{IdempotencyKey, Intent};
        use types::order::Side;

        let owner = OwnerId::new();
        let op = types::operation::Operation::Admit {
            order_id: OrderId::new(),
            intent: Intent {
                market: MarketId::new("BTC/USDC"),
                side: Side::Buy,
                price: "100".parse().unwrap(),
                quantity: "2".parse().unwrap(),
                owner,
                key: IdempotencyKey::new(owner, 7),
                sequence_hint: None,
            },
        };

        let entry = LogEntry::from_operation(3, 1_000, &op).unwrap();
        assert_eq!(entry.kind, "ADMIT");
        assert_eq!(entry.operation().unwrap(), op);
    }

    #[test]
    fn test_journal_file_naming() {
        let path = JournalWriter::journal_path(Path::new("/tmp"), 42);
        assert_eq!(path, PathBuf::from("/tmp/journal-000042.bin"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Arbitrary bytes must never panic the frame parser; a crash
            // here would turn journal corruption into a recovery crash loop.
            #[test]
            fn prop_from_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
                let _ = LogEntry::from_bytes(&data);
            }

            #[test]
            fn prop_wire_format_roundtrip(
                seq in any::<u64>(),
                ts in any::<i64>(),
                payload in prop::collection::vec(any::<u8>(), 0..64),
            ) {
                let entry = LogEntry::new(seq, ts, "ADMIT".into(), payload);
                let bytes = entry.to_bytes();
                let (decoded, consumed) = LogEntry::from_bytes(&bytes).unwrap();
                prop_assert_eq!(consumed, bytes.len());
                prop_assert_eq!(decoded, entry);
            }
        }
    }
}
