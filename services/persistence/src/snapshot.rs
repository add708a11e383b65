//! Market state snapshots with integrity hashing and compression
//!
//! A snapshot is a point-in-time serialization of one market's engine state,
//! tagged with the sequence number it is valid through. Snapshots are a
//! replay-time optimization only; correctness never depends on them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("compression error: {0}")]
    Compression(String),
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// SHA-256 hex digest of a byte slice. Also used by recovery to hash
/// serialized engine state for divergence checks.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ── Snapshot ────────────────────────────────────────────────────────

/// A serialized market state valid through `sequence`.
///
/// The payload is opaque to this layer (the engine defines its own state
/// encoding); integrity is a SHA-256 hash over the payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Storage key of the market this snapshot belongs to.
    pub market: String,
    /// Last applied sequence number the payload reflects.
    pub sequence: u64,
    /// Unix nanos when the snapshot was taken.
    pub timestamp: i64,
    /// Serialized engine state.
    pub payload: Vec<u8>,
    /// SHA-256 hex digest of `payload`.
    pub checksum: String,
}

impl Snapshot {
    pub fn new(market: String, sequence: u64, timestamp: i64, payload: Vec<u8>) -> Self {
        let checksum = hash_bytes(&payload);
        Self {
            version: SNAPSHOT_VERSION,
            market,
            sequence,
            timestamp,
            payload,
            checksum,
        }
    }

    pub fn verify_integrity(&self) -> bool {
        hash_bytes(&self.payload) == self.checksum
    }
}

// ── Snapshot Writer ─────────────────────────────────────────────────

/// Writes snapshots atomically (tmp file + fsync + rename), optionally
/// zstd-compressed.
pub struct SnapshotWriter {
    dir: PathBuf,
    compress: bool,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    pub fn write(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let data = bincode::serialize(snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        let (final_data, ext) = if self.compress {
            let compressed = zstd::encode_all(data.as_slice(), 3)
                .map_err(|e| SnapshotError::Compression(e.to_string()))?;
            (compressed, "snap.zst")
        } else {
            (data, "snap")
        };

        let filename = format!("snapshot-{:012}.{}", snapshot.sequence, ext);
        let path = self.dir.join(&filename);
        let tmp_path = self.dir.join(format!("{}.tmp", filename));

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&final_data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        Ok(path)
    }
}

// ── Snapshot Loader ─────────────────────────────────────────────────

/// Loads snapshots, verifying version and integrity.
pub struct SnapshotLoader {
    dir: PathBuf,
}

impl SnapshotLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, path: &Path) -> Result<Snapshot, SnapshotError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let is_compressed = path.extension().map(|e| e == "zst").unwrap_or(false);
        let decompressed = if is_compressed {
            zstd::decode_all(data.as_slice())
                .map_err(|e| SnapshotError::Compression(e.to_string()))?
        } else {
            data
        };

        let snapshot: Snapshot = bincode::deserialize(&decompressed)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        if !snapshot.verify_integrity() {
            return Err(SnapshotError::IntegrityFailure {
                expected: snapshot.checksum.clone(),
                actual: hash_bytes(&snapshot.payload),
            });
        }
        Ok(snapshot)
    }

    /// Load the snapshot with the highest sequence, if any exist.
    pub fn load_latest(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let mut snapshots = self.list()?;
        snapshots.sort_by_key(|(seq, _)| *seq);
        match snapshots.pop() {
            Some((_, path)) => Ok(Some(self.load(&path)?)),
            None => Ok(None),
        }
    }

    /// All snapshots as (sequence, path), ascending.
    pub fn list(&self) -> Result<Vec<(u64, PathBuf)>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("snapshot-")
                && (name.ends_with(".snap") || name.ends_with(".snap.zst"))
            {
                if let Some(seq) = Self::parse_sequence(&name) {
                    results.push((seq, entry.path()));
                }
            }
        }
        results.sort_by_key(|(seq, _)| *seq);
        Ok(results)
    }

    fn parse_sequence(filename: &str) -> Option<u64> {
        filename
            .trim_start_matches("snapshot-")
            .trim_end_matches(".snap.zst")
            .trim_end_matches(".snap")
            .parse::<u64>()
            .ok()
    }
}

// ── Policies ────────────────────────────────────────────────────────

/// Operation-count interval between snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPolicy {
    /// Take a snapshot every N applied operations.
    pub operation_interval: u64,
    /// Last sequence at which a snapshot was taken.
    pub last_snapshot_seq: u64,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            operation_interval: 100_000,
            last_snapshot_seq: 0,
        }
    }
}

impl SnapshotPolicy {
    pub fn with_interval(interval: u64) -> Self {
        Self {
            operation_interval: interval,
            last_snapshot_seq: 0,
        }
    }

    pub fn should_snapshot(&self, current_seq: u64) -> bool {
        current_seq >= self.last_snapshot_seq + self.operation_interval
    }

    pub fn record_snapshot(&mut self, seq: u64) {
        self.last_snapshot_seq = seq;
    }
}

/// Keep only the most recent N snapshots on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_snapshots: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_snapshots: 3 }
    }
}

impl RetentionPolicy {
    pub fn new(max_snapshots: usize) -> Self {
        Self { max_snapshots }
    }

    /// Remove old snapshots, returning the deleted paths.
    pub fn cleanup(&self, dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
        let loader = SnapshotLoader::new(dir);
        let snapshots = loader.list()?;

        let mut removed = Vec::new();
        if snapshots.len() > self.max_snapshots {
            let excess = snapshots.len() - self.max_snapshots;
            for (_, path) in snapshots.iter().take(excess) {
                fs::remove_file(path)?;
                removed.push(path.clone());
            }
        }
        Ok(removed)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_snapshot(seq: u64) -> Snapshot {
        Snapshot::new(
            "BTC_USDC".to_string(),
            seq,
            1_708_123_456_789_000_000,
            vec![1, 2, 3, 4, 5, 6, 7, 8],
        )
    }

    #[test]
    fn test_write_and_load_uncompressed() {
        let tmp = TempDir::new().unwrap();
        let snapshot = sample_snapshot(5_000);

        let writer = SnapshotWriter::new(tmp.path(), false);
        let path = writer.write(&snapshot).unwrap();

        let loader = SnapshotLoader::new(tmp.path());
        let loaded = loader.load(&path).unwrap();

        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        assert_eq!(loaded, snapshot);
        assert!(loaded.verify_integrity());
    }

    #[test]
    fn test_write_and_load_compressed() {
        let tmp = TempDir::new().unwrap();
        let snapshot = sample_snapshot(5_000);

        let writer = SnapshotWriter::new(tmp.path(), true);
        let path = writer.write(&snapshot).unwrap();
        assert!(path.to_string_lossy().ends_with(".snap.zst"));

        let loader = SnapshotLoader::new(tmp.path());
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_integrity_detects_tamper() {
        let mut snapshot = sample_snapshot(100);
        snapshot.payload.push(0xFF);
        assert!(!snapshot.verify_integrity());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_bytes(b"hello");
        let b = hash_bytes(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_bytes(b"world"));
    }

    #[test]
    fn test_load_latest_picks_highest_sequence() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), false);

        for seq in [100u64, 500, 300] {
            writer.write(&sample_snapshot(seq)).unwrap();
        }

        let loader = SnapshotLoader::new(tmp.path());
        let latest = loader.load_latest().unwrap().unwrap();
        assert_eq!(latest.sequence, 500);
    }

    #[test]
    fn test_load_latest_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let loader = SnapshotLoader::new(tmp.path());
        assert!(loader.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_snapshot_policy_interval() {
        let mut policy = SnapshotPolicy::with_interval(100);
        assert!(!policy.should_snapshot(50));
        assert!(policy.should_snapshot(100));

        policy.record_snapshot(100);
        assert!(!policy.should_snapshot(150));
        assert!(policy.should_snapshot(200));
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), false);
        for i in 1..=5u64 {
            writer.write(&sample_snapshot(i * 1000)).unwrap();
        }

        let removed = RetentionPolicy::new(2).cleanup(tmp.path()).unwrap();
        assert_eq!(removed.len(), 3);

        let loader = SnapshotLoader::new(tmp.path());
        let remaining = loader.list().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].0, 4000);
        assert_eq!(remaining[1].0, 5000);
    }
}
