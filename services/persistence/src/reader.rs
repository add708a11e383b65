//! Sequential journal reader with corruption and gap detection
//!
//! Every frame's checksum is validated on read. A truncated tail (an append
//! the crash interrupted) ends the stream at the last valid frame; a missing
//! or out-of-order sequence is fatal, because replaying across a gap would
//! silently desynchronize derived state.

use crate::journal::{JournalError, LogEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("checksum mismatch at byte offset {offset}: entry seq={sequence}")]
    ChecksumMismatch { offset: u64, sequence: u64 },

    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },
}

/// Record of a corrupt region encountered while reading.
#[derive(Debug, Clone)]
pub struct CorruptionRecord {
    /// Byte offset across all journal files.
    pub byte_offset: u64,
    pub detail: String,
}

// ── Journal Reader ──────────────────────────────────────────────────

/// Reads every journal file in a directory in index order, yielding entries
/// in sequence order.
pub struct JournalReader {
    files: Vec<PathBuf>,
    current_file_idx: usize,
    data: Vec<u8>,
    pos: usize,
    global_offset: u64,
    last_sequence: Option<u64>,
    corruption_log: Vec<CorruptionRecord>,
}

impl JournalReader {
    /// Open a reader over all journal files in `dir`.
    pub fn open(dir: &Path) -> Result<Self, ReaderError> {
        let files = Self::discover_files(dir)?;
        let mut reader = Self {
            files,
            current_file_idx: 0,
            data: Vec::new(),
            pos: 0,
            global_offset: 0,
            last_sequence: None,
            corruption_log: Vec::new(),
        };
        reader.load_current_file()?;
        Ok(reader)
    }

    /// Read the next valid entry.
    ///
    /// Returns `None` once all entries have been read, or once a truncated
    /// tail frame is encountered (recorded in the corruption log).
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>, ReaderError> {
        loop {
            if self.pos >= self.data.len() {
                if !self.advance_file()? {
                    return Ok(None);
                }
                continue;
            }

            let offset = self.global_offset;
            match LogEntry::from_bytes(&self.data[self.pos..]) {
                Ok((entry, consumed)) => {
                    self.pos += consumed;
                    self.global_offset += consumed as u64;

                    if !entry.verify_checksum() {
                        return Err(ReaderError::ChecksumMismatch {
                            offset,
                            sequence: entry.sequence,
                        });
                    }

                    if let Some(prev) = self.last_sequence {
                        if entry.sequence != prev + 1 {
                            return Err(ReaderError::SequenceGap {
                                expected: prev + 1,
                                got: entry.sequence,
                            });
                        }
                    }
                    self.last_sequence = Some(entry.sequence);
                    return Ok(Some(entry));
                }
                Err(e) => {
                    // An interrupted append leaves a short tail frame: stop
                    // at the last valid entry. Anything else in the middle
                    // of the stream would surface as a checksum or gap error
                    // on the next file.
                    warn!(offset, error = %e, "journal tail unreadable, ending replay");
                    self.corruption_log.push(CorruptionRecord {
                        byte_offset: offset,
                        detail: e.to_string(),
                    });
                    self.pos = self.data.len();
                    if !self.advance_file()? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Read every remaining entry.
    pub fn read_all(&mut self) -> Result<Vec<LogEntry>, ReaderError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Read every entry with `sequence >= from`, in order.
    pub fn read_from(&mut self, from: u64) -> Result<Vec<LogEntry>, ReaderError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            if entry.sequence >= from {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Last sequence successfully read so far.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Corrupt regions encountered (truncated tail frames).
    pub fn corruption_log(&self) -> &[CorruptionRecord] {
        &self.corruption_log
    }

    // ── Internal ────────────────────────────────────────────────────

    fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, ReaderError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut indexed: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_prefix("journal-")
                    .and_then(|n| n.strip_suffix(".bin"))
                    .and_then(|n| n.parse::<u64>().ok())
                    .map(|idx| (idx, e.path()))
            })
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);
        Ok(indexed.into_iter().map(|(_, path)| path).collect())
    }

    fn load_current_file(&mut self) -> Result<(), ReaderError> {
        if let Some(path) = self.files.get(self.current_file_idx) {
            self.data = fs::read(path)?;
            self.pos = 0;
        } else {
            self.data = Vec::new();
            self.pos = 0;
        }
        Ok(())
    }

    /// Move to the next file; false when exhausted.
    fn advance_file(&mut self) -> Result<bool, ReaderError> {
        if self.current_file_idx + 1 >= self.files.len() {
            return Ok(false);
        }
        self.current_file_idx += 1;
        self.load_current_file()?;
        Ok(true)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
