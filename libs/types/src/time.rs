//! Timestamp helpers
//!
//! All records carry Unix nanoseconds as `i64`. Timestamps are assigned once
//! at commit time and recorded in the operation log, so replay reuses the
//! logged value instead of re-reading the clock.

use chrono::Utc;

/// Current wall-clock time in Unix nanoseconds.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
