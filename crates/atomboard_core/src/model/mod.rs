//! Domain model for board/atom tree data.
//!
//! # Responsibility
//! - Define the canonical records shared by the tree store and sync layer.
//! - Keep wire field naming compatible with the external document schema.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Timestamps are epoch milliseconds.

pub mod atom;
pub mod board;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall clock as epoch milliseconds.
///
/// Used only for `updated_at` bookkeeping; sibling ordering never depends on
/// wall-clock time.
pub fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
