//! Board domain model.
//!
//! # Responsibility
//! - Define the top-level named scope owning one atom forest.
//!
//! # Invariants
//! - `id` is stable and never reused for another board.
//! - `title` is a mutable display attribute, not an identity key.

use crate::model::epoch_ms_now;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable board identifier.
///
/// The external source keyed boards by their title text; identity here is a
/// separate opaque ID so renaming a board never changes its key.
pub type BoardId = Uuid;

/// Named root scope containing a forest of atoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Stable global ID used for atom ownership and document keys.
    pub id: BoardId,
    /// User-facing board name. Uniqueness is checked at creation only.
    pub title: String,
    /// Epoch ms of the last title change.
    pub updated_at: i64,
}

impl Board {
    /// Creates a new board with a generated stable ID.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, epoch_ms_now())
    }

    /// Creates a board with a caller-provided ID and timestamp.
    ///
    /// Used by sync paths where identity already exists externally.
    pub fn with_id(id: BoardId, title: impl Into<String>, updated_at: i64) -> Self {
        Self {
            id,
            title: title.into(),
            updated_at,
        }
    }
}
