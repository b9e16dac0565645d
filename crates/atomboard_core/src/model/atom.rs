//! Atom domain model.
//!
//! # Responsibility
//! - Define one entry of a board's tree: title, markdown content, position.
//!
//! # Invariants
//! - `id` is stable and never reused for another atom.
//! - `board_id` never changes after creation.
//! - `rank` orders siblings sharing the same `parent_id`; ties are broken by
//!   `id` when building a snapshot.

use crate::model::board::BoardId;
use crate::model::epoch_ms_now;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable atom identifier.
pub type AtomId = Uuid;

/// One entry in a board's tree.
///
/// Serialized field names match the external `atoms` collection documents
/// (`boardId`, `parentId`, `order`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    /// Stable global ID, assigned at creation, immutable thereafter.
    pub id: AtomId,
    /// Owning board.
    pub board_id: BoardId,
    /// Parent atom; `None` means top-level child of the board root.
    pub parent_id: Option<AtomId>,
    /// Display label, unique within the configured title scope.
    pub title: String,
    /// Free-form markdown body.
    pub content: String,
    /// Sibling order key. Serialized as `order` for wire parity.
    #[serde(rename = "order")]
    pub rank: i64,
    /// Epoch ms of the last content or structural change.
    pub updated_at: i64,
}

impl Atom {
    /// Creates a new atom with a generated stable ID and empty content.
    pub fn new(
        board_id: BoardId,
        parent_id: Option<AtomId>,
        title: impl Into<String>,
        rank: i64,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), board_id, parent_id, title, rank)
    }

    /// Creates an atom with a caller-provided stable ID.
    ///
    /// Used by sync paths where identity already exists externally.
    pub fn with_id(
        id: AtomId,
        board_id: BoardId,
        parent_id: Option<AtomId>,
        title: impl Into<String>,
        rank: i64,
    ) -> Self {
        Self {
            id,
            board_id,
            parent_id,
            title: title.into(),
            content: String::new(),
            rank,
            updated_at: epoch_ms_now(),
        }
    }

    /// Returns whether this atom sits directly under the board root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
