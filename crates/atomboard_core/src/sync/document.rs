//! Wire-level document and change-event types.
//!
//! # Responsibility
//! - Name the two remote collections and the documents they carry.
//! - Define the change events delivered to board-scoped subscriptions.
//!
//! # Invariants
//! - Upsert events carry full field values, never deltas; re-applying one
//!   is a no-op.

use crate::model::atom::{Atom, AtomId};
use crate::model::board::{Board, BoardId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remote collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Boards,
    Atoms,
}

impl Collection {
    /// Returns the collection name as used by the remote store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boards => "boards",
            Self::Atoms => "atoms",
        }
    }
}

/// One full document as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Document {
    Board(Board),
    Atom(Atom),
}

impl Document {
    /// Returns the collection this document belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            Self::Board(_) => Collection::Boards,
            Self::Atom(_) => Collection::Atoms,
        }
    }

    /// Returns the document key.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Board(board) => board.id,
            Self::Atom(atom) => atom.id,
        }
    }

    /// Returns the board this document is scoped to.
    pub fn scope(&self) -> BoardId {
        match self {
            Self::Board(board) => board.id,
            Self::Atom(atom) => atom.board_id,
        }
    }
}

/// One change notification from a board-scoped subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    BoardUpserted(Board),
    BoardDeleted(BoardId),
    AtomUpserted(Atom),
    AtomDeleted(AtomId),
}

impl ChangeEvent {
    /// Returns whether this event removes a document.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::BoardDeleted(_) | Self::AtomDeleted(_))
    }
}

/// A group of change events delivered together.
///
/// The initial delivery after subscribing is one batch containing the full
/// matching document set expressed as upserts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    /// Wraps a list of events into one batch.
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self { events }
    }

    /// Returns whether this batch carries no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
