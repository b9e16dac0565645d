//! Abstract document store contract.
//!
//! # Responsibility
//! - Define the persistence and subscription seam the reconciler talks to.
//! - Separate transport failures, timeouts, and dropped streams.
//!
//! # Invariants
//! - Document ids are generated by the caller (UUID v4); implementations
//!   never mint identity.
//! - Subscriptions are board-scoped; the first poll after subscribing yields
//!   the full matching document set as upsert events.

use crate::model::board::{Board, BoardId};
use crate::sync::document::{ChangeBatch, Collection, Document};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Handle for one open change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result type for document store calls.
pub type StoreIoResult<T> = Result<T, StoreIoError>;

/// Errors from remote document store calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreIoError {
    /// The call failed in transit or at the backend.
    Transport(String),
    /// The call did not complete within the implementation's deadline.
    Timeout(String),
    /// The polled subscription is no longer delivering changes.
    SubscriptionLost(String),
    /// The subscription handle is unknown.
    UnknownSubscription(SubscriptionId),
}

impl Display for StoreIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "document store call failed: {message}"),
            Self::Timeout(message) => write!(f, "document store call timed out: {message}"),
            Self::SubscriptionLost(reason) => write!(f, "subscription lost: {reason}"),
            Self::UnknownSubscription(id) => write!(f, "unknown subscription: {id}"),
        }
    }
}

impl Error for StoreIoError {}

/// Persistence and change-feed contract for the hosted document database.
///
/// All calls are synchronous from the caller's point of view; inbound
/// changes are queued per subscription and drained with `poll`, which keeps
/// mutation handling and reconciliation on one logical thread.
pub trait DocumentStore {
    /// Creates or fully overwrites one document.
    fn upsert(&mut self, document: &Document) -> StoreIoResult<()>;

    /// Loads one document by collection and key.
    fn get(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<Option<Document>>;

    /// Deletes one document by collection and key. Deleting a missing
    /// document succeeds, so retried cascades converge.
    fn delete(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<()>;

    /// Looks up a board by its exact title.
    ///
    /// Used for the duplicate-board check at creation time.
    fn find_board_by_title(&mut self, title: &str) -> StoreIoResult<Option<Board>>;

    /// Opens a board-scoped change subscription on one collection.
    fn subscribe(
        &mut self,
        collection: Collection,
        board_id: BoardId,
    ) -> StoreIoResult<SubscriptionId>;

    /// Drains all queued change batches for one subscription.
    ///
    /// Returns `SubscriptionLost` once the stream has been dropped; the
    /// handle stays invalid afterwards.
    fn poll(&mut self, subscription: SubscriptionId) -> StoreIoResult<Vec<ChangeBatch>>;

    /// Closes one subscription. Unknown handles are ignored.
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}
