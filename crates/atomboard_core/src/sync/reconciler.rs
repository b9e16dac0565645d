//! Board reconciler: folds remote changes, pushes snapshots, writes back.
//!
//! # Responsibility
//! - Keep one board's local tree consistent with the remote document store.
//! - Translate validated local mutations into document writes, rolling the
//!   local state back when a write fails.
//! - Notify observers with a full snapshot whenever the view changes, and
//!   with a distinct sync-lost signal when a subscription drops.
//!
//! # Invariants
//! - Within a batch, deletions are applied before creates/updates, so a
//!   delete-then-recreate of the same id ends present.
//! - Folding the same batch twice leaves the state unchanged.
//! - A failed remote mutation never leaves partial local state behind.

use crate::model::atom::{Atom, AtomId};
use crate::model::board::{Board, BoardId};
use crate::store::snapshot::Snapshot;
use crate::store::tree_store::{StoreError, TitleScope, TreeStore};
use crate::sync::document::{ChangeBatch, ChangeEvent, Collection, Document};
use crate::sync::document_store::{DocumentStore, StoreIoError, SubscriptionId};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Result type for sync-layer operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced to callers of reconciler mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Local validation rejected the intent; nothing was sent remotely.
    Store(StoreError),
    /// The remote write failed; local state was rolled back.
    Transport(String),
    /// The remote write timed out; local state was rolled back.
    Timeout(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Transport(message) => write!(f, "remote mutation failed: {message}"),
            Self::Timeout(message) => write!(f, "remote mutation timed out: {message}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<StoreIoError> for SyncError {
    fn from(value: StoreIoError) -> Self {
        match value {
            StoreIoError::Timeout(message) => Self::Timeout(message),
            StoreIoError::Transport(message) => Self::Transport(message),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Rendering-layer hook fed by the reconciler.
pub trait SnapshotObserver {
    /// Called with the full ordered view after every observed change.
    fn snapshot_changed(&self, snapshot: &Snapshot);

    /// Called once when the change stream drops, so the UI can show a
    /// stale-data indicator instead of an empty tree.
    fn sync_lost(&self, reason: &str);
}

/// Folds one change batch into the local state.
///
/// Deletions first, then creates/updates in arrival order; the last write
/// for a given id wins. Events carry full field values, so re-folding the
/// same batch is a no-op.
pub fn fold_batch(state: &mut TreeStore, batch: &ChangeBatch) {
    for event in batch.events.iter().filter(|event| event.is_deletion()) {
        match event {
            ChangeEvent::BoardDeleted(board_id) => state.apply_board_delete(*board_id),
            ChangeEvent::AtomDeleted(atom_id) => state.apply_atom_delete(*atom_id),
            _ => {}
        }
    }
    for event in batch.events.iter().filter(|event| !event.is_deletion()) {
        match event {
            ChangeEvent::BoardUpserted(board) => state.apply_board_upsert(board.clone()),
            ChangeEvent::AtomUpserted(atom) => state.apply_atom_upsert(atom.clone()),
            _ => {}
        }
    }
}

/// Creates a board after a remote duplicate-title check.
///
/// Identity is a fresh stable id; the title is only a display attribute.
pub fn create_board<S: DocumentStore>(
    store: &mut S,
    title: impl Into<String>,
) -> SyncResult<Board> {
    let title = title.into();
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidTitle.into());
    }
    if store.find_board_by_title(trimmed)?.is_some() {
        return Err(StoreError::DuplicateBoard(trimmed.to_string()).into());
    }
    let board = Board::new(trimmed);
    store.upsert(&Document::Board(board.clone()))?;
    info!(
        "event=board_created module=sync board_id={} status=ok",
        board.id
    );
    Ok(board)
}

/// One open board bound to a document store.
///
/// All mutations and reconciliation passes run on the caller's thread;
/// inbound changes queue inside the store and are drained with [`pump`].
///
/// [`pump`]: BoardReconciler::pump
pub struct BoardReconciler<S: DocumentStore> {
    store: S,
    board_id: BoardId,
    state: TreeStore,
    board_subscription: SubscriptionId,
    atom_subscription: SubscriptionId,
    observers: Vec<Arc<dyn SnapshotObserver>>,
    lost_reported: bool,
}

impl<S: DocumentStore> BoardReconciler<S> {
    /// Opens a board with the default board-wide title scope.
    pub fn open(store: S, board_id: BoardId) -> SyncResult<Self> {
        Self::open_with_title_scope(store, board_id, TitleScope::default())
    }

    /// Opens a board, subscribing to its metadata and atom streams and
    /// folding the initial document set.
    pub fn open_with_title_scope(
        mut store: S,
        board_id: BoardId,
        title_scope: TitleScope,
    ) -> SyncResult<Self> {
        let board_subscription = store.subscribe(Collection::Boards, board_id)?;
        let atom_subscription = store.subscribe(Collection::Atoms, board_id)?;
        let mut reconciler = Self {
            store,
            board_id,
            state: TreeStore::with_title_scope(title_scope),
            board_subscription,
            atom_subscription,
            observers: Vec::new(),
            lost_reported: false,
        };
        reconciler.pump();
        info!("event=board_open module=sync board_id={board_id} status=ok");
        Ok(reconciler)
    }

    /// Returns the bound board id.
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Returns the current ordered view of the board.
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot(self.board_id)
    }

    /// Registers one observer for snapshot and sync-lost notifications.
    pub fn register_observer(&mut self, observer: Arc<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    /// Grants access to the underlying store, e.g. for fault injection in
    /// tests or for opening further boards on a shared handle.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Returns the handle of the atom change subscription.
    pub fn atom_subscription(&self) -> SubscriptionId {
        self.atom_subscription
    }

    /// Returns the handle of the board metadata subscription.
    pub fn board_subscription(&self) -> SubscriptionId {
        self.board_subscription
    }

    /// Drains both change streams and folds the queued batches.
    ///
    /// Observers are notified once when the folded state differs from the
    /// previous one. A dropped stream is reported to observers as sync-lost
    /// (once) instead of erroring: the local view stays intact but stale.
    /// Returns whether the state changed.
    pub fn pump(&mut self) -> bool {
        let before = self.state.clone();
        let mut applied = 0usize;

        for subscription in [self.board_subscription, self.atom_subscription] {
            match self.store.poll(subscription) {
                Ok(batches) => {
                    for batch in &batches {
                        fold_batch(&mut self.state, batch);
                        applied += 1;
                    }
                }
                Err(StoreIoError::SubscriptionLost(reason)) => self.report_sync_lost(&reason),
                Err(error) => self.report_sync_lost(&error.to_string()),
            }
        }

        let changed = before != self.state;
        if applied > 0 {
            debug!(
                "event=batches_applied module=sync board_id={} n={applied} changed={changed}",
                self.board_id
            );
        }
        if changed {
            self.notify_snapshot();
        }
        changed
    }

    /// Renames the open board.
    pub fn rename_board(&mut self, new_title: impl Into<String>) -> SyncResult<Board> {
        let backup = self.state.clone();
        let board = self.state.rename_board(self.board_id, new_title)?;
        self.write_or_rollback(backup, |store| store.upsert(&Document::Board(board.clone())))?;
        self.notify_snapshot();
        Ok(board)
    }

    /// Deletes the open board and all of its atoms.
    ///
    /// Atom documents are deleted before the board document. A failure part
    /// way through rolls back the local state and surfaces the error; the
    /// remote deletes already applied are harmless because deletes are
    /// idempotent and a retried cascade converges.
    pub fn delete_board(&mut self) -> SyncResult<()> {
        let backup = self.state.clone();
        let cascaded = self.state.delete_board(self.board_id)?;
        let board_id = self.board_id;
        self.write_or_rollback(backup, |store| {
            for atom_id in &cascaded {
                store.delete(Collection::Atoms, *atom_id)?;
            }
            store.delete(Collection::Boards, board_id)
        })?;
        info!(
            "event=board_deleted module=sync board_id={board_id} cascaded={}",
            cascaded.len()
        );
        self.notify_snapshot();
        Ok(())
    }

    /// Creates an atom under an optional parent, appended after its siblings.
    pub fn create_atom(
        &mut self,
        parent_id: Option<AtomId>,
        title: impl Into<String>,
    ) -> SyncResult<Atom> {
        let backup = self.state.clone();
        let atom = self.state.create_atom(self.board_id, parent_id, title)?;
        self.write_or_rollback(backup, |store| store.upsert(&Document::Atom(atom.clone())))?;
        self.notify_snapshot();
        Ok(atom)
    }

    /// Moves an atom under a new parent at the given sibling index.
    ///
    /// Persists the moved atom plus any siblings whose rank a rebalance
    /// touched, in deterministic order.
    pub fn move_atom(
        &mut self,
        atom_id: AtomId,
        new_parent_id: Option<AtomId>,
        target_index: usize,
    ) -> SyncResult<Atom> {
        let backup = self.state.clone();
        let changed = self
            .state
            .move_atom(atom_id, new_parent_id, target_index)?;
        let moved = changed
            .first()
            .cloned()
            .ok_or(StoreError::AtomNotFound(atom_id))?;
        self.write_or_rollback(backup, |store| {
            for atom in &changed {
                store.upsert(&Document::Atom(atom.clone()))?;
            }
            Ok(())
        })?;
        self.notify_snapshot();
        Ok(moved)
    }

    /// Overwrites one atom's markdown content.
    pub fn update_content(
        &mut self,
        atom_id: AtomId,
        content: impl Into<String>,
    ) -> SyncResult<Atom> {
        let backup = self.state.clone();
        let atom = self.state.update_content(atom_id, content)?;
        self.write_or_rollback(backup, |store| store.upsert(&Document::Atom(atom.clone())))?;
        self.notify_snapshot();
        Ok(atom)
    }

    /// Clears one atom's content, keeping the tree structure intact.
    pub fn clear_content(&mut self, atom_id: AtomId) -> SyncResult<Atom> {
        self.update_content(atom_id, "")
    }

    fn write_or_rollback(
        &mut self,
        backup: TreeStore,
        write: impl FnOnce(&mut S) -> Result<(), StoreIoError>,
    ) -> SyncResult<()> {
        if let Err(error) = write(&mut self.store) {
            self.state = backup;
            warn!(
                "event=mutation_rolled_back module=sync board_id={} reason={error}",
                self.board_id
            );
            return Err(error.into());
        }
        Ok(())
    }

    fn notify_snapshot(&self) {
        let snapshot = self.snapshot();
        for observer in &self.observers {
            observer.snapshot_changed(&snapshot);
        }
    }

    fn report_sync_lost(&mut self, reason: &str) {
        if self.lost_reported {
            return;
        }
        self.lost_reported = true;
        warn!(
            "event=sync_lost module=sync board_id={} reason={reason}",
            self.board_id
        );
        for observer in &self.observers {
            observer.sync_lost(reason);
        }
    }
}

impl<S: DocumentStore> Drop for BoardReconciler<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.board_subscription);
        self.store.unsubscribe(self.atom_subscription);
    }
}
