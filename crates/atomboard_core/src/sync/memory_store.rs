//! In-memory document store with board-scoped change fan-out.
//!
//! # Responsibility
//! - Provide the concrete `DocumentStore` used by tests and the CLI probe.
//! - Queue change batches per subscription so callers drain them serially.
//!
//! # Invariants
//! - Every successful write fans out exactly one change event to each
//!   matching live subscription.
//! - The first poll after subscribing sees the full matching document set.

use crate::model::atom::Atom;
use crate::model::board::{Board, BoardId};
use crate::sync::document::{ChangeBatch, ChangeEvent, Collection, Document};
use crate::sync::document_store::{DocumentStore, StoreIoError, StoreIoResult, SubscriptionId};
use log::debug;
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use uuid::Uuid;

struct SubscriptionState {
    collection: Collection,
    board_id: BoardId,
    queue: VecDeque<ChangeBatch>,
    lost: Option<String>,
}

/// In-memory `DocumentStore` implementation.
///
/// Write faults and dropped streams can be injected for exercising the
/// rollback and sync-lost paths.
#[derive(Default)]
pub struct MemoryDocumentStore {
    boards: BTreeMap<Uuid, Board>,
    atoms: BTreeMap<Uuid, Atom>,
    subscriptions: BTreeMap<u64, SubscriptionState>,
    next_subscription: u64,
    pending_write_failure: Option<StoreIoError>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next write call (`upsert` or `delete`) fail with `error`.
    pub fn inject_write_failure(&mut self, error: StoreIoError) {
        self.pending_write_failure = Some(error);
    }

    /// Drops one subscription; subsequent polls report the stream as lost.
    pub fn drop_subscription(&mut self, subscription: SubscriptionId, reason: impl Into<String>) {
        if let Some(state) = self.subscriptions.get_mut(&subscription.0) {
            state.lost = Some(reason.into());
            state.queue.clear();
        }
    }

    /// Returns how many documents one collection currently holds.
    pub fn collection_len(&self, collection: Collection) -> usize {
        match collection {
            Collection::Boards => self.boards.len(),
            Collection::Atoms => self.atoms.len(),
        }
    }

    /// Returns all atoms belonging to one board.
    pub fn atoms_in_board(&self, board_id: BoardId) -> Vec<Atom> {
        self.atoms
            .values()
            .filter(|atom| atom.board_id == board_id)
            .cloned()
            .collect()
    }

    fn take_write_failure(&mut self) -> StoreIoResult<()> {
        match self.pending_write_failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fan_out(&mut self, collection: Collection, scope: BoardId, event: ChangeEvent) {
        for state in self.subscriptions.values_mut() {
            if state.lost.is_some() {
                continue;
            }
            if state.collection == collection && state.board_id == scope {
                state.queue.push_back(ChangeBatch::new(vec![event.clone()]));
            }
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn upsert(&mut self, document: &Document) -> StoreIoResult<()> {
        self.take_write_failure()?;
        match document {
            Document::Board(board) => {
                self.boards.insert(board.id, board.clone());
                self.fan_out(
                    Collection::Boards,
                    board.id,
                    ChangeEvent::BoardUpserted(board.clone()),
                );
            }
            Document::Atom(atom) => {
                self.atoms.insert(atom.id, atom.clone());
                self.fan_out(
                    Collection::Atoms,
                    atom.board_id,
                    ChangeEvent::AtomUpserted(atom.clone()),
                );
            }
        }
        Ok(())
    }

    fn get(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<Option<Document>> {
        Ok(match collection {
            Collection::Boards => self.boards.get(&id).cloned().map(Document::Board),
            Collection::Atoms => self.atoms.get(&id).cloned().map(Document::Atom),
        })
    }

    fn delete(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<()> {
        self.take_write_failure()?;
        match collection {
            Collection::Boards => {
                if self.boards.remove(&id).is_some() {
                    self.fan_out(Collection::Boards, id, ChangeEvent::BoardDeleted(id));
                }
            }
            Collection::Atoms => {
                if let Some(atom) = self.atoms.remove(&id) {
                    self.fan_out(Collection::Atoms, atom.board_id, ChangeEvent::AtomDeleted(id));
                }
            }
        }
        Ok(())
    }

    fn find_board_by_title(&mut self, title: &str) -> StoreIoResult<Option<Board>> {
        Ok(self
            .boards
            .values()
            .find(|board| board.title == title)
            .cloned())
    }

    fn subscribe(
        &mut self,
        collection: Collection,
        board_id: BoardId,
    ) -> StoreIoResult<SubscriptionId> {
        let id = self.next_subscription;
        self.next_subscription += 1;

        let initial: Vec<ChangeEvent> = match collection {
            Collection::Boards => self
                .boards
                .get(&board_id)
                .map(|board| ChangeEvent::BoardUpserted(board.clone()))
                .into_iter()
                .collect(),
            Collection::Atoms => self
                .atoms
                .values()
                .filter(|atom| atom.board_id == board_id)
                .map(|atom| ChangeEvent::AtomUpserted(atom.clone()))
                .collect(),
        };

        let mut queue = VecDeque::new();
        if !initial.is_empty() {
            queue.push_back(ChangeBatch::new(initial));
        }
        self.subscriptions.insert(
            id,
            SubscriptionState {
                collection,
                board_id,
                queue,
                lost: None,
            },
        );
        debug!(
            "event=subscribe_opened module=sync collection={} board_id={board_id} sub={id}",
            collection.as_str()
        );
        Ok(SubscriptionId(id))
    }

    fn poll(&mut self, subscription: SubscriptionId) -> StoreIoResult<Vec<ChangeBatch>> {
        let state = self
            .subscriptions
            .get_mut(&subscription.0)
            .ok_or(StoreIoError::UnknownSubscription(subscription))?;
        if let Some(reason) = &state.lost {
            return Err(StoreIoError::SubscriptionLost(reason.clone()));
        }
        Ok(state.queue.drain(..).collect())
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription.0);
    }
}

/// Cloneable handle over one [`MemoryDocumentStore`].
///
/// Lets several reconcilers share a single store on one logical thread,
/// which is how changes made by one client reach the others.
#[derive(Clone, Default)]
pub struct SharedMemoryStore {
    inner: Rc<RefCell<MemoryDocumentStore>>,
}

impl SharedMemoryStore {
    /// Creates a handle over a fresh empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the underlying store, e.g. for fault injection.
    pub fn inner(&self) -> RefMut<'_, MemoryDocumentStore> {
        self.inner.borrow_mut()
    }
}

impl DocumentStore for SharedMemoryStore {
    fn upsert(&mut self, document: &Document) -> StoreIoResult<()> {
        self.inner.borrow_mut().upsert(document)
    }

    fn get(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<Option<Document>> {
        self.inner.borrow_mut().get(collection, id)
    }

    fn delete(&mut self, collection: Collection, id: Uuid) -> StoreIoResult<()> {
        self.inner.borrow_mut().delete(collection, id)
    }

    fn find_board_by_title(&mut self, title: &str) -> StoreIoResult<Option<Board>> {
        self.inner.borrow_mut().find_board_by_title(title)
    }

    fn subscribe(
        &mut self,
        collection: Collection,
        board_id: BoardId,
    ) -> StoreIoResult<SubscriptionId> {
        self.inner.borrow_mut().subscribe(collection, board_id)
    }

    fn poll(&mut self, subscription: SubscriptionId) -> StoreIoResult<Vec<ChangeBatch>> {
        self.inner.borrow_mut().poll(subscription)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.inner.borrow_mut().unsubscribe(subscription)
    }
}
