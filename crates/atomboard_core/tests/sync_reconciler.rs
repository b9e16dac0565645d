use atomboard_core::{
    create_board, fold_batch, Atom, Board, BoardReconciler, ChangeBatch, ChangeEvent, Collection,
    Document, DocumentStore, MemoryDocumentStore, SharedMemoryStore, Snapshot, SnapshotObserver,
    StoreError, StoreIoError, SyncError, TreeStore,
};
use std::cell::RefCell;
use std::sync::Arc;

#[derive(Default)]
struct Recorder {
    snapshots: RefCell<Vec<Snapshot>>,
    lost: RefCell<Vec<String>>,
}

impl SnapshotObserver for Recorder {
    fn snapshot_changed(&self, snapshot: &Snapshot) {
        self.snapshots.borrow_mut().push(snapshot.clone());
    }

    fn sync_lost(&self, reason: &str) {
        self.lost.borrow_mut().push(reason.to_string());
    }
}

#[test]
fn create_board_checks_remote_titles() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    assert_eq!(board.title, "demo");

    let err = create_board(&mut store, "demo").unwrap_err();
    assert!(matches!(
        err,
        SyncError::Store(StoreError::DuplicateBoard(title)) if title == "demo"
    ));
    assert!(matches!(
        create_board(&mut store, "  "),
        Err(SyncError::Store(StoreError::InvalidTitle))
    ));
}

#[test]
fn open_folds_the_existing_document_set() {
    let mut store = MemoryDocumentStore::new();
    let board = Board::new("demo");
    store.upsert(&Document::Board(board.clone())).unwrap();
    let root = Atom::new(board.id, None, "Root", 0);
    let child = Atom::new(board.id, Some(root.id), "Child", 0);
    store.upsert(&Document::Atom(root.clone())).unwrap();
    store.upsert(&Document::Atom(child.clone())).unwrap();

    let reconciler = BoardReconciler::open(store, board.id).unwrap();
    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.board.as_ref().unwrap().title, "demo");
    assert_eq!(snapshot.roots.len(), 1);
    assert_eq!(snapshot.roots[0].id, root.id);
    assert_eq!(snapshot.roots[0].children[0].id, child.id);
}

#[test]
fn fold_batch_is_idempotent() {
    let board = Board::new("demo");
    let kept = Atom::new(board.id, None, "Kept", 0);
    let dropped = Atom::new(board.id, None, "Dropped", 1024);
    let batch = ChangeBatch::new(vec![
        ChangeEvent::BoardUpserted(board.clone()),
        ChangeEvent::AtomUpserted(kept.clone()),
        ChangeEvent::AtomUpserted(dropped.clone()),
        ChangeEvent::AtomDeleted(dropped.id),
    ]);

    let mut once = TreeStore::new();
    fold_batch(&mut once, &batch);
    let mut twice = once.clone();
    fold_batch(&mut twice, &batch);
    assert_eq!(once, twice);
}

#[test]
fn deletions_apply_before_upserts_within_a_batch() {
    // A delete-then-recreate of the same id in one batch must end present,
    // even when the delete event arrives after the upsert.
    let board = Board::new("demo");
    let mut recreated = Atom::new(board.id, None, "Recreated", 0);
    recreated.content = "v2".to_string();

    let mut state = TreeStore::new();
    fold_batch(
        &mut state,
        &ChangeBatch::new(vec![
            ChangeEvent::BoardUpserted(board.clone()),
            ChangeEvent::AtomUpserted(recreated.clone()),
            ChangeEvent::AtomDeleted(recreated.id),
        ]),
    );
    assert_eq!(state.atom(recreated.id).unwrap().content, "v2");
}

#[test]
fn last_upsert_for_an_id_wins_within_a_batch() {
    let board = Board::new("demo");
    let atom = Atom::new(board.id, None, "A", 0);
    let mut newer = atom.clone();
    newer.content = "newer".to_string();

    let mut state = TreeStore::new();
    fold_batch(
        &mut state,
        &ChangeBatch::new(vec![
            ChangeEvent::BoardUpserted(board),
            ChangeEvent::AtomUpserted(atom.clone()),
            ChangeEvent::AtomUpserted(newer),
        ]),
    );
    assert_eq!(state.atom(atom.id).unwrap().content, "newer");
}

#[test]
fn transport_failure_rolls_back_the_optimistic_state() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    let mut reconciler = BoardReconciler::open(store, board.id).unwrap();
    reconciler.create_atom(None, "Stable").unwrap();
    let before = reconciler.snapshot();

    reconciler
        .store_mut()
        .inject_write_failure(StoreIoError::Transport("connection reset".into()));
    let err = reconciler.create_atom(None, "Ghost").unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)));
    assert_eq!(reconciler.snapshot(), before);

    // The rejected intent can simply be retried.
    reconciler.create_atom(None, "Ghost").unwrap();
    assert_eq!(reconciler.snapshot().roots.len(), 2);
}

#[test]
fn timeout_is_surfaced_distinctly_from_transport_failure() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    let mut reconciler = BoardReconciler::open(store, board.id).unwrap();

    reconciler
        .store_mut()
        .inject_write_failure(StoreIoError::Timeout("write deadline exceeded".into()));
    let err = reconciler.create_atom(None, "Slow").unwrap_err();
    assert!(matches!(err, SyncError::Timeout(_)));
    assert!(reconciler.snapshot().is_empty());
}

#[test]
fn validation_errors_never_reach_the_remote_store() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    let mut reconciler = BoardReconciler::open(store, board.id).unwrap();
    reconciler.create_atom(None, "A").unwrap();

    let err = reconciler.create_atom(None, "A").unwrap_err();
    assert!(matches!(
        err,
        SyncError::Store(StoreError::DuplicateTitle(_))
    ));
    assert_eq!(
        reconciler.store_mut().collection_len(Collection::Atoms),
        1
    );
}

#[test]
fn dropped_subscription_signals_sync_lost_once() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    let mut reconciler = BoardReconciler::open(store, board.id).unwrap();
    let recorder = Arc::new(Recorder::default());
    reconciler.register_observer(recorder.clone());

    let atom_sub = reconciler.atom_subscription();
    reconciler
        .store_mut()
        .drop_subscription(atom_sub, "network gone");
    reconciler.pump();
    reconciler.pump();

    let lost = recorder.lost.borrow();
    assert_eq!(lost.len(), 1);
    assert!(lost[0].contains("network gone"));
    // The local view stays intact rather than turning into an empty tree.
    assert!(recorder.snapshots.borrow().is_empty());
}

#[test]
fn observers_see_local_mutations_and_remote_batches() {
    let shared = SharedMemoryStore::new();
    let mut handle = shared.clone();
    let board = create_board(&mut handle, "demo").unwrap();

    let mut editor = BoardReconciler::open(shared.clone(), board.id).unwrap();
    let mut viewer = BoardReconciler::open(shared.clone(), board.id).unwrap();
    let recorder = Arc::new(Recorder::default());
    viewer.register_observer(recorder.clone());

    editor.create_atom(None, "Intro").unwrap();
    assert!(viewer.pump());
    let snapshots = recorder.snapshots.borrow();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].roots[0].title, "Intro");
    drop(snapshots);

    // No change, no notification.
    assert!(!viewer.pump());
    assert_eq!(recorder.snapshots.borrow().len(), 1);
}

#[test]
fn two_reconcilers_on_one_store_converge() {
    let shared = SharedMemoryStore::new();
    let mut handle = shared.clone();
    let board = create_board(&mut handle, "demo").unwrap();

    let mut left = BoardReconciler::open(shared.clone(), board.id).unwrap();
    let mut right = BoardReconciler::open(shared.clone(), board.id).unwrap();

    let intro = left.create_atom(None, "Intro").unwrap();
    let details = left.create_atom(Some(intro.id), "Details").unwrap();
    right.pump();
    right.move_atom(details.id, None, 0).unwrap();
    right.rename_board("demo-renamed").unwrap();
    left.pump();

    assert_eq!(left.snapshot(), right.snapshot());
    let snapshot = left.snapshot();
    assert_eq!(snapshot.board.as_ref().unwrap().title, "demo-renamed");
    assert_eq!(snapshot.roots[0].id, details.id);
    assert_eq!(snapshot.roots[1].id, intro.id);
}

#[test]
fn update_then_clear_content_round_trip() {
    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo").unwrap();
    let mut reconciler = BoardReconciler::open(store, board.id).unwrap();
    let n1 = reconciler.create_atom(None, "Intro").unwrap();

    reconciler.update_content(n1.id, "# Hello").unwrap();
    let cleared = reconciler.clear_content(n1.id).unwrap();
    assert_eq!(cleared.content, "");
    assert_eq!(cleared.title, "Intro");
}

#[test]
fn delete_board_cascades_remotely() {
    let shared = SharedMemoryStore::new();
    let mut handle = shared.clone();
    let board = create_board(&mut handle, "demo").unwrap();

    let mut reconciler = BoardReconciler::open(shared.clone(), board.id).unwrap();
    let root = reconciler.create_atom(None, "Root").unwrap();
    reconciler.create_atom(Some(root.id), "Child").unwrap();

    reconciler.delete_board().unwrap();
    assert!(reconciler.snapshot().board.is_none());
    assert!(reconciler.snapshot().is_empty());
    assert_eq!(shared.inner().collection_len(Collection::Atoms), 0);
    assert_eq!(shared.inner().collection_len(Collection::Boards), 0);
}

#[test]
fn cascade_failure_rolls_back_and_retry_converges() {
    let shared = SharedMemoryStore::new();
    let mut handle = shared.clone();
    let board = create_board(&mut handle, "demo").unwrap();

    let mut reconciler = BoardReconciler::open(shared.clone(), board.id).unwrap();
    reconciler.create_atom(None, "A").unwrap();
    reconciler.create_atom(None, "B").unwrap();

    shared
        .inner()
        .inject_write_failure(StoreIoError::Transport("mid-cascade".into()));
    let err = reconciler.delete_board().unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)));
    // Local state is back to the confirmed view.
    assert_eq!(reconciler.snapshot().roots.len(), 2);

    // Deletes are idempotent, so retrying finishes the cascade.
    reconciler.delete_board().unwrap();
    assert_eq!(shared.inner().collection_len(Collection::Atoms), 0);
    assert_eq!(shared.inner().collection_len(Collection::Boards), 0);
}
