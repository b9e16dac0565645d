//! Core domain logic for atomboard: an ordered note tree ("atoms") per
//! board, kept consistent with a hosted document store.
//! This crate is the single source of truth for business invariants.

pub mod logging;
pub mod model;
pub mod store;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::atom::{Atom, AtomId};
pub use model::board::{Board, BoardId};
pub use store::snapshot::{Snapshot, SnapshotNode};
pub use store::tree_store::{StoreError, StoreResult, TitleScope, TreeStore};
pub use sync::document::{ChangeBatch, ChangeEvent, Collection, Document};
pub use sync::document_store::{DocumentStore, StoreIoError, StoreIoResult, SubscriptionId};
pub use sync::memory_store::{MemoryDocumentStore, SharedMemoryStore};
pub use sync::reconciler::{
    create_board, fold_batch, BoardReconciler, SnapshotObserver, SyncError, SyncResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
