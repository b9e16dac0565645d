//! Synchronization layer between the local tree and the document store.
//!
//! # Responsibility
//! - Define the document store seam and its wire types.
//! - Reconcile board-scoped change streams into the local tree state.
//!
//! # Invariants
//! - The local state is written only by the reconciler: either folding
//!   confirmed remote changes or applying a local mutation it immediately
//!   persists (rolled back on failure).

pub mod document;
pub mod document_store;
pub mod memory_store;
pub mod reconciler;
