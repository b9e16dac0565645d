//! Local tree state: validated mutations and ordered views.
//!
//! # Responsibility
//! - Own the canonical in-memory forest and its structural invariants.
//! - Produce immutable ordered snapshots for the rendering layer.
//!
//! # Invariants
//! - All validation happens before mutation; failed operations leave the
//!   state unchanged.
//! - Snapshots are deterministic for a given state.

pub mod rank;
pub mod snapshot;
pub mod tree_store;
