//! Immutable ordered forest view.
//!
//! # Responsibility
//! - Turn the flat atom set of one board into a recursively ordered tree.
//!
//! # Invariants
//! - Children are sorted by `(rank, id)` ascending at every level.
//! - Atoms whose parent is absent from the board are omitted from the view;
//!   they reappear once the parent document arrives.

use crate::model::atom::{Atom, AtomId};
use crate::model::board::Board;
use serde::Serialize;
use std::collections::BTreeMap;

/// One rendered tree entry with its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotNode {
    pub id: AtomId,
    pub title: String,
    pub content: String,
    pub rank: i64,
    pub updated_at: i64,
    pub children: Vec<SnapshotNode>,
}

/// Fully ordered view of one board handed to observers.
///
/// `board` is `None` when the board document itself is not (or no longer)
/// present; the roots are empty in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub board: Option<Board>,
    pub roots: Vec<SnapshotNode>,
}

impl Snapshot {
    /// Returns an empty snapshot for an unknown board.
    pub fn empty() -> Self {
        Self {
            board: None,
            roots: Vec::new(),
        }
    }

    /// Builds the ordered forest for `board` from the given atoms.
    ///
    /// `atoms` must already be filtered to the board in question.
    pub fn build(board: Option<Board>, atoms: &[&Atom]) -> Self {
        if board.is_none() {
            return Self::empty();
        }

        let mut by_parent: BTreeMap<Option<AtomId>, Vec<&Atom>> = BTreeMap::new();
        for &atom in atoms {
            by_parent.entry(atom.parent_id).or_default().push(atom);
        }
        let roots = collect_children(&by_parent, None);
        Self { board, roots }
    }

    /// Returns how many atoms the view contains across all levels.
    pub fn len(&self) -> usize {
        fn count(nodes: &[SnapshotNode]) -> usize {
            nodes.iter().map(|node| 1 + count(&node.children)).sum()
        }
        count(&self.roots)
    }

    /// Returns whether the view contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn collect_children(
    by_parent: &BTreeMap<Option<AtomId>, Vec<&Atom>>,
    parent: Option<AtomId>,
) -> Vec<SnapshotNode> {
    let mut siblings = match by_parent.get(&parent) {
        Some(entries) => entries.clone(),
        None => return Vec::new(),
    };
    siblings.sort_by_key(|atom| (atom.rank, atom.id));
    siblings
        .into_iter()
        .map(|atom| SnapshotNode {
            id: atom.id,
            title: atom.title.clone(),
            content: atom.content.clone(),
            rank: atom.rank,
            updated_at: atom.updated_at,
            children: collect_children(by_parent, Some(atom.id)),
        })
        .collect()
}
