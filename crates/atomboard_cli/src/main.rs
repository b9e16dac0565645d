//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `atomboard_core` end to end over the in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use atomboard_core::{create_board, BoardReconciler, MemoryDocumentStore, SnapshotNode};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("atomboard_core version={}", atomboard_core::core_version());

    let mut store = MemoryDocumentStore::new();
    let board = create_board(&mut store, "demo")?;
    let mut reconciler = BoardReconciler::open(store, board.id)?;

    let intro = reconciler.create_atom(None, "Intro")?;
    let details = reconciler.create_atom(Some(intro.id), "Details")?;
    reconciler.create_atom(Some(intro.id), "Background")?;
    reconciler.update_content(intro.id, "# Hello")?;

    // Promote "Details" to the first root position.
    reconciler.move_atom(details.id, None, 0)?;
    reconciler.pump();

    let snapshot = reconciler.snapshot();
    let title = snapshot
        .board
        .as_ref()
        .map(|b| b.title.as_str())
        .unwrap_or("<missing>");
    println!("board \"{title}\" ({} atoms)", snapshot.len());
    for root in &snapshot.roots {
        print_outline(root, 1);
    }
    Ok(())
}

fn print_outline(node: &SnapshotNode, depth: usize) {
    println!("{}- {}", "  ".repeat(depth), node.title);
    for child in &node.children {
        print_outline(child, depth + 1);
    }
}
