//! End-to-end tests for the versioned history engine.
//!
//! Covers the done/undo/redo round trip, forks and their isolation, popping
//! versions, amending the active version and reopening a domain from the
//! stored bookkeeping.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quadstore::{Edge, Error, History, HistoryManager, Node, QuadStore};

// ============================================================================
// Helpers
// ============================================================================

struct Fixture {
    store: QuadStore,
    manager: HistoryManager,
    history: History,
    pred: Node,
}

fn setup() -> Fixture {
    let store = QuadStore::open_memory();
    let manager = HistoryManager::with_defaults(&store).unwrap();
    let history = manager.create().unwrap();
    let pred = store.new_value_node("rel").unwrap();
    Fixture { store, manager, history, pred }
}

impl Fixture {
    fn edge(&self, s: &str, o: &str) -> Edge {
        let s = self.store.new_value_node(s).unwrap();
        let o = self.store.new_value_node(o).unwrap();
        self.history.new_edge(&self.pred, &s, &o).unwrap()
    }

    fn content(&self) -> Vec<Edge> {
        self.history.edges().unwrap().to_vec().unwrap()
    }

    fn done(&self, edges: &[Edge]) -> quadstore::Version {
        let set = self.store.new_edges(edges.iter().copied()).unwrap();
        self.history.done(&set).unwrap()
    }
}

// ============================================================================
// 1. done / undo / redo
// ============================================================================

#[test]
fn test_round_trip() {
    let fx = setup();
    let root = fx.history.version().unwrap();
    let e1 = fx.edge("a", "b");
    let before = fx.content();

    let v1 = fx.done(&[e1]);
    let after = fx.content();
    assert_eq!(after, vec![e1]);
    assert_eq!(fx.history.predecessor(v1).unwrap(), Some(root));
    assert_eq!(fx.history.inserted(v1).unwrap().to_vec().unwrap(), vec![e1]);

    assert!(fx.history.undo().unwrap());
    assert_eq!(fx.content(), before);
    assert_eq!(fx.history.version().unwrap(), root);

    assert!(fx.history.redo().unwrap());
    assert_eq!(fx.content(), after);
    assert_eq!(fx.history.version().unwrap(), v1);
}

#[test]
fn test_boundaries_are_not_errors() {
    let fx = setup();
    assert!(!fx.history.undo().unwrap());
    assert!(!fx.history.redo().unwrap());
    assert!(!fx.history.pop().unwrap());
    assert_eq!(fx.history.fork().unwrap(), None);
}

#[test]
fn test_done_diff_records_both_directions() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e2 = fx.edge("b", "c");
    fx.done(&[e1]);

    let put = fx.store.new_edges([e2]).unwrap();
    let pop = fx.store.new_edges([e1]).unwrap();
    let v2 = fx.history.done_diff(&put, &pop).unwrap();

    assert_eq!(fx.content(), vec![e2]);
    assert_eq!(fx.history.inserted(v2).unwrap().to_vec().unwrap(), vec![e2]);
    assert_eq!(fx.history.deleted(v2).unwrap().to_vec().unwrap(), vec![e1]);

    assert!(fx.history.undo().unwrap());
    assert_eq!(fx.content(), vec![e1]);
}

#[test]
fn test_done_only_records_actual_changes() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    fx.done(&[e1]);
    let v2 = fx.done(&[e1]);
    assert!(fx.history.inserted(v2).unwrap().is_empty().unwrap());
    assert!(fx.history.deleted(v2).unwrap().is_empty().unwrap());
}

#[test]
fn test_done_discards_redo_line() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e2 = fx.edge("c", "d");
    let v1 = fx.done(&[e1]);
    fx.history.undo().unwrap();

    let v2 = fx.done(&[e2]);
    let root = fx.history.root().unwrap();
    assert_eq!(fx.history.successors(root).unwrap(), vec![v2]);
    assert!(fx.history.versions().unwrap().iter().all(|v| *v != v1));
    assert!(!fx.history.redo().unwrap());
}

// ============================================================================
// 2. fork
// ============================================================================

#[test]
fn test_fork_creates_isolated_branch() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e2 = fx.edge("b", "c");
    let v1 = fx.done(&[e1]);

    let f = fx.history.fork().unwrap().unwrap();
    assert_eq!(fx.history.version().unwrap(), f);
    assert_eq!(fx.history.branch_parent(f).unwrap(), Some(v1));
    assert_eq!(fx.history.predecessor(f).unwrap(), fx.history.predecessor(v1).unwrap());
    // Forking does not touch the live content.
    assert_eq!(fx.content(), vec![e1]);

    let recorded_v1 = fx.history.inserted(v1).unwrap().to_vec().unwrap();
    fx.done(&[e2]);
    assert_eq!(fx.history.inserted(v1).unwrap().to_vec().unwrap(), recorded_v1);
    assert!(fx.history.deleted(v1).unwrap().is_empty().unwrap());
}

#[test]
fn test_commit_after_undo_keeps_fork_branches() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e3 = fx.edge("x", "y");
    let v1 = fx.done(&[e1]);
    let f = fx.history.fork().unwrap().unwrap();

    // Back to the root and commit something else.
    assert!(fx.history.undo().unwrap());
    let v3 = fx.done(&[e3]);

    let root = fx.history.root().unwrap();
    let successors = fx.history.successors(root).unwrap();
    assert!(successors.contains(&f));
    assert!(successors.contains(&v3));
    assert!(!successors.contains(&v1));
    // The fork lost its parent, not its content.
    assert_eq!(fx.history.branch_parent(f).unwrap(), None);
    assert_eq!(fx.history.inserted(f).unwrap().to_vec().unwrap(), vec![e1]);
}

#[test]
fn test_redo_to_picks_branch() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let v1 = fx.done(&[e1]);
    let f = fx.history.fork().unwrap().unwrap();
    fx.history.undo().unwrap();

    // `undo` from the fork remembers it.
    assert!(fx.history.redo().unwrap());
    assert_eq!(fx.history.version().unwrap(), f);

    fx.history.undo().unwrap();
    assert!(fx.history.redo_to(v1).unwrap());
    assert_eq!(fx.history.version().unwrap(), v1);
    assert_eq!(fx.content(), vec![e1]);

    let stranger = fx.history.root().unwrap();
    assert!(matches!(fx.history.redo_to(stranger), Err(Error::InvalidArgument(_))));
}

// ============================================================================
// 3. pop
// ============================================================================

#[test]
fn test_pop_removes_subtree_and_reverts() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e2 = fx.edge("b", "c");
    let v1 = fx.done(&[e1]);
    fx.done(&[e2]);
    fx.history.undo().unwrap();
    assert_eq!(fx.history.version().unwrap(), v1);

    let edges_before = fx.store.edges().len().unwrap();
    assert!(fx.history.pop().unwrap());

    let root = fx.history.root().unwrap();
    assert_eq!(fx.history.version().unwrap(), root);
    assert!(fx.content().is_empty());
    assert_eq!(fx.history.versions().unwrap(), vec![root]);
    // v1 and v2 with their diffs and links are gone.
    assert!(fx.store.edges().len().unwrap() < edges_before);
    assert!(fx.history.successors(root).unwrap().is_empty());
}

// ============================================================================
// 4. Amending the active version
// ============================================================================

#[test]
fn test_amend_cancels_within_version() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let e2 = fx.edge("c", "d");
    let v1 = fx.done(&[e1]);

    assert!(fx.history.put_edges(&fx.store.new_edges([e2]).unwrap()).unwrap());
    assert_eq!(fx.history.inserted(v1).unwrap().to_vec().unwrap(), vec![e1, e2]);

    // Removing what this version added takes it out of the diff.
    assert!(fx.history.pop_edges(&fx.store.new_edges([e1]).unwrap()).unwrap());
    assert_eq!(fx.history.inserted(v1).unwrap().to_vec().unwrap(), vec![e2]);
    assert!(fx.history.deleted(v1).unwrap().is_empty().unwrap());
    assert_eq!(fx.content(), vec![e2]);

    assert!(fx.history.undo().unwrap());
    assert!(fx.content().is_empty());
}

// ============================================================================
// 5. Reopening
// ============================================================================

#[test]
fn test_reopen_from_stored_quads() {
    let fx = setup();
    let e1 = fx.edge("a", "b");
    let v1 = fx.done(&[e1]);

    let other = HistoryManager::with_defaults(&fx.store).unwrap();
    let reopened = other.open(&fx.history.domain()).unwrap();
    assert_eq!(reopened.check().unwrap(), v1);
    assert!(reopened.undo().unwrap());
    assert!(fx.content().is_empty());

    let info = fx.history.describe(v1).unwrap();
    assert!(!info.active);
    assert_eq!(info.inserted, 1);
    assert_eq!(fx.manager.domains().unwrap(), vec![fx.history.domain()]);
}

#[test]
fn test_create_for_existing_context_twice_fails() {
    let fx = setup();
    let domain = fx.history.domain();
    assert!(matches!(fx.manager.create_for(&domain), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_two_active_links_are_corrupt() {
    let fx = setup();
    let active = fx.store.get_node("qs:active").unwrap().unwrap();
    let ctx = fx.manager.context();
    let stray = fx.store.new_node().unwrap();
    let bad = fx.store.new_edge(&ctx, &active, &fx.history.domain(), &stray).unwrap();
    fx.store.put_edge(&bad).unwrap();
    assert!(matches!(fx.history.version(), Err(Error::CorruptHistory(_))));
}

// ============================================================================
// 6. Round trip property
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn done_undo_redo_round_trip(
        initial in prop::collection::vec((0..4u8, 0..4u8), 0..6),
        change in prop::collection::vec((0..4u8, 0..4u8), 0..6),
        removed in prop::collection::vec((0..4u8, 0..4u8), 0..6),
    ) {
        let fx = setup();
        let to_edges = |pairs: &[(u8, u8)]| -> Vec<Edge> {
            pairs.iter().map(|(s, o)| fx.edge(&s.to_string(), &o.to_string())).collect()
        };
        fx.done(&to_edges(&initial));
        let before = fx.content();

        let put = fx.store.new_edges(to_edges(&change)).unwrap();
        let pop = fx.store.new_edges(to_edges(&removed)).unwrap();
        fx.history.done_diff(&put, &pop).unwrap();
        let after = fx.content();

        prop_assert!(fx.history.undo().unwrap());
        prop_assert_eq!(fx.content(), before);
        prop_assert!(fx.history.redo().unwrap());
        prop_assert_eq!(fx.content(), after);
    }
}
