//! Expression trees behind every view.
//!
//! A view never holds rows. It holds an `Arc<Expr<K>>`: set operations that
//! are common to all kinds live in [`Expr`], kind-specific operators live in
//! the kind's `Op` enum. Backends compile or interpret the whole tree at
//! enumeration time.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::model::*;
use crate::storage::{Cursor, StorageBackend};
use crate::Result;

// ============================================================================
// Kinds
// ============================================================================

/// A family of views: what a row is, what a user-facing item is, and which
/// operators exist besides union/intersect/except.
pub trait Kind: Debug + Sized + Send + Sync + 'static {
    /// Backend-level row.
    type Row: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static;
    /// Owner-tagged item handed to callers.
    type Item: Clone + Eq + Hash + Debug;
    /// Kind-specific operators.
    type Op: Debug + Send + Sync + 'static;

    const NAME: &'static str;

    /// Dispatch to the matching `StorageBackend::scan_*`.
    fn scan(backend: &dyn StorageBackend, expr: &Expr<Self>) -> Result<Cursor<Self::Row>>;

    fn lift(store: StoreId, row: Self::Row) -> Self::Item;

    /// Strip the owner tag. Fails with `OwnerMismatch` for foreign items.
    fn lower(store: StoreId, item: &Self::Item) -> Result<Self::Row>;
}

/// Quads.
#[derive(Debug)]
pub struct Edges;

/// Nodes.
#[derive(Debug)]
pub struct Nodes;

/// Value strings.
#[derive(Debug)]
pub struct Values;

/// N-ary tuples. Role names live on the view, not in the tree.
#[derive(Debug)]
pub struct Tuples;

// ============================================================================
// Expression
// ============================================================================

/// Lazily evaluated set expression over rows of kind `K`.
#[derive(Debug)]
pub enum Expr<K: Kind> {
    /// Materialized rows, sorted and free of duplicates.
    Literal(Arc<[K::Row]>),
    Union(Arc<Expr<K>>, Arc<Expr<K>>),
    Intersect(Arc<Expr<K>>, Arc<Expr<K>>),
    Except(Arc<Expr<K>>, Arc<Expr<K>>),
    Op(K::Op),
}

impl<K: Kind> Expr<K> {
    pub fn empty() -> Self {
        Expr::Literal(Arc::from(Vec::new()))
    }

    /// Sorts and deduplicates `rows` into a literal.
    pub fn literal(mut rows: Vec<K::Row>) -> Self {
        rows.sort_unstable();
        rows.dedup();
        Expr::Literal(rows.into())
    }

    /// Whether this expression is a literal without rows.
    pub fn is_empty_literal(&self) -> bool {
        matches!(self, Expr::Literal(rows) if rows.is_empty())
    }
}

/// Node operand of filters and substitutions.
#[derive(Debug, Clone)]
pub enum NodeFilter {
    Node(NodeKey),
    Nodes(Arc<Expr<Nodes>>),
}

impl NodeFilter {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeFilter::Nodes(set) if set.is_empty_literal())
    }
}

// ============================================================================
// Kind-specific operators
// ============================================================================

#[derive(Debug)]
pub enum EdgeOp {
    /// Every quad in the store.
    Store,
    /// Quads whose `role` (any role when `None`) matches `filter`.
    Having {
        input: Arc<Expr<Edges>>,
        role: Option<Role>,
        filter: NodeFilter,
    },
    /// Quads with `role` replaced by the filter's node(s).
    With {
        input: Arc<Expr<Edges>>,
        role: Role,
        filter: NodeFilter,
    },
    /// Tuples read back as quads; `roles` gives the tuple position for C, P, S, O.
    FromTuples {
        input: Arc<Expr<Tuples>>,
        roles: [usize; 4],
    },
}

#[derive(Debug)]
pub enum NodeOp {
    /// Every known node: value-bound or referenced by a quad.
    Store,
    /// Nodes used by quads in `role` (all roles when `None`).
    Roles {
        input: Arc<Expr<Edges>>,
        role: Option<Role>,
    },
    /// Nodes bound to the given values.
    OfValues(Arc<Expr<Values>>),
    /// Nodes at one tuple position.
    TupleRole {
        input: Arc<Expr<Tuples>>,
        role: usize,
    },
}

#[derive(Debug)]
pub enum ValueOp {
    /// Every bound value.
    Store,
    /// Values bound to the given nodes.
    OfNodes(Arc<Expr<Nodes>>),
}

#[derive(Debug)]
pub enum TupleOp {
    /// Quads as 4-tuples in `C, P, S, O` order.
    FromEdges(Arc<Expr<Edges>>),
    /// Distinct projection onto `roles`, in that order.
    Select {
        input: Arc<Expr<Tuples>>,
        roles: SmallVec<[usize; 4]>,
    },
    With {
        input: Arc<Expr<Tuples>>,
        role: usize,
        filter: NodeFilter,
    },
    Having {
        input: Arc<Expr<Tuples>>,
        role: usize,
        filter: NodeFilter,
    },
    /// Natural join on the `on` position pairs (left, right); the output row is
    /// the left row followed by the right row's `keep` positions. An empty
    /// `on` is a cross join.
    Join {
        left: Arc<Expr<Tuples>>,
        right: Arc<Expr<Tuples>>,
        on: SmallVec<[(usize, usize); 4]>,
        keep: SmallVec<[usize; 4]>,
    },
}

// ============================================================================
// Kind impls
// ============================================================================

fn check_owner(store: StoreId, found: StoreId) -> Result<()> {
    if store == found {
        Ok(())
    } else {
        Err(crate::Error::OwnerMismatch { expected: store, found })
    }
}

impl Kind for Edges {
    type Row = Quad;
    type Item = Edge;
    type Op = EdgeOp;
    const NAME: &'static str = "edges";

    fn scan(backend: &dyn StorageBackend, expr: &Expr<Self>) -> Result<Cursor<Quad>> {
        backend.scan_edges(expr)
    }

    fn lift(store: StoreId, row: Quad) -> Edge {
        Edge::new(store, row)
    }

    fn lower(store: StoreId, item: &Edge) -> Result<Quad> {
        check_owner(store, item.store())?;
        Ok(item.quad())
    }
}

impl Kind for Nodes {
    type Row = NodeKey;
    type Item = Node;
    type Op = NodeOp;
    const NAME: &'static str = "nodes";

    fn scan(backend: &dyn StorageBackend, expr: &Expr<Self>) -> Result<Cursor<NodeKey>> {
        backend.scan_nodes(expr)
    }

    fn lift(store: StoreId, row: NodeKey) -> Node {
        Node::new(store, row)
    }

    fn lower(store: StoreId, item: &Node) -> Result<NodeKey> {
        check_owner(store, item.store())?;
        Ok(item.key())
    }
}

impl Kind for Values {
    type Row = String;
    type Item = String;
    type Op = ValueOp;
    const NAME: &'static str = "values";

    fn scan(backend: &dyn StorageBackend, expr: &Expr<Self>) -> Result<Cursor<String>> {
        backend.scan_values(expr)
    }

    fn lift(_store: StoreId, row: String) -> String {
        row
    }

    fn lower(_store: StoreId, item: &String) -> Result<String> {
        Ok(item.clone())
    }
}

impl Kind for Tuples {
    type Row = TupleRow;
    type Item = Tuple;
    type Op = TupleOp;
    const NAME: &'static str = "tuples";

    fn scan(backend: &dyn StorageBackend, expr: &Expr<Self>) -> Result<Cursor<TupleRow>> {
        backend.scan_tuples(expr)
    }

    fn lift(store: StoreId, row: TupleRow) -> Tuple {
        Tuple::new(store, row)
    }

    fn lower(store: StoreId, item: &Tuple) -> Result<TupleRow> {
        check_owner(store, item.store())?;
        Ok(item.row().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_sorts_and_dedups() {
        let expr: Expr<Nodes> = Expr::literal(vec![NodeKey(3), NodeKey(1), NodeKey(3)]);
        match expr {
            Expr::Literal(rows) => assert_eq!(&rows[..], &[NodeKey(1), NodeKey(3)]),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_filter_detection() {
        let filter = NodeFilter::Nodes(Arc::new(Expr::empty()));
        assert!(filter.is_empty());
        assert!(!NodeFilter::Node(NodeKey(1)).is_empty());
    }
}
