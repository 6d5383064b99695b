//! Expression planner: simplifies set expressions while they are built.
//!
//! Views call these constructors instead of building [`Expr`] nodes
//! directly, so every tree a backend receives is already simplified. The
//! rules are purely structural and backend-agnostic:
//!
//! - an empty literal absorbs intersections, filters, substitutions and joins;
//! - union with an empty literal is the other operand;
//! - `x ∪ x`, `x ∩ x` are `x` and `x \ x` is empty (same tree only);
//! - two literals are folded into one literal.
//!
//! No cost-based optimization happens here.

use std::sync::Arc;

use crate::algebra::{EdgeOp, Edges, Expr, Kind, NodeOp, Nodes, TupleOp, Tuples, ValueOp, Values};

fn empty<K: Kind>() -> Arc<Expr<K>> {
    Arc::new(Expr::empty())
}

fn literals<'a, K: Kind>(a: &'a Expr<K>, b: &'a Expr<K>) -> Option<(&'a [K::Row], &'a [K::Row])> {
    match (a, b) {
        (Expr::Literal(a), Expr::Literal(b)) => Some((a, b)),
        _ => None,
    }
}

pub fn union<K: Kind>(a: Arc<Expr<K>>, b: Arc<Expr<K>>) -> Arc<Expr<K>> {
    if a.is_empty_literal() || Arc::ptr_eq(&a, &b) {
        return b;
    }
    if b.is_empty_literal() {
        return a;
    }
    if let Some((x, y)) = literals(&a, &b) {
        return Arc::new(Expr::literal(x.iter().chain(y).cloned().collect()));
    }
    Arc::new(Expr::Union(a, b))
}

pub fn intersect<K: Kind>(a: Arc<Expr<K>>, b: Arc<Expr<K>>) -> Arc<Expr<K>> {
    if a.is_empty_literal() || Arc::ptr_eq(&a, &b) {
        return a;
    }
    if b.is_empty_literal() {
        return b;
    }
    if let Some((x, y)) = literals(&a, &b) {
        let rows = x.iter().filter(|row| y.binary_search(row).is_ok()).cloned().collect();
        return Arc::new(Expr::literal(rows));
    }
    Arc::new(Expr::Intersect(a, b))
}

pub fn except<K: Kind>(a: Arc<Expr<K>>, b: Arc<Expr<K>>) -> Arc<Expr<K>> {
    if a.is_empty_literal() || b.is_empty_literal() {
        return a;
    }
    if Arc::ptr_eq(&a, &b) {
        return empty();
    }
    if let Some((x, y)) = literals(&a, &b) {
        let rows = x.iter().filter(|row| y.binary_search(row).is_err()).cloned().collect();
        return Arc::new(Expr::literal(rows));
    }
    Arc::new(Expr::Except(a, b))
}

pub fn edges(op: EdgeOp) -> Arc<Expr<Edges>> {
    let absorbed = match &op {
        EdgeOp::Store => false,
        EdgeOp::Having { input, filter, .. } | EdgeOp::With { input, filter, .. } => {
            input.is_empty_literal() || filter.is_empty()
        }
        EdgeOp::FromTuples { input, .. } => input.is_empty_literal(),
    };
    if absorbed { empty() } else { Arc::new(Expr::Op(op)) }
}

pub fn nodes(op: NodeOp) -> Arc<Expr<Nodes>> {
    let absorbed = match &op {
        NodeOp::Store => false,
        NodeOp::Roles { input, .. } => input.is_empty_literal(),
        NodeOp::OfValues(input) => input.is_empty_literal(),
        NodeOp::TupleRole { input, .. } => input.is_empty_literal(),
    };
    if absorbed { empty() } else { Arc::new(Expr::Op(op)) }
}

pub fn values(op: ValueOp) -> Arc<Expr<Values>> {
    let absorbed = match &op {
        ValueOp::Store => false,
        ValueOp::OfNodes(input) => input.is_empty_literal(),
    };
    if absorbed { empty() } else { Arc::new(Expr::Op(op)) }
}

pub fn tuples(op: TupleOp) -> Arc<Expr<Tuples>> {
    let absorbed = match &op {
        TupleOp::FromEdges(input) => input.is_empty_literal(),
        TupleOp::Select { input, .. } => input.is_empty_literal(),
        TupleOp::With { input, filter, .. } | TupleOp::Having { input, filter, .. } => {
            input.is_empty_literal() || filter.is_empty()
        }
        TupleOp::Join { left, right, .. } => left.is_empty_literal() || right.is_empty_literal(),
    };
    if absorbed { empty() } else { Arc::new(Expr::Op(op)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::NodeFilter;
    use crate::model::{NodeKey, Role};

    fn lit(keys: &[u64]) -> Arc<Expr<Nodes>> {
        Arc::new(Expr::literal(keys.iter().map(|k| NodeKey(*k)).collect()))
    }

    fn rows(expr: &Expr<Nodes>) -> Vec<u64> {
        match expr {
            Expr::Literal(rows) => rows.iter().map(|k| k.0).collect(),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_folding() {
        assert_eq!(rows(&union(lit(&[1, 3]), lit(&[2, 3]))), vec![1, 2, 3]);
        assert_eq!(rows(&intersect(lit(&[1, 3]), lit(&[2, 3]))), vec![3]);
        assert_eq!(rows(&except(lit(&[1, 3]), lit(&[2, 3]))), vec![1]);
    }

    #[test]
    fn test_same_tree_shortcuts() {
        let store = nodes(NodeOp::Store);
        assert!(except(store.clone(), store.clone()).is_empty_literal());
        assert!(Arc::ptr_eq(&intersect(store.clone(), store.clone()), &store));
        assert!(Arc::ptr_eq(&union(store.clone(), store.clone()), &store));
    }

    #[test]
    fn test_empty_node_filter_absorbs() {
        let op = EdgeOp::Having {
            input: edges(EdgeOp::Store),
            role: Some(Role::Subject),
            filter: NodeFilter::Nodes(lit(&[])),
        };
        assert!(edges(op).is_empty_literal());

        let op = EdgeOp::With {
            input: edges(EdgeOp::Store),
            role: Role::Object,
            filter: NodeFilter::Nodes(lit(&[])),
        };
        assert!(edges(op).is_empty_literal());
    }

    #[test]
    fn test_store_scan_is_kept() {
        assert!(matches!(&*edges(EdgeOp::Store), Expr::Op(EdgeOp::Store)));
    }
}
