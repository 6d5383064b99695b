//! Expression interpreter for the memory backend.
//!
//! Evaluates a whole tree against one consistent view of the tables. Set
//! operations are handled once for every kind in [`Eval::set`]; each kind
//! contributes its operator function.

use hashbrown::{HashMap, HashSet};

use crate::algebra::*;
use crate::model::*;

use super::Tables;

pub(super) struct Eval<'t> {
    tables: &'t Tables,
}

impl<'t> Eval<'t> {
    pub(super) fn new(tables: &'t Tables) -> Self {
        Self { tables }
    }

    fn set<K: Kind>(&self, expr: &Expr<K>, op: fn(&Self, &K::Op) -> HashSet<K::Row>) -> HashSet<K::Row> {
        match expr {
            Expr::Literal(rows) => rows.iter().cloned().collect(),
            Expr::Union(a, b) => {
                let mut rows = self.set(a, op);
                rows.extend(self.set(b, op));
                rows
            }
            Expr::Intersect(a, b) => {
                let mut rows = self.set(a, op);
                if !rows.is_empty() {
                    let other = self.set(b, op);
                    rows.retain(|row| other.contains(row));
                }
                rows
            }
            Expr::Except(a, b) => {
                let mut rows = self.set(a, op);
                if !rows.is_empty() {
                    let other = self.set(b, op);
                    rows.retain(|row| !other.contains(row));
                }
                rows
            }
            Expr::Op(o) => op(self, o),
        }
    }

    pub(super) fn edges(&self, expr: &Expr<Edges>) -> HashSet<Quad> {
        self.set(expr, Self::edge_op)
    }

    pub(super) fn nodes(&self, expr: &Expr<Nodes>) -> HashSet<NodeKey> {
        self.set(expr, Self::node_op)
    }

    pub(super) fn values(&self, expr: &Expr<Values>) -> HashSet<String> {
        self.set(expr, Self::value_op)
    }

    pub(super) fn tuples(&self, expr: &Expr<Tuples>) -> HashSet<TupleRow> {
        self.set(expr, Self::tuple_op)
    }

    fn filter_keys(&self, filter: &NodeFilter) -> HashSet<NodeKey> {
        match filter {
            NodeFilter::Node(key) => std::iter::once(*key).collect(),
            NodeFilter::Nodes(set) => self.nodes(set),
        }
    }

    // ========================================================================
    // Edges
    // ========================================================================

    fn edge_op(&self, op: &EdgeOp) -> HashSet<Quad> {
        match op {
            EdgeOp::Store => self.tables.edges.clone(),
            EdgeOp::Having { input, role, filter } => {
                let keys = self.filter_keys(filter);
                if matches!(&**input, Expr::Op(EdgeOp::Store)) {
                    return self.indexed(*role, &keys);
                }
                let mut rows = self.edges(input);
                rows.retain(|quad| match role {
                    Some(role) => keys.contains(&quad.get(*role)),
                    None => quad.keys().iter().any(|key| keys.contains(key)),
                });
                rows
            }
            EdgeOp::With { input, role, filter } => {
                let role = *role;
                let rows = self.edges(input);
                match filter {
                    NodeFilter::Node(key) => rows.into_iter().map(|quad| quad.with(role, *key)).collect(),
                    NodeFilter::Nodes(set) => {
                        let keys = self.nodes(set);
                        rows.iter()
                            .flat_map(|quad| keys.iter().map(move |key| quad.with(role, *key)))
                            .collect()
                    }
                }
            }
            EdgeOp::FromTuples { input, roles } => self
                .tuples(input)
                .into_iter()
                .map(|row| Quad::new(row[roles[0]], row[roles[1]], row[roles[2]], row[roles[3]]))
                .collect(),
        }
    }

    /// `having_*` against the base table, answered from the role index.
    fn indexed(&self, role: Option<Role>, keys: &HashSet<NodeKey>) -> HashSet<Quad> {
        let index = &self.tables.index;
        let mut rows = HashSet::new();
        for key in keys {
            match role {
                Some(role) => rows.extend(index.get(role, *key).copied()),
                None => rows.extend(index.referencing(*key)),
            }
        }
        rows
    }

    // ========================================================================
    // Nodes and values
    // ========================================================================

    fn node_op(&self, op: &NodeOp) -> HashSet<NodeKey> {
        match op {
            NodeOp::Store => {
                let mut keys: HashSet<NodeKey> = self.tables.values.keys().copied().collect();
                for role in Role::ALL {
                    keys.extend(self.tables.index.keys(role).copied());
                }
                keys
            }
            NodeOp::Roles { input, role } => {
                if let (Expr::Op(EdgeOp::Store), Some(role)) = (&**input, role) {
                    return self.tables.index.keys(*role).copied().collect();
                }
                let rows = self.edges(input);
                match role {
                    Some(role) => rows.iter().map(|quad| quad.get(*role)).collect(),
                    None => rows.iter().flat_map(|quad| quad.keys()).collect(),
                }
            }
            NodeOp::OfValues(values) => self
                .values(values)
                .iter()
                .filter_map(|value| self.tables.nodes.get(value).copied())
                .collect(),
            NodeOp::TupleRole { input, role } => {
                self.tuples(input).iter().map(|row| row[*role]).collect()
            }
        }
    }

    fn value_op(&self, op: &ValueOp) -> HashSet<String> {
        match op {
            ValueOp::Store => self.tables.nodes.keys().cloned().collect(),
            ValueOp::OfNodes(nodes) => self
                .nodes(nodes)
                .iter()
                .filter_map(|key| self.tables.values.get(key).cloned())
                .collect(),
        }
    }

    // ========================================================================
    // Tuples
    // ========================================================================

    fn tuple_op(&self, op: &TupleOp) -> HashSet<TupleRow> {
        match op {
            TupleOp::FromEdges(edges) => self
                .edges(edges)
                .iter()
                .map(|quad| TupleRow::from_slice(&quad.keys()))
                .collect(),
            TupleOp::Select { input, roles } => self
                .tuples(input)
                .iter()
                .map(|row| roles.iter().map(|role| row[*role]).collect())
                .collect(),
            TupleOp::With { input, role, filter } => {
                let role = *role;
                let rows = self.tuples(input);
                let keys = self.filter_keys(filter);
                rows.iter()
                    .flat_map(|row| {
                        keys.iter().map(move |key| {
                            let mut row = row.clone();
                            row[role] = *key;
                            row
                        })
                    })
                    .collect()
            }
            TupleOp::Having { input, role, filter } => {
                let keys = self.filter_keys(filter);
                let mut rows = self.tuples(input);
                rows.retain(|row| keys.contains(&row[*role]));
                rows
            }
            TupleOp::Join { left, right, on, keep } => {
                let right_rows = self.tuples(right);
                let mut buckets: HashMap<TupleRow, Vec<&TupleRow>> = HashMap::new();
                for row in &right_rows {
                    let key: TupleRow = on.iter().map(|(_, r)| row[*r]).collect();
                    buckets.entry(key).or_default().push(row);
                }
                let mut rows = HashSet::new();
                for left_row in self.tuples(left) {
                    let key: TupleRow = on.iter().map(|(l, _)| left_row[*l]).collect();
                    let Some(matches) = buckets.get(&key) else { continue };
                    for right_row in matches {
                        let mut row = left_row.clone();
                        row.extend(keep.iter().map(|r| right_row[*r]));
                        rows.insert(row);
                    }
                }
                rows
            }
        }
    }
}
