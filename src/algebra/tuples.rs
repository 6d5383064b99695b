//! Tuple views: relations of any arity with named positions.
//!
//! A [`TupleSet`] pairs a tuple expression with the [`RoleNames`] labelling
//! its positions. Names matter for `join` (shared names are join keys) and
//! for set algebra (operands must carry the same names in the same order).

use smallvec::SmallVec;

use super::expr::*;
use super::view::{EdgeSet, NodeSet, View};
use crate::model::{Node, RoleNames, Tuple};
use crate::planner;
use crate::store::QuadStore;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct TupleSet {
    names: RoleNames,
    view: View<Tuples>,
}

impl TupleSet {
    pub(crate) fn from_parts(names: RoleNames, view: View<Tuples>) -> Self {
        Self { names, view }
    }

    fn derive(&self, names: RoleNames, expr: std::sync::Arc<Expr<Tuples>>) -> Self {
        Self::from_parts(names, self.view.derive(expr))
    }

    pub fn names(&self) -> &RoleNames {
        &self.names
    }

    /// Position of `name`, if this view has such a role.
    pub fn role(&self, name: &str) -> Option<usize> {
        self.names.role(name)
    }

    pub fn store(&self) -> &QuadStore {
        self.view.store()
    }

    pub fn view(&self) -> &View<Tuples> {
        &self.view
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    pub fn iter(&self) -> Result<impl Iterator<Item = Tuple> + use<>> {
        self.view.iter()
    }

    pub fn to_vec(&self) -> Result<Vec<Tuple>> {
        self.view.to_vec()
    }

    pub fn len(&self) -> Result<usize> {
        self.view.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.view.is_empty()
    }

    pub fn contains(&self, tuple: &Tuple) -> Result<bool> {
        self.view.contains(tuple)
    }

    pub fn copy(&self) -> Result<Self> {
        Ok(Self::from_parts(self.names.clone(), self.view.copy()?))
    }

    // ========================================================================
    // Projection and renaming
    // ========================================================================

    /// Distinct nodes at position `name`.
    pub fn nodes(&self, name: &str) -> Result<NodeSet> {
        let role = self.names.require(name)?;
        let expr = planner::nodes(NodeOp::TupleRole { input: self.view.expr().clone(), role });
        Ok(View::new(self.store().clone(), expr))
    }

    /// Distinct projection onto `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names = RoleNames::new(names.into_iter().map(|n| n.as_ref().to_owned()))?;
        let roles = names
            .iter()
            .map(|name| self.names.require(name))
            .collect::<Result<SmallVec<[usize; 4]>>>()?;
        let expr = planner::tuples(TupleOp::Select { input: self.view.expr().clone(), roles });
        Ok(self.derive(names, expr))
    }

    /// Same rows under new names. The arity must not change.
    pub fn with_names<S: Into<String>>(&self, names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names = RoleNames::new(names)?;
        if names.len() != self.names.len() {
            return Err(Error::InvalidArgument(format!("cannot rename {} to {names}", self.names)));
        }
        Ok(Self::from_parts(names, self.view.clone()))
    }

    // ========================================================================
    // Filters and substitution
    // ========================================================================

    fn filter_node(&self, node: &Node) -> Result<NodeFilter> {
        self.store().ensure_owner(node.store())?;
        Ok(NodeFilter::Node(node.key()))
    }

    fn filter_nodes(&self, nodes: &NodeSet) -> Result<NodeFilter> {
        self.view.same_store(nodes)?;
        Ok(NodeFilter::Nodes(nodes.expr().clone()))
    }

    fn with(&self, name: &str, filter: NodeFilter) -> Result<Self> {
        let role = self.names.require(name)?;
        let input = self.view.expr().clone();
        Ok(self.derive(self.names.clone(), planner::tuples(TupleOp::With { input, role, filter })))
    }

    fn having(&self, name: &str, filter: NodeFilter) -> Result<Self> {
        let role = self.names.require(name)?;
        let input = self.view.expr().clone();
        Ok(self.derive(self.names.clone(), planner::tuples(TupleOp::Having { input, role, filter })))
    }

    pub fn with_node(&self, name: &str, node: &Node) -> Result<Self> {
        self.with(name, self.filter_node(node)?)
    }

    /// One row per input row and member of `nodes`, with `name` replaced.
    pub fn with_nodes(&self, name: &str, nodes: &NodeSet) -> Result<Self> {
        self.with(name, self.filter_nodes(nodes)?)
    }

    pub fn having_node(&self, name: &str, node: &Node) -> Result<Self> {
        self.having(name, self.filter_node(node)?)
    }

    pub fn having_nodes(&self, name: &str, nodes: &NodeSet) -> Result<Self> {
        self.having(name, self.filter_nodes(nodes)?)
    }

    // ========================================================================
    // Join
    // ========================================================================

    /// Natural join on the role names both sides share, or the cross product
    /// when they share none. Output names are this view's names followed by
    /// the other view's remaining names.
    pub fn join(&self, other: &TupleSet) -> Result<Self> {
        self.view.same_store(&other.view)?;
        let mut on: SmallVec<[(usize, usize); 4]> = SmallVec::new();
        let mut keep: SmallVec<[usize; 4]> = SmallVec::new();
        let mut names: Vec<String> = self.names.as_slice().to_vec();
        for (r, name) in other.names.iter().enumerate() {
            match self.names.role(name) {
                Some(l) => on.push((l, r)),
                None => {
                    keep.push(r);
                    names.push(name.to_owned());
                }
            }
        }
        let expr = planner::tuples(TupleOp::Join {
            left: self.view.expr().clone(),
            right: other.view.expr().clone(),
            on,
            keep,
        });
        Ok(self.derive(RoleNames::new(names)?, expr))
    }

    /// Back to quads, reading context, predicate, subject and object from the
    /// named positions.
    pub fn edges(&self, context: &str, predicate: &str, subject: &str, object: &str) -> Result<EdgeSet> {
        let roles = [
            self.names.require(context)?,
            self.names.require(predicate)?,
            self.names.require(subject)?,
            self.names.require(object)?,
        ];
        let expr = planner::edges(EdgeOp::FromTuples { input: self.view.expr().clone(), roles });
        Ok(View::new(self.store().clone(), expr))
    }

    // ========================================================================
    // Set algebra
    // ========================================================================

    fn same_names(&self, other: &TupleSet) -> Result<()> {
        if self.names == other.names {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!("role names differ: {} vs {}", self.names, other.names)))
        }
    }

    pub fn union(&self, other: &TupleSet) -> Result<Self> {
        self.same_names(other)?;
        Ok(Self::from_parts(self.names.clone(), self.view.union(&other.view)?))
    }

    pub fn intersect(&self, other: &TupleSet) -> Result<Self> {
        self.same_names(other)?;
        Ok(Self::from_parts(self.names.clone(), self.view.intersect(&other.view)?))
    }

    pub fn except(&self, other: &TupleSet) -> Result<Self> {
        self.same_names(other)?;
        Ok(Self::from_parts(self.names.clone(), self.view.except(&other.view)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, QuadStore};

    #[test]
    fn test_select_rejects_unknown_names() {
        let store = QuadStore::open_memory();
        let t = store.edges().tuples(["c", "p", "s", "o"]).unwrap();
        assert!(matches!(t.select(["x"]), Err(Error::InvalidArgument(_))));
        assert!(matches!(t.with_names(["a", "b"]), Err(Error::InvalidArgument(_))));
        assert_eq!(t.select(["o", "s"]).unwrap().names().to_string(), "(o, s)");
    }

    #[test]
    fn test_join_names_and_rows() {
        let store = QuadStore::open_memory();
        let [c, p, a, b, d] = std::array::from_fn(|_| store.new_node().unwrap());
        store.put_edge(&store.new_edge(&c, &p, &a, &b).unwrap()).unwrap();
        store.put_edge(&store.new_edge(&c, &p, &b, &d).unwrap()).unwrap();

        let hops = store.edges().tuples(["c", "p", "x", "y"]).unwrap().select(["x", "y"]).unwrap();
        let next = hops.with_names(["y", "z"]).unwrap();
        let paths = hops.join(&next).unwrap();

        assert_eq!(paths.names().to_string(), "(x, y, z)");
        let rows: Vec<Vec<_>> = paths.iter().unwrap().map(|t| t.nodes().collect()).collect();
        assert_eq!(rows, vec![vec![a, b, d]]);
    }

    #[test]
    fn test_tuples_back_to_edges() {
        let store = QuadStore::open_memory();
        let [c, p, s, o] = std::array::from_fn(|_| store.new_node().unwrap());
        let edge = store.new_edge(&c, &p, &s, &o).unwrap();
        store.put_edge(&edge).unwrap();

        // Swap subject and object.
        let flipped = store.edges().tuples(["c", "p", "s", "o"]).unwrap().edges("c", "p", "o", "s").unwrap();
        let expected = store.new_edge(&c, &p, &o, &s).unwrap();
        assert_eq!(flipped.to_vec().unwrap(), vec![expected]);
    }
}
