//! Node and value views, and the crossing between them.

use super::expr::*;
use super::view::{NodeSet, ValueSet, View};
use crate::planner;
use crate::Result;

impl NodeSet {
    /// Values bound to the nodes of this view. Anonymous nodes contribute nothing.
    pub fn values(&self) -> ValueSet {
        View::new(self.store().clone(), planner::values(ValueOp::OfNodes(self.expr().clone())))
    }

    /// Nodes of this view that are bound to one of `values`.
    pub fn having_values(&self, values: &ValueSet) -> Result<Self> {
        self.intersect(&values.nodes())
    }

    /// Remove the nodes: every quad referencing one of them, and their bindings.
    pub fn pop_all(&self) -> Result<bool> {
        self.store().remove_nodes(self)
    }
}

impl ValueSet {
    /// Nodes bound to the values of this view. Unbound values contribute nothing.
    pub fn nodes(&self) -> NodeSet {
        View::new(self.store().clone(), planner::nodes(NodeOp::OfValues(self.expr().clone())))
    }

    /// Bind every value of this view, creating nodes where needed.
    pub fn put_all(&self) -> Result<bool> {
        self.store().transact(|batch| batch.put_values(self).map(drop))
    }

    /// Release the bindings. Nodes stay referenced by their quads as anonymous nodes.
    pub fn pop_all(&self) -> Result<bool> {
        self.store().transact(|batch| batch.pop_values(self).map(drop))
    }
}
