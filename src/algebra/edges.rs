//! Quad views: role filters, role substitution, projections and bulk writes.

use super::expr::*;
use super::tuples::TupleSet;
use super::view::{EdgeSet, NodeSet, View};
use crate::model::{Node, Role, RoleNames};
use crate::planner;
use crate::Result;

impl EdgeSet {
    fn filter_node(&self, node: &Node) -> Result<NodeFilter> {
        self.store().ensure_owner(node.store())?;
        Ok(NodeFilter::Node(node.key()))
    }

    fn filter_nodes(&self, nodes: &NodeSet) -> Result<NodeFilter> {
        self.same_store(nodes)?;
        Ok(NodeFilter::Nodes(nodes.expr().clone()))
    }

    fn having(&self, role: Option<Role>, filter: NodeFilter) -> Self {
        self.derive(planner::edges(EdgeOp::Having {
            input: self.expr().clone(),
            role,
            filter,
        }))
    }

    fn with(&self, role: Role, filter: NodeFilter) -> Self {
        self.derive(planner::edges(EdgeOp::With {
            input: self.expr().clone(),
            role,
            filter,
        }))
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Quads whose `role` is `node`.
    pub fn having_role(&self, role: Role, node: &Node) -> Result<Self> {
        Ok(self.having(Some(role), self.filter_node(node)?))
    }

    /// Quads whose `role` is a member of `nodes`.
    pub fn having_roles(&self, role: Role, nodes: &NodeSet) -> Result<Self> {
        Ok(self.having(Some(role), self.filter_nodes(nodes)?))
    }

    pub fn having_context(&self, node: &Node) -> Result<Self> {
        self.having_role(Role::Context, node)
    }

    pub fn having_contexts(&self, nodes: &NodeSet) -> Result<Self> {
        self.having_roles(Role::Context, nodes)
    }

    pub fn having_predicate(&self, node: &Node) -> Result<Self> {
        self.having_role(Role::Predicate, node)
    }

    pub fn having_predicates(&self, nodes: &NodeSet) -> Result<Self> {
        self.having_roles(Role::Predicate, nodes)
    }

    pub fn having_subject(&self, node: &Node) -> Result<Self> {
        self.having_role(Role::Subject, node)
    }

    pub fn having_subjects(&self, nodes: &NodeSet) -> Result<Self> {
        self.having_roles(Role::Subject, nodes)
    }

    pub fn having_object(&self, node: &Node) -> Result<Self> {
        self.having_role(Role::Object, node)
    }

    pub fn having_objects(&self, nodes: &NodeSet) -> Result<Self> {
        self.having_roles(Role::Object, nodes)
    }

    /// Quads using `node` in any role.
    pub fn having_node(&self, node: &Node) -> Result<Self> {
        Ok(self.having(None, self.filter_node(node)?))
    }

    /// Quads using a member of `nodes` in any role.
    pub fn having_nodes(&self, nodes: &NodeSet) -> Result<Self> {
        Ok(self.having(None, self.filter_nodes(nodes)?))
    }

    /// Quads of this view that are (`true`) or are not (`false`) in the store.
    pub fn having_state(&self, present: bool) -> Self {
        let stored = planner::edges(EdgeOp::Store);
        let expr = if present {
            planner::intersect(self.expr().clone(), stored)
        } else {
            planner::except(self.expr().clone(), stored)
        };
        self.derive(expr)
    }

    // ========================================================================
    // Substitution
    // ========================================================================

    /// Every quad with `role` replaced by `node`.
    pub fn with_role(&self, role: Role, node: &Node) -> Result<Self> {
        Ok(self.with(role, self.filter_node(node)?))
    }

    /// Every quad once per member of `nodes`, with `role` replaced by that member.
    pub fn with_roles(&self, role: Role, nodes: &NodeSet) -> Result<Self> {
        Ok(self.with(role, self.filter_nodes(nodes)?))
    }

    pub fn with_context(&self, node: &Node) -> Result<Self> {
        self.with_role(Role::Context, node)
    }

    pub fn with_contexts(&self, nodes: &NodeSet) -> Result<Self> {
        self.with_roles(Role::Context, nodes)
    }

    pub fn with_predicate(&self, node: &Node) -> Result<Self> {
        self.with_role(Role::Predicate, node)
    }

    pub fn with_predicates(&self, nodes: &NodeSet) -> Result<Self> {
        self.with_roles(Role::Predicate, nodes)
    }

    pub fn with_subject(&self, node: &Node) -> Result<Self> {
        self.with_role(Role::Subject, node)
    }

    pub fn with_subjects(&self, nodes: &NodeSet) -> Result<Self> {
        self.with_roles(Role::Subject, nodes)
    }

    pub fn with_object(&self, node: &Node) -> Result<Self> {
        self.with_role(Role::Object, node)
    }

    pub fn with_objects(&self, nodes: &NodeSet) -> Result<Self> {
        self.with_roles(Role::Object, nodes)
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Distinct nodes used in `role`.
    pub fn role_nodes(&self, role: Role) -> NodeSet {
        let expr = planner::nodes(NodeOp::Roles {
            input: self.expr().clone(),
            role: Some(role),
        });
        View::new(self.store().clone(), expr)
    }

    pub fn contexts(&self) -> NodeSet {
        self.role_nodes(Role::Context)
    }

    pub fn predicates(&self) -> NodeSet {
        self.role_nodes(Role::Predicate)
    }

    pub fn subjects(&self) -> NodeSet {
        self.role_nodes(Role::Subject)
    }

    pub fn objects(&self) -> NodeSet {
        self.role_nodes(Role::Object)
    }

    /// Distinct nodes used in any role.
    pub fn nodes(&self) -> NodeSet {
        let expr = planner::nodes(NodeOp::Roles {
            input: self.expr().clone(),
            role: None,
        });
        View::new(self.store().clone(), expr)
    }

    /// The quads as 4-tuples, naming the context, predicate, subject and
    /// object positions in that order.
    pub fn tuples<S: Into<String>>(&self, names: [S; 4]) -> Result<TupleSet> {
        let names = RoleNames::new(names)?;
        let expr = planner::tuples(TupleOp::FromEdges(self.expr().clone()));
        Ok(TupleSet::from_parts(names, View::new(self.store().clone(), expr)))
    }

    // ========================================================================
    // Bulk mutation
    // ========================================================================

    /// Insert every quad of this view. True iff the store changed.
    pub fn put_all(&self) -> Result<bool> {
        self.store().insert(self)
    }

    /// Remove every quad of this view. True iff the store changed.
    pub fn pop_all(&self) -> Result<bool> {
        self.store().remove(self)
    }
}
