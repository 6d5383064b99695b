//! Write batches.
//!
//! Every mutation reaches a backend as a [`WriteBatch`]: an ordered list of
//! [`Mutation`]s applied atomically. Each mutation carries an expression that
//! is evaluated against the state left by the mutations before it in the same
//! batch, so a batch can express "read, then write" steps without exposing
//! intermediate states to readers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algebra::{EdgeSet, Edges, Expr, NodeSet, Nodes, ValueSet, Values};
use crate::model::StoreId;
use crate::Result;

/// Opaque batch identifier, unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// One step of a batch.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert the quads that are not yet present.
    PutEdges(Arc<Expr<Edges>>),
    /// Remove the quads that are present.
    PopEdges(Arc<Expr<Edges>>),
    /// Remove nodes: every quad referencing them in any role, and their value bindings.
    PopNodes(Arc<Expr<Nodes>>),
    /// Bind every value that is not yet bound to a fresh node.
    PutValues(Arc<Expr<Values>>),
    /// Release the bindings of the values. Node identities survive.
    PopValues(Arc<Expr<Values>>),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::PutEdges(_) => "put_edges",
            Mutation::PopEdges(_) => "pop_edges",
            Mutation::PopNodes(_) => "pop_nodes",
            Mutation::PutValues(_) => "put_values",
            Mutation::PopValues(_) => "pop_values",
        }
    }
}

/// Ordered mutations recorded for one store.
#[derive(Debug)]
pub struct WriteBatch {
    id: TxId,
    store: StoreId,
    ops: Vec<Mutation>,
}

impl WriteBatch {
    pub(crate) fn new(id: TxId, store: StoreId) -> Self {
        Self { id, store, ops: Vec::new() }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn store(&self) -> StoreId {
        self.store
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append without an owner check. The caller vouches for the expression.
    pub(crate) fn push(&mut self, op: Mutation) -> &mut Self {
        self.ops.push(op);
        self
    }

    fn checked(&mut self, owner: StoreId, op: Mutation) -> Result<&mut Self> {
        if owner != self.store {
            return Err(crate::Error::OwnerMismatch { expected: self.store, found: owner });
        }
        Ok(self.push(op))
    }

    pub fn put_edges(&mut self, edges: &EdgeSet) -> Result<&mut Self> {
        self.checked(edges.store().id(), Mutation::PutEdges(edges.expr().clone()))
    }

    pub fn pop_edges(&mut self, edges: &EdgeSet) -> Result<&mut Self> {
        self.checked(edges.store().id(), Mutation::PopEdges(edges.expr().clone()))
    }

    pub fn pop_nodes(&mut self, nodes: &NodeSet) -> Result<&mut Self> {
        self.checked(nodes.store().id(), Mutation::PopNodes(nodes.expr().clone()))
    }

    pub fn put_values(&mut self, values: &ValueSet) -> Result<&mut Self> {
        self.checked(values.store().id(), Mutation::PutValues(values.expr().clone()))
    }

    pub fn pop_values(&mut self, values: &ValueSet) -> Result<&mut Self> {
        self.checked(values.store().id(), Mutation::PopValues(values.expr().clone()))
    }
}
