//! The generic view: an owning store plus an expression tree.

use std::fmt;
use std::sync::Arc;

use super::expr::{Edges, Expr, Kind, Nodes, Values};
use crate::planner;
use crate::store::QuadStore;
use crate::Result;

/// Lazy set of `K` rows over one store.
///
/// Nothing is read until the view is enumerated; every enumeration sees the
/// store as it is at that moment. Use [`View::copy`] to freeze the content.
pub struct View<K: Kind> {
    store: QuadStore,
    expr: Arc<Expr<K>>,
}

/// A set of quads.
pub type EdgeSet = View<Edges>;

/// A set of nodes.
pub type NodeSet = View<Nodes>;

/// A set of value strings.
pub type ValueSet = View<Values>;

impl<K: Kind> Clone for View<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            expr: Arc::clone(&self.expr),
        }
    }
}

impl<K: Kind> fmt::Debug for View<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("store", &self.store.id())
            .field("expr", &self.expr)
            .finish()
    }
}

impl<K: Kind> View<K> {
    pub(crate) fn new(store: QuadStore, expr: Arc<Expr<K>>) -> Self {
        Self { store, expr }
    }

    /// Same store, new tree.
    pub(crate) fn derive(&self, expr: Arc<Expr<K>>) -> Self {
        Self::new(self.store.clone(), expr)
    }

    pub fn store(&self) -> &QuadStore {
        &self.store
    }

    pub fn expr(&self) -> &Arc<Expr<K>> {
        &self.expr
    }

    /// Fails with `OwnerMismatch` unless `other` belongs to the same store.
    pub(crate) fn same_store<J: Kind>(&self, other: &View<J>) -> Result<()> {
        self.store.ensure_owner(other.store.id())
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Evaluate the view now and iterate the result.
    pub fn iter(&self) -> Result<impl Iterator<Item = K::Item> + use<K>> {
        let id = self.store.id();
        let cursor = K::scan(self.store.backend(), &self.expr)?;
        Ok(cursor.map(move |row| K::lift(id, row)))
    }

    pub fn to_vec(&self) -> Result<Vec<K::Item>> {
        Ok(self.iter()?.collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(K::scan(self.store.backend(), &self.expr)?.count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(K::scan(self.store.backend(), &self.expr)?.next().is_none())
    }

    pub fn first(&self) -> Result<Option<K::Item>> {
        Ok(self.iter()?.next())
    }

    pub fn contains(&self, item: &K::Item) -> Result<bool> {
        let row = K::lower(self.store.id(), item)?;
        let probe = planner::intersect(Arc::clone(&self.expr), Arc::new(Expr::literal(vec![row])));
        Ok(K::scan(self.store.backend(), &probe)?.next().is_some())
    }

    /// Materialize the current content into an independent literal view.
    pub fn copy(&self) -> Result<Self> {
        let rows = K::scan(self.store.backend(), &self.expr)?.collect();
        Ok(self.derive(Arc::new(Expr::literal(rows))))
    }

    // ========================================================================
    // Set algebra
    // ========================================================================

    pub fn union(&self, other: &Self) -> Result<Self> {
        self.same_store(other)?;
        Ok(self.derive(planner::union(self.expr.clone(), other.expr.clone())))
    }

    pub fn intersect(&self, other: &Self) -> Result<Self> {
        self.same_store(other)?;
        Ok(self.derive(planner::intersect(self.expr.clone(), other.expr.clone())))
    }

    pub fn except(&self, other: &Self) -> Result<Self> {
        self.same_store(other)?;
        Ok(self.derive(planner::except(self.expr.clone(), other.expr.clone())))
    }
}
