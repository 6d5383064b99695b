//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! All tables live behind one `RwLock`: scans take the read lock for the
//! whole evaluation, `apply` takes the write lock for the whole batch. That
//! gives readers a consistent snapshot and makes every batch atomic.
//!
//! ## Layout
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `edges` | The quad set |
//! | `index` | Per-role hash index over `edges` |
//! | `values` | node → bound value |
//! | `nodes` | bound value → node |
//!
//! Use this backend for:
//! - Testing the set algebra and the history layer
//! - Embedding the store in applications that don't need persistence

mod eval;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use tracing::trace;

use crate::algebra::{Edges, Expr, Nodes, Tuples, Values};
use crate::index::RoleIndex;
use crate::model::*;
use crate::tx::{Mutation, WriteBatch};
use crate::Result;
use super::{BackendCapabilities, Cursor, StorageBackend};

use eval::Eval;

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory quad storage.
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tables: RwLock<Tables>,
    next_node_id: AtomicU64,
}

#[derive(Default)]
pub(crate) struct Tables {
    edges: HashSet<Quad>,
    index: RoleIndex,
    /// node → value
    values: HashMap<NodeKey, String>,
    /// value → node
    nodes: HashMap<String, NodeKey>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                tables: RwLock::new(Tables::default()),
                next_node_id: AtomicU64::new(1),
            }),
        }
    }

    fn next_key(&self) -> NodeKey {
        NodeKey(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed))
    }

    fn sorted<T: Ord>(kind: &'static str, rows: HashSet<T>) -> Vec<T> {
        let mut rows: Vec<T> = rows.into_iter().collect();
        rows.sort_unstable();
        trace!(kind, rows = rows.len(), "memory scan");
        rows
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Mutation
// ============================================================================

impl Tables {
    fn apply(&mut self, op: &Mutation, alloc: &mut dyn FnMut() -> NodeKey) -> bool {
        let mut changed = false;
        match op {
            Mutation::PutEdges(expr) => {
                let rows = Eval::new(self).edges(expr);
                for quad in rows {
                    if self.edges.insert(quad) {
                        self.index.insert(quad);
                        changed = true;
                    }
                }
            }
            Mutation::PopEdges(expr) => {
                let rows = Eval::new(self).edges(expr);
                for quad in rows {
                    if self.edges.remove(&quad) {
                        self.index.remove(&quad);
                        changed = true;
                    }
                }
            }
            Mutation::PopNodes(expr) => {
                let keys = Eval::new(self).nodes(expr);
                for key in keys {
                    for quad in self.index.referencing(key) {
                        self.edges.remove(&quad);
                        self.index.remove(&quad);
                        changed = true;
                    }
                    if let Some(value) = self.values.remove(&key) {
                        self.nodes.remove(&value);
                        changed = true;
                    }
                }
            }
            Mutation::PutValues(expr) => {
                let values = Eval::new(self).values(expr);
                for value in values {
                    if !self.nodes.contains_key(&value) {
                        let key = alloc();
                        self.values.insert(key, value.clone());
                        self.nodes.insert(value, key);
                        changed = true;
                    }
                }
            }
            Mutation::PopValues(expr) => {
                let values = Eval::new(self).values(expr);
                for value in values {
                    if let Some(key) = self.nodes.remove(&value) {
                        self.values.remove(&key);
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

impl StorageBackend for MemoryBackend {
    fn create_node(&self) -> Result<NodeKey> {
        Ok(self.next_key())
    }

    fn intern_value(&self, value: &str) -> Result<NodeKey> {
        if let Some(key) = self.inner.tables.read().nodes.get(value) {
            return Ok(*key);
        }
        let mut tables = self.inner.tables.write();
        // Another writer may have bound it between the two locks.
        if let Some(key) = tables.nodes.get(value) {
            return Ok(*key);
        }
        let key = self.next_key();
        tables.values.insert(key, value.to_owned());
        tables.nodes.insert(value.to_owned(), key);
        Ok(key)
    }

    fn lookup_values(&self, nodes: &[NodeKey]) -> Result<Vec<(NodeKey, String)>> {
        let tables = self.inner.tables.read();
        Ok(nodes
            .iter()
            .filter_map(|key| tables.values.get(key).map(|value| (*key, value.clone())))
            .collect())
    }

    fn lookup_nodes(&self, values: &[String]) -> Result<Vec<(String, NodeKey)>> {
        let tables = self.inner.tables.read();
        Ok(values
            .iter()
            .filter_map(|value| tables.nodes.get(value).map(|key| (value.clone(), *key)))
            .collect())
    }

    fn scan_edges(&self, expr: &Expr<Edges>) -> Result<Cursor<Quad>> {
        let rows = Eval::new(&self.inner.tables.read()).edges(expr);
        Ok(Box::new(Self::sorted("edges", rows).into_iter()))
    }

    fn scan_nodes(&self, expr: &Expr<Nodes>) -> Result<Cursor<NodeKey>> {
        let rows = Eval::new(&self.inner.tables.read()).nodes(expr);
        Ok(Box::new(Self::sorted("nodes", rows).into_iter()))
    }

    fn scan_values(&self, expr: &Expr<Values>) -> Result<Cursor<String>> {
        let rows = Eval::new(&self.inner.tables.read()).values(expr);
        Ok(Box::new(Self::sorted("values", rows).into_iter()))
    }

    fn scan_tuples(&self, expr: &Expr<Tuples>) -> Result<Cursor<TupleRow>> {
        let rows = Eval::new(&self.inner.tables.read()).tuples(expr);
        Ok(Box::new(Self::sorted("tuples", rows).into_iter()))
    }

    fn apply(&self, batch: &WriteBatch) -> Result<bool> {
        let mut tables = self.inner.tables.write();
        let mut alloc = || self.next_key();
        let mut changed = false;
        for op in batch.mutations() {
            let step = tables.apply(op, &mut alloc);
            trace!(tx = %batch.id(), op = op.name(), changed = step, "memory apply");
            changed |= step;
        }
        Ok(changed)
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            indexed_roles: true,
            ..Default::default()
        }
    }
}
