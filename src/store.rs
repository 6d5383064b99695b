//! The quad store handle.
//!
//! [`QuadStore`] is the entry point: it owns the backend, hands out the base
//! views every query starts from, and funnels every mutation through one
//! store-level lock so that change detection runs against a consistent state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::algebra::*;
use crate::history::DomainState;
use crate::model::*;
use crate::planner;
use crate::storage::{BackendCapabilities, BackendConfig, MemoryBackend, StorageBackend};
use crate::tx::{Mutation, TxId, WriteBatch};
use crate::{Error, Result};

/// Shared handle to one quad store. Clones refer to the same store.
#[derive(Clone)]
pub struct QuadStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    id: StoreId,
    backend: Box<dyn StorageBackend>,
    /// Serializes writers. Readers go straight to the backend.
    write_lock: Mutex<()>,
    next_tx: AtomicU64,
    /// Per-domain history state keyed by `(history context, domain)`, shared
    /// by every history handle on this store. Entries die with their last
    /// handle.
    domains: Mutex<HashMap<(NodeKey, NodeKey), Weak<Mutex<DomainState>>>>,
}

impl std::fmt::Debug for QuadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadStore").field("id", &self.inner.id).finish_non_exhaustive()
    }
}

impl QuadStore {
    // ========================================================================
    // Construction
    // ========================================================================

    /// A store over a fresh in-memory backend.
    pub fn open_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    pub fn open(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Memory => Ok(Self::open_memory()),
        }
    }

    pub fn with_backend(backend: impl StorageBackend) -> Self {
        let id = StoreId::next();
        debug!(store = %id, caps = ?backend.capabilities(), "opened quad store");
        Self {
            inner: Arc::new(StoreInner {
                id,
                backend: Box::new(backend),
                write_lock: Mutex::new(()),
                next_tx: AtomicU64::new(1),
                domains: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.inner.backend.as_ref()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.inner.backend.capabilities()
    }

    pub fn shutdown(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock();
        self.inner.backend.shutdown()
    }

    pub(crate) fn ensure_owner(&self, found: StoreId) -> Result<()> {
        if found == self.inner.id {
            Ok(())
        } else {
            Err(Error::OwnerMismatch { expected: self.inner.id, found })
        }
    }

    /// The state of `domain` under the history kept in `context`, created
    /// when no live handle holds it.
    pub(crate) fn domain_state(&self, context: &Node, domain: &Node) -> Arc<Mutex<DomainState>> {
        let mut domains = self.inner.domains.lock();
        let key = (context.key(), domain.key());
        if let Some(state) = domains.get(&key).and_then(Weak::upgrade) {
            return state;
        }
        domains.retain(|_, state| state.strong_count() > 0);
        let state = Arc::new(Mutex::new(DomainState::default()));
        domains.insert(key, Arc::downgrade(&state));
        state
    }

    #[cfg(test)]
    pub(crate) fn tracked_domains(&self) -> usize {
        self.inner.domains.lock().len()
    }

    // ========================================================================
    // Base views
    // ========================================================================

    /// Every quad in the store.
    pub fn edges(&self) -> EdgeSet {
        View::new(self.clone(), planner::edges(EdgeOp::Store))
    }

    /// Every known node: value-bound nodes and nodes referenced by a quad.
    pub fn nodes(&self) -> NodeSet {
        View::new(self.clone(), planner::nodes(NodeOp::Store))
    }

    /// Every bound value.
    pub fn values(&self) -> ValueSet {
        View::new(self.clone(), planner::values(ValueOp::Store))
    }

    // ========================================================================
    // Node & value identity
    // ========================================================================

    /// A fresh anonymous node.
    pub fn new_node(&self) -> Result<Node> {
        let key = self.inner.backend.create_node()?;
        Ok(Node::new(self.id(), key))
    }

    /// The node bound to `value`, binding a fresh one when absent.
    pub fn new_value_node(&self, value: &str) -> Result<Node> {
        ensure_value(value)?;
        let _guard = self.inner.write_lock.lock();
        let key = self.inner.backend.intern_value(value)?;
        debug!(store = %self.id(), node = %key, value, "interned value");
        Ok(Node::new(self.id(), key))
    }

    /// The node bound to `value`, if any. Never creates.
    pub fn get_node(&self, value: &str) -> Result<Option<Node>> {
        let found = self.inner.backend.lookup_nodes(&[value.to_owned()])?;
        Ok(found.into_iter().next().map(|(_, key)| Node::new(self.id(), key)))
    }

    /// The value bound to `node`, if any.
    pub fn value_of(&self, node: &Node) -> Result<Option<String>> {
        self.ensure_owner(node.store())?;
        let found = self.inner.backend.lookup_values(&[node.key()])?;
        Ok(found.into_iter().next().map(|(_, value)| value))
    }

    /// Bindings of the given nodes. Unbound nodes are absent from the result.
    pub fn values_of<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<HashMap<Node, String>> {
        let keys = nodes
            .into_iter()
            .map(|node| self.ensure_owner(node.store()).map(|()| node.key()))
            .collect::<Result<Vec<_>>>()?;
        let found = self.inner.backend.lookup_values(&keys)?;
        Ok(found.into_iter().map(|(key, value)| (Node::new(self.id(), key), value)).collect())
    }

    /// Nodes of the given values. Unbound values are absent from the result.
    pub fn nodes_of<S: AsRef<str>>(&self, values: impl IntoIterator<Item = S>) -> Result<HashMap<String, Node>> {
        let values: Vec<String> = values.into_iter().map(|v| v.as_ref().to_owned()).collect();
        let found = self.inner.backend.lookup_nodes(&values)?;
        Ok(found.into_iter().map(|(value, key)| (value, Node::new(self.id(), key))).collect())
    }

    // ========================================================================
    // Literals
    // ========================================================================

    pub fn new_edge(&self, context: &Node, predicate: &Node, subject: &Node, object: &Node) -> Result<Edge> {
        let mut keys = [NodeKey(0); 4];
        for (slot, node) in keys.iter_mut().zip([context, predicate, subject, object]) {
            self.ensure_owner(node.store())?;
            *slot = node.key();
        }
        let [c, p, s, o] = keys;
        Ok(Edge::new(self.id(), Quad::new(c, p, s, o)))
    }

    /// The edge with `node` in all four roles.
    pub fn new_edge_of(&self, node: &Node) -> Result<Edge> {
        self.new_edge(node, node, node, node)
    }

    pub fn new_edges(&self, edges: impl IntoIterator<Item = Edge>) -> Result<EdgeSet> {
        self.literal::<Edges>(edges)
    }

    pub fn new_nodes(&self, nodes: impl IntoIterator<Item = Node>) -> Result<NodeSet> {
        self.literal::<Nodes>(nodes)
    }

    pub fn new_values<S: Into<String>>(&self, values: impl IntoIterator<Item = S>) -> Result<ValueSet> {
        let rows = values
            .into_iter()
            .map(|value| {
                let value = value.into();
                ensure_value(&value).map(|()| value)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(View::new(self.clone(), Arc::new(Expr::literal(rows))))
    }

    /// A tuple view over `names` holding `rows`. Every row must have one node per name.
    pub fn new_tuples<R>(&self, names: RoleNames, rows: impl IntoIterator<Item = R>) -> Result<TupleSet>
    where
        R: IntoIterator<Item = Node>,
    {
        let mut out = Vec::new();
        for row in rows {
            let row = row
                .into_iter()
                .map(|node| self.ensure_owner(node.store()).map(|()| node.key()))
                .collect::<Result<TupleRow>>()?;
            if row.len() != names.len() {
                return Err(Error::InvalidArgument(format!(
                    "tuple of arity {} for roles {names}",
                    row.len()
                )));
            }
            out.push(row);
        }
        Ok(TupleSet::from_parts(names, View::new(self.clone(), Arc::new(Expr::literal(out)))))
    }

    fn literal<K: Kind>(&self, items: impl IntoIterator<Item = K::Item>) -> Result<View<K>> {
        let rows = items
            .into_iter()
            .map(|item| K::lower(self.id(), &item))
            .collect::<Result<Vec<_>>>()?;
        Ok(View::new(self.clone(), Arc::new(Expr::literal(rows))))
    }

    // ========================================================================
    // Mutation primitives
    // ========================================================================

    /// Add every quad of `edges` not yet present. True iff one was new.
    pub fn insert(&self, edges: &EdgeSet) -> Result<bool> {
        self.transact(|batch| batch.put_edges(edges).map(drop))
    }

    /// Remove every quad of `edges` that is present. True iff one was removed.
    pub fn remove(&self, edges: &EdgeSet) -> Result<bool> {
        self.transact(|batch| batch.pop_edges(edges).map(drop))
    }

    pub fn put_edge(&self, edge: &Edge) -> Result<bool> {
        self.insert(&self.new_edges([*edge])?)
    }

    pub fn pop_edge(&self, edge: &Edge) -> Result<bool> {
        self.remove(&self.new_edges([*edge])?)
    }

    /// Remove nodes with every quad referencing them and their bindings.
    pub fn remove_nodes(&self, nodes: &NodeSet) -> Result<bool> {
        self.transact(|batch| batch.pop_nodes(nodes).map(drop))
    }

    /// Release every value node that no quad references.
    pub fn compact(&self) -> Result<bool> {
        let unused = self.values().nodes().except(&self.edges().nodes())?;
        self.remove_nodes(&unused)
    }

    /// Remove every quad and every value binding.
    pub fn clear(&self) -> Result<bool> {
        self.transact(|batch| {
            batch.push(Mutation::PopEdges(planner::edges(EdgeOp::Store)));
            batch.push(Mutation::PopValues(planner::values(ValueOp::Store)));
            Ok(())
        })
    }

    /// Record mutations with `f` and apply them as one atomic batch.
    ///
    /// The store lock is held while `f` runs, so `f` must not call back into
    /// mutating operations of this store. Nothing is applied when `f` fails.
    pub fn transact<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&mut WriteBatch) -> Result<()>,
    {
        let _guard = self.inner.write_lock.lock();
        let id = TxId(self.inner.next_tx.fetch_add(1, Ordering::Relaxed));
        let mut batch = WriteBatch::new(id, self.id());
        f(&mut batch)?;
        if batch.is_empty() {
            return Ok(false);
        }
        let changed = self.inner.backend.apply(&batch)?;
        debug!(store = %self.id(), tx = %id, mutations = batch.len(), changed, "applied write batch");
        Ok(changed)
    }
}

fn ensure_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument("value must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_binding_is_idempotent() {
        let store = QuadStore::open_memory();
        let a = store.new_value_node("A").unwrap();
        assert_eq!(store.new_value_node("A").unwrap(), a);
        assert_ne!(store.new_node().unwrap(), a);
        assert_eq!(store.get_node("A").unwrap(), Some(a));
        assert_eq!(store.get_node("missing").unwrap(), None);
        assert_eq!(store.value_of(&a).unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn test_foreign_node_is_rejected() {
        let s1 = QuadStore::open_memory();
        let s2 = QuadStore::open_memory();
        let a = s1.new_node().unwrap();
        let b = s2.new_node().unwrap();
        let err = s1.new_edge(&a, &a, &a, &b).unwrap_err();
        assert!(matches!(err, Error::OwnerMismatch { .. }));
        assert!(s2.value_of(&a).is_err());
    }

    #[test]
    fn test_failed_transaction_applies_nothing() {
        let store = QuadStore::open_memory();
        let n = store.new_node().unwrap();
        let edges = store.new_edges([store.new_edge_of(&n).unwrap()]).unwrap();
        let result = store.transact(|batch| {
            batch.put_edges(&edges)?;
            Err(Error::InvalidArgument("abort".into()))
        });
        assert!(result.is_err());
        assert!(store.edges().is_empty().unwrap());
    }

    #[test]
    fn test_new_tuples_checks_arity() {
        let store = QuadStore::open_memory();
        let n = store.new_node().unwrap();
        let names = RoleNames::new(["a", "b"]).unwrap();
        assert!(store.new_tuples(names.clone(), [vec![n]]).is_err());
        assert_eq!(store.new_tuples(names, [vec![n, n]]).unwrap().len().unwrap(), 1);
    }

    #[test]
    fn test_empty_value_is_rejected() {
        let store = QuadStore::open_memory();
        assert!(matches!(store.new_value_node(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(store.new_values(["a", ""]), Err(Error::InvalidArgument(_))));
        assert!(store.values().is_empty().unwrap());
    }

    #[test]
    fn test_domain_state_is_shared_and_released() {
        let store = QuadStore::open_memory();
        let [ctx, domain, other] = std::array::from_fn(|_| store.new_node().unwrap());
        let first = store.domain_state(&ctx, &domain);
        let second = store.domain_state(&ctx, &domain);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &store.domain_state(&other, &domain)));

        drop(first);
        drop(second);
        // The dead entries are swept on the next miss.
        let _third = store.domain_state(&ctx, &other);
        assert_eq!(store.tracked_domains(), 1);
    }
}
