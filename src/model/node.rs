//! Node identities.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque backend-level node identifier.
///
/// Backends issue keys in increasing order and never reuse them, so a larger
/// key always denotes a node created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey(pub u64);

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-unique identity of a [`QuadStore`](crate::QuadStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreId(pub u64);

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

impl StoreId {
    pub(crate) fn next() -> Self {
        StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

/// A node of one store: anonymous, or bound to exactly one value string.
///
/// The kind of a node is not part of its identity. Whether it carries a
/// value is answered by the store (`QuadStore::value_of`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node {
    store: StoreId,
    key: NodeKey,
}

impl Node {
    pub(crate) fn new(store: StoreId, key: NodeKey) -> Self {
        Self { store, key }
    }

    /// The store this node belongs to.
    pub fn store(&self) -> StoreId {
        self.store
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_ids_are_unique() {
        let a = StoreId::next();
        let b = StoreId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_node_identity_includes_store() {
        let a = Node::new(StoreId(1), NodeKey(7));
        let b = Node::new(StoreId(2), NodeKey(7));
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
    }
}
