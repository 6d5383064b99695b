//! Quads (hyperedges) and their roles.

use serde::{Deserialize, Serialize};

use super::{Node, NodeKey, StoreId};
use crate::{Error, Result};

/// One of the four positions of a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Context,
    Predicate,
    Subject,
    Object,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Context, Role::Predicate, Role::Subject, Role::Object];

    /// Position of the role inside a quad (`C=0, P=1, S=2, O=3`).
    pub fn index(self) -> usize {
        match self {
            Role::Context => 0,
            Role::Predicate => 1,
            Role::Subject => 2,
            Role::Object => 3,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Context => write!(f, "context"),
            Role::Predicate => write!(f, "predicate"),
            Role::Subject => write!(f, "subject"),
            Role::Object => write!(f, "object"),
        }
    }
}

/// Backend row: `(context, predicate, subject, object)`.
///
/// Ordering is lexicographic in `C, P, S, O`, which is also the enumeration
/// order of the memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub context: NodeKey,
    pub predicate: NodeKey,
    pub subject: NodeKey,
    pub object: NodeKey,
}

impl Quad {
    pub fn new(context: NodeKey, predicate: NodeKey, subject: NodeKey, object: NodeKey) -> Self {
        Self { context, predicate, subject, object }
    }

    pub fn get(&self, role: Role) -> NodeKey {
        match role {
            Role::Context => self.context,
            Role::Predicate => self.predicate,
            Role::Subject => self.subject,
            Role::Object => self.object,
        }
    }

    /// Copy of this quad with `role` replaced by `key`.
    pub fn with(mut self, role: Role, key: NodeKey) -> Self {
        match role {
            Role::Context => self.context = key,
            Role::Predicate => self.predicate = key,
            Role::Subject => self.subject = key,
            Role::Object => self.object = key,
        }
        self
    }

    pub fn keys(&self) -> [NodeKey; 4] {
        [self.context, self.predicate, self.subject, self.object]
    }
}

/// A quad tagged with the store it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    store: StoreId,
    quad: Quad,
}

impl Edge {
    pub(crate) fn new(store: StoreId, quad: Quad) -> Self {
        Self { store, quad }
    }

    pub fn store(&self) -> StoreId {
        self.store
    }

    pub fn quad(&self) -> Quad {
        self.quad
    }

    pub fn node(&self, role: Role) -> Node {
        Node::new(self.store, self.quad.get(role))
    }

    pub fn context(&self) -> Node {
        self.node(Role::Context)
    }

    pub fn predicate(&self) -> Node {
        self.node(Role::Predicate)
    }

    pub fn subject(&self) -> Node {
        self.node(Role::Subject)
    }

    pub fn object(&self) -> Node {
        self.node(Role::Object)
    }

    /// Copy of this edge with `role` replaced by `node`.
    pub fn with(&self, role: Role, node: Node) -> Result<Edge> {
        if node.store() != self.store {
            return Err(Error::OwnerMismatch { expected: self.store, found: node.store() });
        }
        Ok(Edge::new(self.store, self.quad.with(role, node.key())))
    }

    pub fn with_context(&self, node: Node) -> Result<Edge> {
        self.with(Role::Context, node)
    }

    pub fn with_predicate(&self, node: Node) -> Result<Edge> {
        self.with(Role::Predicate, node)
    }

    pub fn with_subject(&self, node: Node) -> Result<Edge> {
        self.with(Role::Subject, node)
    }

    pub fn with_object(&self, node: Node) -> Result<Edge> {
        self.with(Role::Object, node)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = &self.quad;
        write!(f, "[{} {} {} {}]", q.context, q.predicate, q.subject, q.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(c: u64, p: u64, s: u64, o: u64) -> Quad {
        Quad::new(NodeKey(c), NodeKey(p), NodeKey(s), NodeKey(o))
    }

    #[test]
    fn test_role_indices_follow_cpso() {
        let q = quad(1, 2, 3, 4);
        for role in Role::ALL {
            assert_eq!(q.get(role), q.keys()[role.index()]);
        }
    }

    #[test]
    fn test_with_identity_is_noop() {
        let q = quad(1, 2, 3, 4);
        assert_eq!(q.with(Role::Subject, q.subject), q);
        assert_eq!(q.with(Role::Object, NodeKey(9)), quad(1, 2, 3, 9));
    }

    #[test]
    fn test_edge_with_rejects_foreign_node() {
        let edge = Edge::new(StoreId(1), quad(1, 2, 3, 4));
        let foreign = Node::new(StoreId(2), NodeKey(5));
        assert!(matches!(
            edge.with_subject(foreign),
            Err(Error::OwnerMismatch { expected: StoreId(1), found: StoreId(2) })
        ));
        let local = Node::new(StoreId(1), NodeKey(5));
        assert_eq!(edge.with_subject(local).unwrap().subject(), local);
    }
}
