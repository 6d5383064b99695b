//! Role indexes.
//!
//! One hash index per quad role, mapping a node key to the quads that use it
//! in that role. The memory backend answers `having_*` filters against the
//! base table and cascading node removal from here instead of scanning.

use hashbrown::{HashMap, HashSet};

use crate::model::{NodeKey, Quad, Role};

#[derive(Debug, Default, Clone)]
pub struct RoleIndex {
    by_role: [HashMap<NodeKey, HashSet<Quad>>; 4],
}

impl RoleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, quad: Quad) {
        for role in Role::ALL {
            self.by_role[role.index()].entry(quad.get(role)).or_default().insert(quad);
        }
    }

    pub fn remove(&mut self, quad: &Quad) {
        for role in Role::ALL {
            let map = &mut self.by_role[role.index()];
            let key = quad.get(role);
            if let Some(quads) = map.get_mut(&key) {
                quads.remove(quad);
                if quads.is_empty() {
                    map.remove(&key);
                }
            }
        }
    }

    /// Quads using `key` in `role`.
    pub fn get(&self, role: Role, key: NodeKey) -> impl Iterator<Item = &Quad> {
        self.by_role[role.index()].get(&key).into_iter().flatten()
    }

    /// Quads using `key` in any role.
    pub fn referencing(&self, key: NodeKey) -> HashSet<Quad> {
        Role::ALL.iter().flat_map(|role| self.get(*role, key)).copied().collect()
    }

    /// Keys used in `role` by at least one quad.
    pub fn keys(&self, role: Role) -> impl Iterator<Item = &NodeKey> {
        self.by_role[role.index()].keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(c: u64, p: u64, s: u64, o: u64) -> Quad {
        Quad::new(NodeKey(c), NodeKey(p), NodeKey(s), NodeKey(o))
    }

    #[test]
    fn test_insert_and_lookup_by_role() {
        let mut idx = RoleIndex::new();
        idx.insert(quad(1, 2, 3, 4));
        idx.insert(quad(1, 2, 5, 4));

        assert_eq!(idx.get(Role::Context, NodeKey(1)).count(), 2);
        assert_eq!(idx.get(Role::Subject, NodeKey(3)).count(), 1);
        assert_eq!(idx.get(Role::Subject, NodeKey(4)).count(), 0);
        assert_eq!(idx.referencing(NodeKey(4)).len(), 2);
    }

    #[test]
    fn test_remove_drops_empty_buckets() {
        let mut idx = RoleIndex::new();
        let q = quad(1, 2, 3, 4);
        idx.insert(q);
        idx.remove(&q);
        assert!(idx.referencing(NodeKey(1)).is_empty());
        assert_eq!(idx.keys(Role::Object).count(), 0);
    }
}
