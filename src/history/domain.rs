//! History of one domain: reads of the version graph and the transitions.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::version::{DomainState, NextVersion, Satellites, Version, VersionInfo};
use super::Vocabulary;
use crate::algebra::{EdgeSet, NodeSet};
use crate::model::{Edge, Node};
use crate::store::QuadStore;
use crate::tx::WriteBatch;
use crate::{Error, Result};

/// Handle on one domain's history. Clones share the domain lock.
#[derive(Clone)]
pub struct History {
    store: QuadStore,
    vocab: Arc<Vocabulary>,
    domain: Node,
    state: Arc<Mutex<DomainState>>,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History").field("domain", &self.domain).finish_non_exhaustive()
    }
}

impl History {
    pub(super) fn new(store: QuadStore, vocab: Arc<Vocabulary>, domain: Node, state: Arc<Mutex<DomainState>>) -> Self {
        Self { store, vocab, domain, state }
    }

    pub fn domain(&self) -> Node {
        self.domain
    }

    pub fn store(&self) -> &QuadStore {
        &self.store
    }

    /// Live content of the domain.
    pub fn edges(&self) -> Result<EdgeSet> {
        self.store.edges().having_context(&self.domain)
    }

    /// An edge in the domain context.
    pub fn new_edge(&self, predicate: &Node, subject: &Node, object: &Node) -> Result<Edge> {
        self.store.new_edge(&self.domain, predicate, subject, object)
    }

    fn lock(&self) -> MutexGuard<'_, DomainState> {
        self.state.lock()
    }

    #[cfg(test)]
    pub(crate) fn shares_state_with(&self, other: &History) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    // ========================================================================
    // Reading the version graph
    // ========================================================================

    fn links(&self, predicate: &Node) -> Result<EdgeSet> {
        self.store.edges().having_context(&self.vocab.context)?.having_predicate(predicate)
    }

    fn link(&self, predicate: &Node, subject: &Node, object: &Node) -> Result<Edge> {
        self.store.new_edge(&self.vocab.context, predicate, subject, object)
    }

    /// The single object of `(H, predicate, subject, _)`.
    fn single(&self, predicate: &Node, subject: &Node) -> Result<Option<Node>> {
        let found = self.links(predicate)?.having_subject(subject)?.objects().to_vec()?;
        match found.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => Err(Error::CorruptHistory(format!(
                "{subject} has {} links where at most one is allowed",
                found.len()
            ))),
        }
    }

    /// The active version.
    pub fn version(&self) -> Result<Version> {
        self.single(&self.vocab.active, &self.domain)?
            .map(Version)
            .ok_or_else(|| Error::CorruptHistory(format!("domain {} has no active version", self.domain)))
    }

    pub fn predecessor(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.single(&self.vocab.source, &version.0)?.map(Version))
    }

    /// Versions whose predecessor is `version`, oldest first.
    pub fn successors(&self, version: Version) -> Result<Vec<Version>> {
        let nodes = self.links(&self.vocab.source)?.having_object(&version.0)?.subjects().to_vec()?;
        Ok(nodes.into_iter().map(Version).collect())
    }

    /// The version `version` was forked from, if it is a fork.
    pub fn branch_parent(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.single(&self.vocab.branch, &version.0)?.map(Version))
    }

    fn satellites(&self, version: Version) -> Result<Satellites> {
        let insert = self.single(&self.vocab.insert, &version.0)?;
        let delete = self.single(&self.vocab.delete, &version.0)?;
        match (insert, delete) {
            (Some(insert), Some(delete)) => Ok(Satellites { insert, delete }),
            _ => Err(Error::CorruptHistory(format!("{version} lacks its satellite contexts"))),
        }
    }

    fn content_of(&self, context: &Node) -> Result<EdgeSet> {
        self.store.edges().having_context(context)?.with_context(&self.domain)
    }

    /// Quads `version` added relative to its predecessor, in the domain context.
    pub fn inserted(&self, version: Version) -> Result<EdgeSet> {
        self.content_of(&self.satellites(version)?.insert)
    }

    /// Quads `version` removed relative to its predecessor, in the domain context.
    pub fn deleted(&self, version: Version) -> Result<EdgeSet> {
        self.content_of(&self.satellites(version)?.delete)
    }

    /// The root version of the domain.
    pub fn root(&self) -> Result<Version> {
        let mut current = self.version()?;
        let mut seen = HashSet::new();
        while let Some(prev) = self.predecessor(current)? {
            if !seen.insert(prev) {
                return Err(Error::CorruptHistory(format!("source links of {} form a cycle", self.domain)));
            }
            current = prev;
        }
        Ok(current)
    }

    /// `roots` and everything reachable from them through successor links.
    fn descendants(&self, roots: Vec<Version>) -> Result<Vec<Version>> {
        let mut seen: HashSet<Version> = roots.iter().copied().collect();
        let mut queue: VecDeque<Version> = roots.into();
        let mut out = Vec::new();
        while let Some(version) = queue.pop_front() {
            out.push(version);
            for next in self.successors(version)? {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(out)
    }

    /// Every version of the domain, breadth first from the root.
    pub fn versions(&self) -> Result<Vec<Version>> {
        self.descendants(vec![self.root()?])
    }

    /// The redo line of `version`: successors that are not forks, with
    /// everything that descends from them. Fork branches survive a commit.
    fn redo_line(&self, version: Version) -> Result<Vec<Version>> {
        let mut plain = Vec::new();
        for next in self.successors(version)? {
            if self.branch_parent(next)?.is_none() {
                plain.push(next);
            }
        }
        self.descendants(plain)
    }

    pub fn describe(&self, version: Version) -> Result<VersionInfo> {
        Ok(VersionInfo {
            version: version.0.key().0,
            predecessor: self.predecessor(version)?.map(|v| v.0.key().0),
            branch_parent: self.branch_parent(version)?.map(|v| v.0.key().0),
            inserted: self.inserted(version)?.len()?,
            deleted: self.deleted(version)?.len()?,
            active: self.version()? == version,
        })
    }

    // ========================================================================
    // Batch building blocks
    // ========================================================================

    /// Version nodes plus their satellite contexts. Evaluated lazily, so it
    /// must be popped before the links it reads are gone.
    fn discard_set(&self, versions: &[Version]) -> Result<NodeSet> {
        let nodes = self.store.new_nodes(versions.iter().map(|v| v.0))?;
        let insert = self.links(&self.vocab.insert)?.having_subjects(&nodes)?.objects();
        let delete = self.links(&self.vocab.delete)?.having_subjects(&nodes)?.objects();
        nodes.union(&insert)?.union(&delete)
    }

    fn diff_views(&self, sat: &Satellites) -> Result<(EdgeSet, EdgeSet)> {
        Ok((self.content_of(&sat.insert)?, self.content_of(&sat.delete)?))
    }

    fn record_links(&self, version: Version, source: Option<Version>, sat: &Satellites, branch: Option<Version>) -> Result<EdgeSet> {
        let v = &version.0;
        let mut links = vec![
            self.link(&self.vocab.insert, v, &sat.insert)?,
            self.link(&self.vocab.delete, v, &sat.delete)?,
        ];
        if let Some(source) = source {
            links.push(self.link(&self.vocab.source, v, &source.0)?);
        }
        if let Some(branch) = branch {
            links.push(self.link(&self.vocab.branch, v, &branch.0)?);
        }
        self.store.new_edges(links)
    }

    fn active_link(&self, version: Version) -> Result<EdgeSet> {
        self.store.new_edges([self.link(&self.vocab.active, &self.domain, &version.0)?])
    }

    fn fresh_satellites(&self) -> Result<Satellites> {
        Ok(Satellites {
            insert: self.store.new_node()?,
            delete: self.store.new_node()?,
        })
    }

    fn commit(&self, f: impl FnOnce(&mut WriteBatch) -> Result<()>) -> Result<bool> {
        self.store.transact(f)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    pub(super) fn init_root(&self) -> Result<Version> {
        let _state = self.lock();
        if self.single(&self.vocab.active, &self.domain)?.is_some() {
            return Err(Error::InvalidArgument(format!("domain {} already has a history", self.domain)));
        }
        let root = Version(self.store.new_node()?);
        let sat = self.fresh_satellites()?;
        let links = self.record_links(root, None, &sat, None)?;
        let active = self.active_link(root)?;
        self.commit(|batch| {
            batch.put_edges(&links)?;
            batch.put_edges(&active)?;
            Ok(())
        })?;
        Ok(root)
    }

    /// Commit a version that adds `edges` to the domain.
    pub fn done(&self, edges: &EdgeSet) -> Result<Version> {
        let empty = self.store.new_edges([])?;
        self.done_diff(edges, &empty)
    }

    /// Commit a version that adds `put` and removes `pop`. Both are read in
    /// the domain context whatever context their quads carry. A quad in both
    /// ends up absent.
    ///
    /// The redo line of the active version is discarded.
    pub fn done_diff(&self, put: &EdgeSet, pop: &EdgeSet) -> Result<Version> {
        let mut state = self.lock();
        let from = self.version()?;
        let discard = self.discard_set(&self.redo_line(from)?)?;

        let put = put.with_context(&self.domain)?;
        let pop = pop.with_context(&self.domain)?;
        let added = put.except(&pop)?.having_state(false);
        let removed = pop.having_state(true);

        let to = Version(self.store.new_node()?);
        let sat = self.fresh_satellites()?;
        let links = self.record_links(to, Some(from), &sat, None)?;
        let (ins, del) = self.diff_views(&sat)?;
        let old_active = self.active_link(from)?;
        let new_active = self.active_link(to)?;

        self.commit(|batch| {
            batch.put_edges(&added.with_context(&sat.insert)?)?;
            batch.put_edges(&removed.with_context(&sat.delete)?)?;
            batch.pop_edges(&del)?;
            batch.put_edges(&ins)?;
            batch.pop_nodes(&discard)?;
            batch.put_edges(&links)?;
            batch.pop_edges(&old_active)?;
            batch.put_edges(&new_active)?;
            Ok(())
        })?;
        state.next = NextVersion::Resolved(None);
        debug!(domain = %self.domain, from = %from, to = %to, "history done");
        Ok(to)
    }

    /// Revert the active version's diff and activate its predecessor.
    /// False at the root.
    pub fn undo(&self) -> Result<bool> {
        let mut state = self.lock();
        let from = self.version()?;
        let Some(to) = self.predecessor(from)? else {
            return Ok(false);
        };
        let (ins, del) = self.diff_views(&self.satellites(from)?)?;
        let old_active = self.active_link(from)?;
        let new_active = self.active_link(to)?;
        self.commit(|batch| {
            batch.pop_edges(&ins)?;
            batch.put_edges(&del)?;
            batch.pop_edges(&old_active)?;
            batch.put_edges(&new_active)?;
            Ok(())
        })?;
        state.next = NextVersion::Resolved(Some(from));
        debug!(domain = %self.domain, from = %from, to = %to, "history undo");
        Ok(true)
    }

    /// Re-apply a successor of the active version: the one the last `undo`
    /// left, otherwise the most recently created one. False at a leaf.
    pub fn redo(&self) -> Result<bool> {
        let mut state = self.lock();
        let from = self.version()?;
        let Some(to) = self.resolve_next(&mut state, from)? else {
            return Ok(false);
        };
        self.step_to(&mut state, from, to)?;
        Ok(true)
    }

    /// The successor `redo` follows from `from`. An unresolved or stale
    /// entry is read from the source links and cached.
    fn resolve_next(&self, state: &mut DomainState, from: Version) -> Result<Option<Version>> {
        let successors = self.successors(from)?;
        let next = match state.next {
            NextVersion::Resolved(None) => None,
            NextVersion::Resolved(Some(next)) if successors.contains(&next) => Some(next),
            _ => successors.iter().max().copied(),
        };
        state.next = NextVersion::Resolved(next);
        Ok(next)
    }

    /// Re-apply the given successor of the active version.
    pub fn redo_to(&self, to: Version) -> Result<bool> {
        let mut state = self.lock();
        let from = self.version()?;
        if !self.successors(from)?.contains(&to) {
            return Err(Error::InvalidArgument(format!("{to} is not a successor of {from}")));
        }
        self.step_to(&mut state, from, to)?;
        Ok(true)
    }

    fn step_to(&self, state: &mut DomainState, from: Version, to: Version) -> Result<()> {
        let (ins, del) = self.diff_views(&self.satellites(to)?)?;
        let old_active = self.active_link(from)?;
        let new_active = self.active_link(to)?;
        self.commit(|batch| {
            batch.pop_edges(&del)?;
            batch.put_edges(&ins)?;
            batch.pop_edges(&old_active)?;
            batch.put_edges(&new_active)?;
            Ok(())
        })?;
        state.next = NextVersion::Unresolved;
        debug!(domain = %self.domain, from = %from, to = %to, "history redo");
        Ok(())
    }

    /// Start a parallel branch: a sibling of the active version with the same
    /// diff, linked to it by `branch`, which becomes active. The live content
    /// does not change. `None` at the root, which has no predecessor to
    /// branch from.
    pub fn fork(&self) -> Result<Option<Version>> {
        let mut state = self.lock();
        let from = self.version()?;
        let Some(source) = self.predecessor(from)? else {
            return Ok(None);
        };
        let (ins, del) = self.diff_views(&self.satellites(from)?)?;

        let to = Version(self.store.new_node()?);
        let sat = self.fresh_satellites()?;
        let links = self.record_links(to, Some(source), &sat, Some(from))?;
        let old_active = self.active_link(from)?;
        let new_active = self.active_link(to)?;

        self.commit(|batch| {
            batch.put_edges(&ins.with_context(&sat.insert)?)?;
            batch.put_edges(&del.with_context(&sat.delete)?)?;
            batch.put_edges(&links)?;
            batch.pop_edges(&old_active)?;
            batch.put_edges(&new_active)?;
            Ok(())
        })?;
        state.next = NextVersion::Resolved(None);
        debug!(domain = %self.domain, from = %from, to = %to, "history fork");
        Ok(Some(to))
    }

    /// Remove the active version with all its descendants and their satellite
    /// contexts. The predecessor becomes active and the live content reverts
    /// to it. False at the root.
    pub fn pop(&self) -> Result<bool> {
        let mut state = self.lock();
        let from = self.version()?;
        let Some(to) = self.predecessor(from)? else {
            return Ok(false);
        };
        let (ins, del) = self.diff_views(&self.satellites(from)?)?;
        let subtree = self.descendants(vec![from])?;
        let discard = self.discard_set(&subtree)?;
        let new_active = self.active_link(to)?;

        self.commit(|batch| {
            batch.pop_edges(&ins)?;
            batch.put_edges(&del)?;
            // Cascades to source, branch and active links of the subtree.
            batch.pop_nodes(&discard)?;
            batch.put_edges(&new_active)?;
            Ok(())
        })?;
        state.next = NextVersion::Unresolved;
        debug!(domain = %self.domain, from = %from, to = %to, popped = subtree.len(), "history pop");
        Ok(true)
    }

    /// Add `edges` to the domain and record them in the active version's diff,
    /// after discarding its redo line.
    pub fn put_edges(&self, edges: &EdgeSet) -> Result<bool> {
        self.amend(edges, true)
    }

    /// Remove `edges` from the domain and record them in the active version's
    /// diff, after discarding its redo line.
    pub fn pop_edges(&self, edges: &EdgeSet) -> Result<bool> {
        self.amend(edges, false)
    }

    fn amend(&self, edges: &EdgeSet, add: bool) -> Result<bool> {
        let mut state = self.lock();
        let active = self.version()?;
        let discard = self.discard_set(&self.redo_line(active)?)?;
        let sat = self.satellites(active)?;

        let edges = edges.with_context(&self.domain)?;
        // Undoing an earlier change of the same version cancels it out of the
        // diff instead of recording both directions.
        let (target, opposite, change) = if add {
            (sat.insert, sat.delete, edges.having_state(false))
        } else {
            (sat.delete, sat.insert, edges.having_state(true))
        };
        let cancelled = change.with_context(&opposite)?;
        let recorded = self.store.edges().having_context(&opposite)?.with_context(&target)?;
        let fresh = change.with_context(&target)?.except(&recorded)?;

        let changed = self.commit(|batch| {
            batch.put_edges(&fresh)?;
            batch.pop_edges(&cancelled)?;
            if add {
                batch.put_edges(&change)?;
            } else {
                batch.pop_edges(&change)?;
            }
            batch.pop_nodes(&discard)?;
            Ok(())
        })?;
        state.next = NextVersion::Unresolved;
        debug!(domain = %self.domain, version = %active, add, changed, "history amend");
        Ok(changed)
    }

    /// Re-read the domain after changes made behind this handle's back.
    ///
    /// Forgets the remembered redo target, validates the active version and
    /// the satellites of every version, and warns about branch links that
    /// point at versions no longer in the graph.
    pub fn check(&self) -> Result<Version> {
        let mut state = self.lock();
        state.next = NextVersion::Unresolved;
        let active = self.version()?;
        let versions = self.versions()?;
        for version in &versions {
            self.satellites(*version)?;
        }
        let known: HashSet<Version> = versions.iter().copied().collect();
        for version in &versions {
            if let Some(parent) = self.branch_parent(*version)? {
                if !known.contains(&parent) {
                    warn!(domain = %self.domain, version = %version, parent = %parent, "branch parent is gone");
                }
            }
        }
        debug!(domain = %self.domain, active = %active, versions = versions.len(), "history checked");
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryManager;

    fn edge(history: &History, s: &str) -> EdgeSet {
        let store = history.store();
        let node = store.new_value_node(s).unwrap();
        store.new_edges([history.new_edge(&node, &node, &node).unwrap()]).unwrap()
    }

    #[test]
    fn test_redo_target_resolves_from_links() {
        let store = QuadStore::open_memory();
        let manager = HistoryManager::with_defaults(&store).unwrap();
        let history = manager.create().unwrap();
        let domain = history.domain();
        let v1 = history.done(&edge(&history, "a")).unwrap();
        history.undo().unwrap();
        drop(history);

        // No handle survived, so a new one starts without a cached target.
        let history = manager.open(&domain).unwrap();
        assert_eq!(history.state.lock().next, NextVersion::Unresolved);
        assert!(history.redo().unwrap());
        assert_eq!(history.version().unwrap(), v1);

        assert!(!history.redo().unwrap());
        assert_eq!(history.state.lock().next, NextVersion::Resolved(None));
    }

    #[test]
    fn test_redo_after_amend_finds_surviving_fork() {
        let store = QuadStore::open_memory();
        let manager = HistoryManager::with_defaults(&store).unwrap();
        let history = manager.create().unwrap();
        history.done(&edge(&history, "a")).unwrap();
        let fork = history.fork().unwrap().unwrap();
        history.undo().unwrap();

        // Amending the root discards the plain successor, the fork stays.
        assert!(history.put_edges(&edge(&history, "b")).unwrap());
        assert_eq!(history.successors(history.version().unwrap()).unwrap(), vec![fork]);
        assert!(history.redo().unwrap());
        assert_eq!(history.version().unwrap(), fork);
    }
}
