//! # Versioned History
//!
//! Branchable undo/redo over the quads of one context (a *domain*). All
//! bookkeeping lives in the store itself, as quads in one history context:
//!
//! | Quad | Meaning |
//! |------|---------|
//! | `(H, active, domain, v)` | `v` is the active version of `domain` |
//! | `(H, source, v, p)` | `p` is the predecessor of `v` |
//! | `(H, insert, v, i)` | context `i` holds the quads `v` added |
//! | `(H, delete, v, d)` | context `d` holds the quads `v` removed |
//! | `(H, branch, v, b)` | `v` was forked from `b` |
//!
//! Satellite contexts store domain quads with the context role replaced, so
//! `(i, p, s, o)` records that `v` added `(domain, p, s, o)`.
//!
//! Nothing is cached except the successor `redo` should follow, so a history
//! can always be reopened from the stored quads. Every transition is a single
//! write batch: readers see either the old version or the new one.
//!
//! Transitions on one domain are serialized by a per-domain lock that the
//! store hands out, so every handle on the domain shares it, whichever
//! [`HistoryManager`] it came from. The store lock is taken only for the
//! final batch.

mod domain;
mod version;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Node;
use crate::store::QuadStore;
use crate::{Error, Result};

pub use domain::History;
pub use version::{Version, VersionInfo};

pub(crate) use version::DomainState;

// ============================================================================
// Configuration
// ============================================================================

/// Literal values of the bookkeeping vocabulary. Managers configured with the
/// same strings over the same store see the same histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub context: String,
    pub active: String,
    pub source: String,
    pub insert: String,
    pub delete: String,
    pub branch: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            context: "qs:history".into(),
            active: "qs:active".into(),
            source: "qs:source".into(),
            insert: "qs:insert".into(),
            delete: "qs:delete".into(),
            branch: "qs:branch".into(),
        }
    }
}

/// The vocabulary interned as value nodes of one store.
#[derive(Debug)]
pub(crate) struct Vocabulary {
    pub context: Node,
    pub active: Node,
    pub source: Node,
    pub insert: Node,
    pub delete: Node,
    pub branch: Node,
}

impl Vocabulary {
    fn intern(store: &QuadStore, config: &HistoryConfig) -> Result<Self> {
        let names = [
            &config.context,
            &config.active,
            &config.source,
            &config.insert,
            &config.delete,
            &config.branch,
        ];
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::InvalidArgument("history vocabulary entry is empty".into()));
            }
            if names[..i].contains(name) {
                return Err(Error::InvalidArgument(format!("history vocabulary entry '{name}' is used twice")));
            }
        }
        Ok(Self {
            context: store.new_value_node(&config.context)?,
            active: store.new_value_node(&config.active)?,
            source: store.new_value_node(&config.source)?,
            insert: store.new_value_node(&config.insert)?,
            delete: store.new_value_node(&config.delete)?,
            branch: store.new_value_node(&config.branch)?,
        })
    }
}

// ============================================================================
// HistoryManager
// ============================================================================

/// Creates and opens domain histories of one store.
pub struct HistoryManager {
    store: QuadStore,
    vocab: Arc<Vocabulary>,
}

impl HistoryManager {
    pub fn new(store: &QuadStore, config: &HistoryConfig) -> Result<Self> {
        Ok(Self {
            store: store.clone(),
            vocab: Arc::new(Vocabulary::intern(store, config)?),
        })
    }

    pub fn with_defaults(store: &QuadStore) -> Result<Self> {
        Self::new(store, &HistoryConfig::default())
    }

    pub fn store(&self) -> &QuadStore {
        &self.store
    }

    /// The context holding every bookkeeping quad of this manager.
    pub fn context(&self) -> Node {
        self.vocab.context
    }

    fn handle(&self, domain: Node) -> History {
        let state = self.store.domain_state(&self.vocab.context, &domain);
        History::new(self.store.clone(), self.vocab.clone(), domain, state)
    }

    fn is_managed(&self, domain: &Node) -> Result<bool> {
        let active = self
            .store
            .edges()
            .having_context(&self.vocab.context)?
            .having_predicate(&self.vocab.active)?
            .having_subject(domain)?;
        Ok(!active.is_empty()?)
    }

    /// Bookkeeping nodes cannot be domains: their content is the history
    /// itself, so versioning it would let edits rewrite the links.
    fn ensure_domain(&self, domain: &Node) -> Result<()> {
        let vocab = &self.vocab;
        let reserved = [vocab.context, vocab.active, vocab.source, vocab.insert, vocab.delete, vocab.branch];
        if reserved.contains(domain) {
            return Err(Error::InvalidArgument(format!("{domain} is part of the history vocabulary")));
        }
        let links = self.store.edges().having_context(&vocab.context)?;
        let satellites = self.store.new_nodes([vocab.insert, vocab.delete])?;
        if !links.having_predicates(&satellites)?.having_object(domain)?.is_empty()? {
            return Err(Error::InvalidArgument(format!("{domain} is a satellite context of a version")));
        }
        let versioned = self.store.new_nodes([vocab.source, vocab.insert])?;
        if !links.having_predicates(&versioned)?.having_subject(domain)?.is_empty()? {
            return Err(Error::InvalidArgument(format!("{domain} is a version")));
        }
        Ok(())
    }

    /// A new domain context with an empty root version.
    pub fn create(&self) -> Result<History> {
        let domain = self.store.new_node()?;
        self.create_for(&domain)
    }

    /// Put an existing context under version control. Its current content
    /// becomes the root state.
    pub fn create_for(&self, domain: &Node) -> Result<History> {
        self.store.ensure_owner(domain.store())?;
        self.ensure_domain(domain)?;
        let history = self.handle(*domain);
        let root = history.init_root()?;
        debug!(domain = %domain, root = %root, "created history");
        Ok(history)
    }

    /// A handle on an existing domain.
    pub fn open(&self, domain: &Node) -> Result<History> {
        self.store.ensure_owner(domain.store())?;
        if !self.is_managed(domain)? {
            return Err(Error::NotFound(format!("no history for domain {domain}")));
        }
        Ok(self.handle(*domain))
    }

    /// Every domain with an active version.
    pub fn domains(&self) -> Result<Vec<Node>> {
        self.store
            .edges()
            .having_context(&self.vocab.context)?
            .having_predicate(&self.vocab.active)?
            .subjects()
            .to_vec()
    }
}
