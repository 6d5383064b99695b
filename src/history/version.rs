//! Version identities and the per-domain state kept between transitions.

use serde::{Deserialize, Serialize};

use crate::model::Node;

/// One point in a domain's edit history. The wrapped node is the subject of
/// the version's bookkeeping quads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub(crate) Node);

impl Version {
    pub fn node(&self) -> Node {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0.key())
    }
}

/// The two satellite contexts of a version: quads it added and quads it
/// removed relative to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Satellites {
    pub insert: Node,
    pub delete: Node,
}

/// Successor `redo` should follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum NextVersion {
    /// Not known yet; resolved from stored links on first use.
    #[default]
    Unresolved,
    Resolved(Option<Version>),
}

/// State shared by every handle on one domain, guarded by the domain lock.
#[derive(Debug, Default)]
pub(crate) struct DomainState {
    pub next: NextVersion,
}

/// Summary of a version, as reported by [`History::describe`](super::History::describe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: u64,
    pub predecessor: Option<u64>,
    pub branch_parent: Option<u64>,
    pub inserted: usize,
    pub deleted: usize,
    pub active: bool,
}
