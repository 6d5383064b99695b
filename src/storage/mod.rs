//! # Storage Backend Trait
//!
//! This is THE contract between the quad store core and any engine that
//! persists quads and value bindings. The core never touches rows directly:
//! it hands the backend whole expression trees to enumerate and whole write
//! batches to apply.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory, indexed, for testing/embedding |

pub mod memory;

use crate::algebra::{Edges, Expr, Nodes, Tuples, Values};
use crate::model::{NodeKey, Quad, TupleRow};
use crate::tx::WriteBatch;
use crate::Result;

pub use memory::MemoryBackend;

/// Sequential, owned cursor over result rows.
pub type Cursor<T> = Box<dyn Iterator<Item = T> + Send>;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Configuration for opening a storage backend.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,
}

// ============================================================================
// Backend capabilities
// ============================================================================

/// What a backend can do natively.
///
/// All fields default to false. Backends override via `capabilities()`.
#[derive(Debug, Clone, Default)]
pub struct BackendCapabilities {
    /// `having_*` on the base table is answered from a per-role index.
    pub indexed_roles: bool,
    /// Whole expression trees are compiled into one native query.
    pub compiles_expressions: bool,
    /// Quads and bindings survive a restart.
    pub persistent: bool,
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The universal storage contract.
///
/// Requirements every implementation must meet:
///
/// - node keys are issued in increasing order and never reused;
/// - a scan reflects the content at the time it starts (read-committed);
/// - `apply` is atomic with respect to concurrent scans: no reader observes a
///   partially applied batch, and a failed batch leaves no trace.
///
/// Mutual exclusion between writers is the store's job, not the backend's.
pub trait StorageBackend: Send + Sync + 'static {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the backend, flushing any pending writes.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Allocate a fresh anonymous node.
    fn create_node(&self) -> Result<NodeKey>;

    /// The node bound to `value`, binding a fresh node when none exists.
    fn intern_value(&self, value: &str) -> Result<NodeKey>;

    /// `(node, value)` for each given node that has a binding.
    fn lookup_values(&self, nodes: &[NodeKey]) -> Result<Vec<(NodeKey, String)>>;

    /// `(value, node)` for each given value that has a binding. Never creates.
    fn lookup_nodes(&self, values: &[String]) -> Result<Vec<(String, NodeKey)>>;

    // ========================================================================
    // Scan
    // ========================================================================

    fn scan_edges(&self, expr: &Expr<Edges>) -> Result<Cursor<Quad>>;

    fn scan_nodes(&self, expr: &Expr<Nodes>) -> Result<Cursor<NodeKey>>;

    fn scan_values(&self, expr: &Expr<Values>) -> Result<Cursor<String>>;

    fn scan_tuples(&self, expr: &Expr<Tuples>) -> Result<Cursor<TupleRow>>;

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Apply all mutations of `batch` in order, atomically.
    ///
    /// Returns true iff at least one quad or binding was added or removed.
    fn apply(&self, batch: &WriteBatch) -> Result<bool>;

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
}
