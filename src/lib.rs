//! # quadstore: Lazy Quad Store with Versioned History
//!
//! A store of `(context, predicate, subject, object)` quads over opaque node
//! identities, a lazily composed set algebra for querying it, and a
//! branchable undo/redo history over the quads of one context.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between the core and storage
//! 2. **Views are expressions**: building a query never touches the backend
//! 3. **Two mutation primitives**: everything writes through atomic `WriteBatch`es
//! 4. **History in the store**: version bookkeeping is quads, not side tables
//!
//! ## Quick Start
//!
//! ```rust
//! use quadstore::QuadStore;
//!
//! # fn main() -> quadstore::Result<()> {
//! let store = QuadStore::open_memory();
//! let ada = store.new_value_node("Ada")?;
//! let knows = store.new_value_node("knows")?;
//! let ctx = store.new_node()?;
//! let bob = store.new_node()?;
//!
//! store.put_edge(&store.new_edge(&ctx, &knows, &ada, &bob)?)?;
//!
//! let friends = store.edges().having_subject(&ada)?.objects();
//! assert_eq!(friends.to_vec()?, vec![bob]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | Identities and rows |
//! | `algebra` | Lazy views and their expression trees |
//! | `planner` | Simplification while trees are built |
//! | `storage` | Backend contract and the in-memory backend |
//! | `index` | Per-role hash indexes |
//! | `tx` | Write batches |
//! | `history` | Versioned history over one context |
//! | `export` | JSON dump and load |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod algebra;
pub mod planner;
pub mod storage;
pub mod tx;
pub mod index;
pub mod history;
pub mod export;
mod store;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Edge, Node, NodeKey, Quad, Role, RoleNames, StoreId, Tuple, TupleRow};

// ============================================================================
// Re-exports: Views
// ============================================================================

pub use algebra::{EdgeSet, NodeSet, TupleSet, ValueSet, View};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{BackendCapabilities, BackendConfig, MemoryBackend, StorageBackend};

// ============================================================================
// Re-exports: Transactions and history
// ============================================================================

pub use tx::{Mutation, TxId, WriteBatch};
pub use history::{History, HistoryConfig, HistoryManager, Version, VersionInfo};

// ============================================================================
// Top-level store handle
// ============================================================================

pub use store::QuadStore;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Owner mismatch: expected {expected}, found {found}")]
    OwnerMismatch { expected: StoreId, found: StoreId },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Corrupt history: {0}")]
    CorruptHistory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
