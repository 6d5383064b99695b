//! # Quad Model
//!
//! Identities and rows that cross every boundary: store ↔ algebra ↔
//! backend ↔ history ↔ user.
//!
//! Design rule: this module is pure data. No I/O, no locks, no backend calls.
//! Backend-level types (`NodeKey`, `Quad`, `TupleRow`) carry no owner;
//! user-level types (`Node`, `Edge`, `Tuple`) carry the `StoreId` they belong
//! to so that mixing stores is detected before a query is composed.

pub mod node;
pub mod quad;
pub mod tuple;

pub use node::{Node, NodeKey, StoreId};
pub use quad::{Edge, Quad, Role};
pub use tuple::{RoleNames, Tuple, TupleRow};
