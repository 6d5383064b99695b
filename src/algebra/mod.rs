//! # Set Algebra
//!
//! Lazy, composable views over one store's quads, nodes, values and tuples.
//!
//! | View | Rows | Kind-specific operations |
//! |------|------|--------------------------|
//! | [`EdgeSet`] | quads | `having_*`, `with_*`, role projections, `tuples`, `put_all`/`pop_all` |
//! | [`NodeSet`] | nodes | `values`, `having_values`, `pop_all` (cascading) |
//! | [`ValueSet`] | strings | `nodes`, `put_all`/`pop_all` (bindings only) |
//! | [`TupleSet`] | named tuples | `select`, `join`, `with_*`, `having_*`, `edges` |
//!
//! `union`, `intersect`, `except`, `copy` and enumeration are written once on
//! [`View`] and shared by every kind. Building a view never touches the
//! backend; enumerating it evaluates the whole tree in one call.

pub mod expr;
mod edges;
mod nodes;
mod tuples;
mod view;

pub use expr::{EdgeOp, Edges, Expr, Kind, NodeFilter, NodeOp, Nodes, TupleOp, Tuples, ValueOp, Values};
pub use tuples::TupleSet;
pub use view::{EdgeSet, NodeSet, ValueSet, View};
