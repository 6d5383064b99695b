//! JSON dump and load of a store's quads and value bindings.
//!
//! ```text
//! QuadStore → dump() → Dump { values, quads } → serde_json → file
//! file → serde_json → Dump → load() → QuadStore (keys remapped)
//! ```
//!
//! Node keys in a dump are only meaningful inside that dump. Loading binds
//! each value through the target store and allocates fresh anonymous nodes
//! for the rest, so a dump can be loaded into a store that already has
//! content.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Node, NodeKey};
use crate::store::QuadStore;
use crate::{Error, Result};

/// Current dump format.
pub const DUMP_FORMAT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBinding {
    pub node: NodeKey,
    pub value: String,
}

/// Serializable image of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dump {
    pub format: u32,
    pub values: Vec<ValueBinding>,
    /// `[context, predicate, subject, object]`
    pub quads: Vec<[NodeKey; 4]>,
}

/// Read every binding and quad of `store`. The two reads are not one
/// snapshot; dump a store that is not being written.
pub fn dump(store: &QuadStore) -> Result<Dump> {
    let values = store.values().to_vec()?;
    let mut values: Vec<ValueBinding> = store
        .nodes_of(&values)?
        .into_iter()
        .map(|(value, node)| ValueBinding { node: node.key(), value })
        .collect();
    values.sort_by_key(|binding| binding.node);
    let quads = store.edges().iter()?.map(|edge| edge.quad().keys()).collect();
    Ok(Dump { format: DUMP_FORMAT, values, quads })
}

/// Add the content of `dump` to `store`. True iff the store changed.
pub fn load(store: &QuadStore, dump: &Dump) -> Result<bool> {
    if dump.format != DUMP_FORMAT {
        return Err(Error::InvalidArgument(format!("unsupported dump format {}", dump.format)));
    }
    let bound = store.new_values(dump.values.iter().map(|binding| binding.value.clone()))?;
    let mut changed = bound.put_all()?;
    let nodes = store.nodes_of(dump.values.iter().map(|binding| binding.value.as_str()))?;

    let mut keys: HashMap<NodeKey, Node> = HashMap::new();
    for binding in &dump.values {
        let node = nodes
            .get(&binding.value)
            .ok_or_else(|| Error::StorageError(format!("value '{}' was not bound", binding.value)))?;
        keys.insert(binding.node, *node);
    }

    let mut resolve = |key: NodeKey| -> Result<Node> {
        if let Some(node) = keys.get(&key) {
            return Ok(*node);
        }
        let node = store.new_node()?;
        keys.insert(key, node);
        Ok(node)
    };
    let mut edges = Vec::with_capacity(dump.quads.len());
    for [c, p, s, o] in &dump.quads {
        edges.push(store.new_edge(&resolve(*c)?, &resolve(*p)?, &resolve(*s)?, &resolve(*o)?)?);
    }
    changed |= store.insert(&store.new_edges(edges)?)?;
    debug!(store = %store.id(), values = dump.values.len(), quads = dump.quads.len(), changed, "loaded dump");
    Ok(changed)
}

pub fn export_json(store: &QuadStore, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, &dump(store)?)?;
    Ok(())
}

pub fn import_json(store: &QuadStore, reader: &mut dyn Read) -> Result<bool> {
    let dump: Dump = serde_json::from_reader(reader)?;
    load(store, &dump)
}
