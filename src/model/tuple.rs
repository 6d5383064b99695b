//! N-ary tuples and the role names that label their positions.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{Node, NodeKey, StoreId};
use crate::{Error, Result};

/// Backend row of a tuple view. Inline up to quad arity.
pub type TupleRow = SmallVec<[NodeKey; 4]>;

/// Ordered, duplicate-free role names of a tuple view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleNames(Arc<[String]>);

impl RoleNames {
    /// Validates that every name is non-empty and unique.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::InvalidArgument(format!("role name #{i} is empty")));
            }
            if names[..i].contains(name) {
                return Err(Error::InvalidArgument(format!("duplicate role name '{name}'")));
            }
        }
        Ok(Self(names.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `name`, if present.
    pub fn role(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    /// Position of `name`, or `InvalidArgument`.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.role(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown role name '{name}' in {self}")))
    }

    pub fn name(&self, role: usize) -> Option<&str> {
        self.0.get(role).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for RoleNames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// A tuple of one store's nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple {
    store: StoreId,
    row: TupleRow,
}

impl Tuple {
    pub(crate) fn new(store: StoreId, row: TupleRow) -> Self {
        Self { store, row }
    }

    pub fn store(&self) -> StoreId {
        self.store
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    pub fn get(&self, role: usize) -> Option<Node> {
        self.row.get(role).map(|key| Node::new(self.store, *key))
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.row.iter().map(|key| Node::new(self.store, *key))
    }

    pub fn row(&self) -> &TupleRow {
        &self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_reject_duplicates() {
        assert!(RoleNames::new(["a", "b", "a"]).is_err());
        assert!(RoleNames::new(["a", ""]).is_err());
        let names = RoleNames::new(["x", "y"]).unwrap();
        assert_eq!(names.role("y"), Some(1));
        assert_eq!(names.role("z"), None);
        assert!(names.require("z").is_err());
    }
}
