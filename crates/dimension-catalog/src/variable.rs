//! Variables and variable collections.
//!
//! A [`Variable`] is one concrete value along one dimension ("GFS" in the
//! model dimension, "850hPa" in the level dimension). It carries the id of
//! the collection it belongs to, so two variables with the same id in
//! different collections are different variables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::graph::NodeId;

/// Identity token for one value of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    collection: NodeId,
    id: Arc<str>,
}

impl Variable {
    pub fn new(collection: NodeId, id: impl Into<Arc<str>>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The collection (and therefore the dimension node) owning this variable.
    pub fn collection(&self) -> NodeId {
        self.collection
    }

    /// Same id, owned by another collection.
    pub(crate) fn rescoped(&self, collection: NodeId) -> Self {
        Self {
            collection,
            id: Arc::clone(&self.id),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Serialize for Variable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

/// Insertion-ordered, id-unique set of variables for one dimension.
///
/// Collections are created by the [`DimensionGraph`](crate::DimensionGraph),
/// which pairs each one with exactly one dimension node.
#[derive(Debug, Clone)]
pub struct VariableCollection {
    id: String,
    node: NodeId,
    variables: Vec<Variable>,
    positions: HashMap<Arc<str>, usize>,
}

impl VariableCollection {
    pub(crate) fn new(id: impl Into<String>, node: NodeId) -> Self {
        Self {
            id: id.into(),
            node,
            variables: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The dimension node this collection belongs to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.positions.get(id).map(|&idx| &self.variables[idx])
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        variable.collection() == self.node && self.positions.contains_key(variable.id())
    }

    /// Insertion position of a variable, used as its identity order.
    pub fn position(&self, variable: &Variable) -> Option<usize> {
        if variable.collection() != self.node {
            return None;
        }
        self.positions.get(variable.id()).copied()
    }

    /// Insert a variable, taking ownership of it.
    ///
    /// A variable scoped to another collection is re-scoped to this one.
    /// If the id is already present the existing variable is returned.
    pub fn insert(&mut self, variable: &Variable) -> Variable {
        if let Some(existing) = self.get(variable.id()) {
            return existing.clone();
        }
        let owned = variable.rescoped(self.node);
        self.positions
            .insert(Arc::from(owned.id()), self.variables.len());
        self.variables.push(owned.clone());
        owned
    }

    /// Return the variable with this id, creating it if needed.
    pub fn get_or_insert(&mut self, id: &str) -> Variable {
        match self.get(id) {
            Some(existing) => existing.clone(),
            None => self.insert(&Variable::new(self.node, id)),
        }
    }

    /// Detach a variable from this collection.
    pub(crate) fn take(&mut self, id: &str) -> Option<Variable> {
        let idx = self.positions.remove(id)?;
        let removed = self.variables.remove(idx);
        for (pos, variable) in self.variables.iter().enumerate().skip(idx) {
            self.positions.insert(Arc::from(variable.id()), pos);
        }
        Some(removed)
    }
}

impl<'a> IntoIterator for &'a VariableCollection {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}
