//! Dimension graph: the static schema of variable collections.
//!
//! Nodes pair one [`VariableCollection`] with parent and child edges. The
//! graph is a DAG, so a sub-dimension (e.g. thresholds) may hang below
//! several parents (levels and accumulations). The graph is wired once at
//! startup; resources are indexed separately by [`NodeIndex`](crate::NodeIndex).

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::resource::Resource;
use crate::variable::{Variable, VariableCollection};

/// Handle of a dimension node (and of its variable collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One dimension: a variable collection plus its DAG edges.
#[derive(Debug, Clone)]
pub struct DimensionNode {
    collection: VariableCollection,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl DimensionNode {
    pub fn id(&self) -> NodeId {
        self.collection.node()
    }

    pub fn collection(&self) -> &VariableCollection {
        &self.collection
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena of dimension nodes.
#[derive(Debug, Clone, Default)]
pub struct DimensionGraph {
    nodes: Vec<DimensionNode>,
    by_collection_id: HashMap<String, NodeId>,
}

impl DimensionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a node with an empty variable collection.
    pub fn add_collection(&mut self, id: &str) -> CatalogResult<NodeId> {
        if self.by_collection_id.contains_key(id) {
            return Err(CatalogError::DuplicateCollection(id.to_string()));
        }
        let node = NodeId(self.nodes.len());
        self.nodes.push(DimensionNode {
            collection: VariableCollection::new(id, node),
            parents: Vec::new(),
            children: Vec::new(),
        });
        self.by_collection_id.insert(id.to_string(), node);
        Ok(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&DimensionNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DimensionNode> {
        self.nodes.iter()
    }

    pub fn collection(&self, id: NodeId) -> Option<&VariableCollection> {
        self.node(id).map(|n| &n.collection)
    }

    /// Collection id of a node, for logging.
    pub fn collection_id(&self, id: NodeId) -> &str {
        self.collection(id).map(|c| c.id()).unwrap_or("?")
    }

    pub fn node_by_collection_id(&self, id: &str) -> Option<NodeId> {
        self.by_collection_id.get(id).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.parents.as_slice()).unwrap_or(&[])
    }

    /// Add edges from `parent` to each child, with reciprocal parent edges.
    ///
    /// A child may have several parents. Repeated edges are ignored and an
    /// edge that would close a cycle is rejected.
    pub fn append_child(&mut self, parent: NodeId, children: &[NodeId]) -> CatalogResult<()> {
        self.node(parent).ok_or(CatalogError::UnknownNode(parent.0))?;
        for &child in children {
            self.node(child).ok_or(CatalogError::UnknownNode(child.0))?;
            if child == parent || self.is_descendant(child, parent) {
                return Err(CatalogError::CycleDetected {
                    parent: self.collection_id(parent).to_string(),
                    child: self.collection_id(child).to_string(),
                });
            }
            if self.nodes[parent.0].children.contains(&child) {
                continue;
            }
            self.nodes[parent.0].children.push(child);
            self.nodes[child.0].parents.push(parent);
        }
        Ok(())
    }

    /// Nodes without parents, in creation order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parents.is_empty())
            .map(|n| n.id())
            .collect()
    }

    /// True if `node` lies strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.descendants(ancestor).contains(&node)
    }

    /// All nodes below `id`, breadth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.walk(id, |graph, n| graph.children(n))
    }

    /// All nodes above `id`, breadth first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.walk(id, |graph, n| graph.parents(n))
    }

    /// Every node, breadth first from the roots in root order.
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<NodeId> = self.roots().into();
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            order.push(node);
            queue.extend(self.children(node).iter().copied());
        }
        order
    }

    pub fn variable(&self, node: NodeId, id: &str) -> Option<Variable> {
        self.collection(node).and_then(|c| c.get(id)).cloned()
    }

    /// Return the variable `id` of a collection, creating it if needed.
    pub fn get_or_insert_variable(&mut self, node: NodeId, id: &str) -> CatalogResult<Variable> {
        let entry = self
            .nodes
            .get_mut(node.0)
            .ok_or(CatalogError::UnknownNode(node.0))?;
        Ok(entry.collection.get_or_insert(id))
    }

    /// Move a variable into another collection, detaching it from its
    /// previous one. Resources keep the variable they were built with.
    pub fn move_variable(&mut self, variable: &Variable, to: NodeId) -> CatalogResult<Variable> {
        self.node(to).ok_or(CatalogError::UnknownNode(to.0))?;
        if variable.collection() == to {
            return Ok(self.nodes[to.0].collection.insert(variable));
        }
        if let Some(previous) = self.nodes.get_mut(variable.collection().0) {
            previous.collection.take(variable.id());
        }
        Ok(self.nodes[to.0].collection.insert(variable))
    }

    /// Path of nodes consuming all given variables, one dimension per step.
    ///
    /// Starting nodes are tried breadth first from the roots, so the topmost
    /// dimension the variables define is found even when it is not a root.
    /// At convergence points children are tried in insertion order and the
    /// first path that consumes every variable wins.
    pub fn consumption_path(&self, variables: &[Variable]) -> Option<Vec<NodeId>> {
        let wanted: HashSet<NodeId> = variables.iter().map(|v| v.collection()).collect();
        if wanted.is_empty() {
            return None;
        }
        for start in self.breadth_first() {
            if !wanted.contains(&start) {
                continue;
            }
            let mut path = vec![start];
            if self.descend(&wanted, &mut path) {
                return Some(path);
            }
        }
        None
    }

    /// Node at which [`consumption_path`](Self::consumption_path) ends.
    pub fn target_node(&self, variables: &[Variable]) -> Option<NodeId> {
        self.consumption_path(variables)
            .and_then(|path| path.last().copied())
    }

    /// Highest dimension above `node` reachable through parents the resource
    /// has variables for, taking the first such parent at each step.
    pub fn start_for(&self, resource: &Resource, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self
            .parents(current)
            .iter()
            .copied()
            .find(|&p| resource.variable_for(p).is_some())
        {
            current = parent;
        }
        current
    }

    fn descend(&self, wanted: &HashSet<NodeId>, path: &mut Vec<NodeId>) -> bool {
        if path.len() == wanted.len() {
            return true;
        }
        let Some(&last) = path.last() else {
            return false;
        };
        for &child in self.children(last) {
            if !wanted.contains(&child) || path.contains(&child) {
                continue;
            }
            path.push(child);
            if self.descend(wanted, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    fn walk<F>(&self, from: NodeId, next: F) -> Vec<NodeId>
    where
        F: Fn(&Self, NodeId) -> &[NodeId],
    {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<NodeId> = next(self, from).iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            order.push(node);
            queue.extend(next(self, node).iter().copied());
        }
        order
    }
}
