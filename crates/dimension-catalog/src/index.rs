//! Per-node resource index.
//!
//! Each dimension node files the resources stored at it under
//! `tree node -> variable of this dimension -> resources`. Entries, and the
//! path tree nodes above them, exist only while some resource needs them,
//! so memory follows the combinations actually observed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::graph::{DimensionGraph, NodeId};
use crate::resource::Resource;
use crate::tree::{PathTree, TreeId};
use crate::variable::Variable;

type Lookup = BTreeMap<TreeId, BTreeMap<Variable, BTreeSet<Arc<Resource>>>>;

/// Resources stored at one dimension node.
#[derive(Debug)]
pub struct NodeIndex {
    node: NodeId,
    tree: PathTree,
    lookup: Lookup,
    placements: HashMap<Arc<Resource>, TreeId>,
}

impl NodeIndex {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            tree: PathTree::new(),
            lookup: BTreeMap::new(),
            placements: HashMap::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.placements.contains_key(resource)
    }

    /// Tree node a resource is filed under.
    pub fn placement(&self, resource: &Resource) -> Option<TreeId> {
        self.placements.get(resource).copied()
    }

    /// Every resource stored here, in index order.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.lookup
            .values()
            .flat_map(|by_variable| by_variable.values())
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Store resources here, returning how many were newly added.
    ///
    /// Resources without a variable for this node's collection, or whose
    /// variables do not lead down the graph to this node, are skipped.
    pub fn append<I>(&mut self, graph: &DimensionGraph, resources: I) -> usize
    where
        I: IntoIterator<Item = Arc<Resource>>,
    {
        resources
            .into_iter()
            .filter(|r| self.insert(graph, Arc::clone(r), None))
            .count()
    }

    /// Remove resources, returning how many were actually stored here.
    pub fn remove<'a, I>(&mut self, resources: I) -> usize
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        resources.into_iter().filter(|r| self.delete(r)).count()
    }

    /// Store one resource, walking the path tree from `start` (or from the
    /// highest dimension above this node the resource defines).
    pub(crate) fn insert(
        &mut self,
        graph: &DimensionGraph,
        resource: Arc<Resource>,
        start: Option<NodeId>,
    ) -> bool {
        let Some(variable) = resource.variable_for(self.node).cloned() else {
            debug!(
                collection = graph.collection_id(self.node),
                "Skipping resource without a variable for this dimension"
            );
            return false;
        };
        if self.placements.contains_key(&resource) {
            return false;
        }

        let start = start.unwrap_or_else(|| graph.start_for(&resource, self.node));
        let had_root = self.tree.root(start).is_some();
        let root = self.tree.root_or_insert(start);
        let Some(leaf) = self
            .tree
            .build_children_tree_for_resource(graph, root, &resource, self.node)
        else {
            if !had_root {
                let lookup = &self.lookup;
                self.tree.prune(root, &|id| lookup.contains_key(&id));
            }
            debug!(
                collection = graph.collection_id(self.node),
                start = graph.collection_id(start),
                "Skipping resource whose variables do not lead to this dimension"
            );
            return false;
        };

        self.lookup
            .entry(leaf)
            .or_default()
            .entry(variable)
            .or_default()
            .insert(Arc::clone(&resource));
        self.placements.insert(resource, leaf);
        true
    }

    /// Drop one resource and any lookup entries and tree nodes it leaves empty.
    pub(crate) fn delete(&mut self, resource: &Resource) -> bool {
        let Some(leaf) = self.placements.remove(resource) else {
            return false;
        };
        let Some(by_variable) = self.lookup.get_mut(&leaf) else {
            return true;
        };
        if let Some(variable) = resource.variable_for(self.node) {
            if let Some(set) = by_variable.get_mut(variable) {
                set.remove(resource);
                if set.is_empty() {
                    by_variable.remove(variable);
                }
            }
        }
        if by_variable.is_empty() {
            self.lookup.remove(&leaf);
            let lookup = &self.lookup;
            self.tree.prune(leaf, &|id| lookup.contains_key(&id));
        }
        true
    }

    /// Resources stored here that are defined by all given variables.
    ///
    /// In exact mode the path tree is followed along edges labelled by the
    /// given variables to a single tree node. Otherwise every branch is
    /// searched, skipping branches whose edge contradicts a given variable
    /// of that branch's dimension.
    pub fn get_resources_by_variables(
        &self,
        exact_match: bool,
        variables: &[Variable],
    ) -> Vec<Arc<Resource>> {
        let mut found = BTreeSet::new();
        if exact_match {
            let starts: Vec<NodeId> = self
                .tree
                .roots()
                .filter_map(|root| self.tree.dimension(root))
                .collect();
            if let Some(leaf) = starts
                .into_iter()
                .find_map(|start| self.tree.find_node_by_variables(start, variables, self.node))
            {
                self.collect(leaf, variables, &mut found);
            }
        } else {
            let mut stack: Vec<TreeId> = self.tree.roots().collect();
            while let Some(current) = stack.pop() {
                if self.tree.dimension(current) == Some(self.node) {
                    self.collect(current, variables, &mut found);
                }
                let dimension = self.tree.dimension(current);
                let named = variables
                    .iter()
                    .find(|v| Some(v.collection()) == dimension);
                for (label, _, child) in self.tree.children(current) {
                    if named.is_some_and(|n| n != label) {
                        continue;
                    }
                    stack.push(child);
                }
            }
        }
        found.into_iter().collect()
    }

    pub fn has_resources_by_variables(&self, exact_match: bool, variables: &[Variable]) -> bool {
        !self
            .get_resources_by_variables(exact_match, variables)
            .is_empty()
    }

    fn collect(&self, leaf: TreeId, variables: &[Variable], found: &mut BTreeSet<Arc<Resource>>) {
        let Some(by_variable) = self.lookup.get(&leaf) else {
            return;
        };
        let own = variables.iter().find(|v| v.collection() == self.node);
        for (variable, set) in by_variable {
            if own.is_some_and(|o| o != variable) {
                continue;
            }
            found.extend(
                set.iter()
                    .filter(|r| r.is_defined_by_all(variables))
                    .cloned(),
            );
        }
    }
}
