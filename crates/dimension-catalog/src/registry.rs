//! The resource registry.
//!
//! [`Catalog`] routes each resource to the one dimension node it belongs
//! at, keeps a [`NodeIndex`] per node, and answers the cross-dimension
//! questions: which times exist for a set of variables, and which values a
//! dimension can take given other fixed dimensions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::events::{CatalogEvent, ListenerId, Observers};
use crate::graph::{DimensionGraph, NodeId};
use crate::index::NodeIndex;
use crate::resource::Resource;
use crate::variable::Variable;

/// Registry of resources over a dimension graph.
#[derive(Debug)]
pub struct Catalog {
    graph: DimensionGraph,
    indexes: Vec<NodeIndex>,
    observers: Observers<CatalogEvent>,
}

/// Size of the materialized index, per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub nodes: usize,
    pub resources: usize,
    pub tree_nodes: usize,
    pub per_collection: Vec<(String, usize)>,
}

impl Catalog {
    pub fn new(graph: DimensionGraph) -> Self {
        let indexes = (0..graph.len()).map(|i| NodeIndex::new(NodeId(i))).collect();
        Self {
            graph,
            indexes,
            observers: Observers::new(),
        }
    }

    pub fn graph(&self) -> &DimensionGraph {
        &self.graph
    }

    /// Mutable schema access, e.g. to create variables while building
    /// resources. Collections added later get an index on first use.
    pub fn graph_mut(&mut self) -> &mut DimensionGraph {
        &mut self.graph
    }

    /// Resources stored at one node.
    pub fn node_index(&self, node: NodeId) -> Option<&NodeIndex> {
        self.indexes.get(node.0)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&CatalogEvent) + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.indexes.iter().map(NodeIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.iter().all(NodeIndex::is_empty)
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.indexes.iter().any(|index| index.contains(resource))
    }

    /// Every stored resource, grouped by node in graph order.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.indexes.iter().flat_map(NodeIndex::resources).collect()
    }

    /// Register resources.
    ///
    /// Each resource is stored at the deepest node of the first path that
    /// consumes all its variables. Resources that fit no path, or are already
    /// stored, are skipped. One `ResourcesAdded` event lists the new ones.
    pub fn append<I>(&mut self, resources: I) -> usize
    where
        I: IntoIterator<Item = Resource>,
    {
        self.sync_indexes();
        let mut added = Vec::new();
        for resource in resources {
            let Some(path) = self.graph.consumption_path(resource.variables()) else {
                debug!(
                    variables = ?resource.variables().iter().map(Variable::id).collect::<Vec<_>>(),
                    "Skipping resource that fits no dimension path"
                );
                continue;
            };
            let (start, target) = (path[0], path[path.len() - 1]);
            let resource = Arc::new(resource);
            if self.indexes[target.0].insert(&self.graph, Arc::clone(&resource), Some(start)) {
                added.push(resource);
            }
        }
        if !added.is_empty() {
            info!(added = added.len(), total = self.len(), "Resources appended");
            self.observers.notify(&CatalogEvent::ResourcesAdded(added.clone()));
        }
        added.len()
    }

    /// Remove resources. Unknown resources are ignored. One
    /// `ResourcesRemoved` event lists the removed ones.
    pub fn remove<'a, I>(&mut self, resources: I) -> usize
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        let mut removed = Vec::new();
        for resource in resources {
            let target = self
                .graph
                .target_node(resource.variables())
                .filter(|node| self.indexes.get(node.0).is_some_and(|i| i.contains(resource)))
                .or_else(|| {
                    self.indexes
                        .iter()
                        .find(|i| i.contains(resource))
                        .map(NodeIndex::node)
                });
            let Some(target) = target else {
                continue;
            };
            if self.indexes[target.0].delete(resource) {
                removed.push(Arc::new(resource.clone()));
            }
        }
        if !removed.is_empty() {
            info!(removed = removed.len(), total = self.len(), "Resources removed");
            self.observers
                .notify(&CatalogEvent::ResourcesRemoved(removed.clone()));
        }
        removed.len()
    }

    /// Store resources at a given node, bypassing routing. No event is emitted.
    pub fn append_to_node<I>(&mut self, node: NodeId, resources: I) -> usize
    where
        I: IntoIterator<Item = Resource>,
    {
        self.sync_indexes();
        match self.indexes.get_mut(node.0) {
            Some(index) => index.append(&self.graph, resources.into_iter().map(Arc::new)),
            None => 0,
        }
    }

    /// Remove resources from a given node. No event is emitted.
    pub fn remove_from_node<'a, I>(&mut self, node: NodeId, resources: I) -> usize
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        match self.indexes.get_mut(node.0) {
            Some(index) => index.remove(resources),
            None => 0,
        }
    }

    /// Node at which the given variables are all consumed along one
    /// top-down path.
    pub fn get_top_most_node_with_all_variables(&self, variables: &[Variable]) -> Option<NodeId> {
        self.graph.target_node(variables)
    }

    pub fn get_node_by_variable_collection(&self, collection_id: &str) -> Option<NodeId> {
        self.graph.node_by_collection_id(collection_id)
    }

    /// Resources stored at the node the variables resolve to that are
    /// defined by all of them.
    pub fn get_resources_by_variables(&self, variables: &[Variable]) -> Vec<Arc<Resource>> {
        self.get_top_most_node_with_all_variables(variables)
            .and_then(|node| self.node_index(node))
            .map(|index| index.get_resources_by_variables(false, variables))
            .unwrap_or_default()
    }

    /// Sorted, de-duplicated datetimes of the resources matching `variables`.
    pub fn get_times_by_variables(&self, variables: &[Variable]) -> Vec<DateTime<Utc>> {
        let times: BTreeSet<DateTime<Utc>> = self
            .get_resources_by_variables(variables)
            .iter()
            .filter_map(|r| r.datetime())
            .collect();
        times.into_iter().collect()
    }

    /// Datetimes of resources stored anywhere that are defined by all
    /// `variables`, sorted and de-duplicated.
    pub fn get_all_times_by_variables(&self, variables: &[Variable]) -> Vec<DateTime<Utc>> {
        let times: BTreeSet<DateTime<Utc>> = self
            .indexes
            .iter()
            .flat_map(|index| index.get_resources_by_variables(false, variables))
            .filter_map(|r| r.datetime())
            .collect();
        times.into_iter().collect()
    }

    /// Variables of `collection` for which some resource exists that is also
    /// defined by every constraining variable.
    ///
    /// Constraints on `collection` itself are ignored. The result keeps the
    /// collection's insertion order.
    pub fn get_available_variables(
        &self,
        collection: NodeId,
        constraints: &[Variable],
    ) -> Vec<Variable> {
        let Some(variables) = self.graph.collection(collection) else {
            return Vec::new();
        };
        let constraints: Vec<Variable> = constraints
            .iter()
            .filter(|v| v.collection() != collection)
            .cloned()
            .collect();

        let mut nodes = vec![collection];
        nodes.extend(self.graph.descendants(collection));
        nodes.extend(self.graph.ancestors(collection));

        let mut found = BTreeSet::new();
        for node in nodes {
            let Some(index) = self.node_index(node) else {
                continue;
            };
            for resource in index.get_resources_by_variables(false, &constraints) {
                if let Some(variable) = resource.variable_for(collection) {
                    found.insert(variable.clone());
                }
            }
        }
        variables
            .iter()
            .filter(|v| found.contains(*v))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            nodes: self.graph.len(),
            resources: self.len(),
            tree_nodes: self.indexes.iter().map(|i| i.tree().len()).sum(),
            per_collection: self
                .indexes
                .iter()
                .map(|i| (self.graph.collection_id(i.node()).to_string(), i.len()))
                .collect(),
        }
    }

    fn sync_indexes(&mut self) {
        while self.indexes.len() < self.graph.len() {
            self.indexes.push(NodeIndex::new(NodeId(self.indexes.len())));
        }
    }
}
