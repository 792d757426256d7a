//! Path tree: the materialized combinations of variables seen while indexing.
//!
//! The tree mirrors the dimension graph, but only along combinations that
//! resources actually use. Every tree node belongs to one dimension node;
//! an edge is labelled by a variable of the parent's dimension and leads to
//! a tree node of a child dimension. Nodes live in an arena and are found
//! by `(parent, variable, child dimension)` keys, so a sub-dimension that
//! is reachable through several parents never duplicates a subtree.
//!
//! ```text
//! models ──GFS──▶ runs ──00Z──▶ fields ──temp──▶ levels
//!                                  └──precip──▶ accumulations
//! ```

use std::collections::BTreeMap;

use tracing::trace;

use crate::graph::{DimensionGraph, NodeId};
use crate::resource::Resource;
use crate::variable::Variable;

/// Handle of a node in a [`PathTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u64);

#[derive(Debug)]
struct TreeNode {
    dimension: NodeId,
    parent: Option<TreeId>,
    children: BTreeMap<(Variable, NodeId), TreeId>,
}

/// Arena of path tree nodes, with one root per starting dimension.
#[derive(Debug, Default)]
pub struct PathTree {
    nodes: BTreeMap<TreeId, TreeNode>,
    roots: BTreeMap<NodeId, TreeId>,
    next_id: u64,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized tree nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TreeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Dimension node a tree node stands for.
    pub fn dimension(&self, id: TreeId) -> Option<NodeId> {
        self.nodes.get(&id).map(|n| n.dimension)
    }

    pub fn parent(&self, id: TreeId) -> Option<TreeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn root(&self, dimension: NodeId) -> Option<TreeId> {
        self.roots.get(&dimension).copied()
    }

    /// Roots in dimension order.
    pub fn roots(&self) -> impl Iterator<Item = TreeId> + '_ {
        self.roots.values().copied()
    }

    /// Outgoing edges of a tree node: `(label, child dimension, child)`.
    pub fn children(&self, id: TreeId) -> impl Iterator<Item = (&Variable, NodeId, TreeId)> + '_ {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|((v, d), c)| (v, *d, *c)))
    }

    pub fn has_children(&self, id: TreeId) -> bool {
        self.nodes
            .get(&id)
            .map(|n| !n.children.is_empty())
            .unwrap_or(false)
    }

    /// Edge labels from the root down to a tree node.
    pub fn path_to(&self, id: TreeId) -> Vec<Variable> {
        let mut labels = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if let Some(node) = self.nodes.get(&parent) {
                if let Some(((label, _), _)) =
                    node.children.iter().find(|(_, child)| **child == current)
                {
                    labels.push(label.clone());
                }
            }
            current = parent;
        }
        labels.reverse();
        labels
    }

    /// Return the root for a starting dimension, creating it on first use.
    pub fn root_or_insert(&mut self, dimension: NodeId) -> TreeId {
        if let Some(root) = self.root(dimension) {
            return root;
        }
        let root = self.allocate(dimension, None);
        self.roots.insert(dimension, root);
        root
    }

    /// Extend the tree from `from` down to a tree node of `aimed`.
    ///
    /// At each step the resource's variable for the current dimension labels
    /// the edge, and the child dimension is the first graph child the
    /// resource also has a variable for and from which `aimed` is reachable.
    /// Existing edges are reused. Nothing is created unless the whole walk
    /// succeeds.
    pub fn build_children_tree_for_resource(
        &mut self,
        graph: &DimensionGraph,
        from: TreeId,
        resource: &Resource,
        aimed: NodeId,
    ) -> Option<TreeId> {
        let start = self.dimension(from)?;
        let steps = plan_steps(graph, start, resource, aimed)?;

        let mut current = from;
        for (label, child_dimension) in steps {
            let existing = self
                .nodes
                .get(&current)
                .and_then(|n| n.children.get(&(label.clone(), child_dimension)))
                .copied();
            current = match existing {
                Some(child) => child,
                None => {
                    let child = self.allocate(child_dimension, Some(current));
                    if let Some(node) = self.nodes.get_mut(&current) {
                        node.children.insert((label.clone(), child_dimension), child);
                    }
                    trace!(label = %label, dimension = child_dimension.index(), "Created path tree node");
                    child
                }
            };
        }
        Some(current)
    }

    /// Read-only walk along existing edges labelled by the given variables.
    ///
    /// Never creates nodes. At a branching point the edge leading to `aimed`
    /// wins, then an edge whose child dimension is named by a variable.
    pub fn find_node_by_variables(
        &self,
        start: NodeId,
        variables: &[Variable],
        aimed: NodeId,
    ) -> Option<TreeId> {
        let mut current = self.root(start)?;
        loop {
            let node = self.nodes.get(&current)?;
            if node.dimension == aimed {
                return Some(current);
            }
            let label = variables
                .iter()
                .find(|v| v.collection() == node.dimension)?;
            let mut edges = node
                .children
                .range((label.clone(), NodeId(0))..)
                .take_while(|((v, _), _)| v == label);
            let next = edges
                .clone()
                .find(|((_, d), _)| *d == aimed)
                .or_else(|| {
                    edges.find(|((_, d), _)| variables.iter().any(|v| v.collection() == *d))
                })
                .map(|(_, child)| *child)?;
            current = next;
        }
    }

    /// Detach `child` from `parent`, then prune `parent` if it is left empty.
    ///
    /// `is_occupied` reports whether the owning index still files resources
    /// under a tree node.
    pub fn remove_child<F>(&mut self, parent: TreeId, child: TreeId, is_occupied: &F)
    where
        F: Fn(TreeId) -> bool,
    {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|_, c| *c != child);
        }
        self.nodes.remove(&child);
        trace!(?child, "Removed path tree node");
        self.prune(parent, is_occupied);
    }

    /// Remove `id` and its now-empty ancestors, bottom-up.
    pub fn prune<F>(&mut self, id: TreeId, is_occupied: &F)
    where
        F: Fn(TreeId) -> bool,
    {
        if self.has_children(id) || is_occupied(id) {
            return;
        }
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let (parent, dimension) = (node.parent, node.dimension);
        match parent {
            Some(parent) => self.remove_child(parent, id, is_occupied),
            None => {
                self.nodes.remove(&id);
                self.roots.remove(&dimension);
                trace!(dimension = dimension.index(), "Removed path tree root");
            }
        }
    }

    fn allocate(&mut self, dimension: NodeId, parent: Option<TreeId>) -> TreeId {
        let id = TreeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            TreeNode {
                dimension,
                parent,
                children: BTreeMap::new(),
            },
        );
        id
    }
}

/// The `(edge label, child dimension)` steps leading from `start` to `aimed`.
fn plan_steps(
    graph: &DimensionGraph,
    start: NodeId,
    resource: &Resource,
    aimed: NodeId,
) -> Option<Vec<(Variable, NodeId)>> {
    let mut steps = Vec::new();
    let mut current = start;
    while current != aimed {
        let label = resource.variable_for(current)?.clone();
        let next = graph.children(current).iter().copied().find(|&child| {
            resource.variable_for(child).is_some()
                && (child == aimed || graph.is_descendant(child, aimed))
        })?;
        steps.push((label, next));
        current = next;
    }
    Some(steps)
}
