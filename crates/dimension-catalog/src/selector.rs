//! Adaptive selection of a complete, resource-backed variable assignment.
//!
//! A caller declares *display variables*, a partial wish such as
//! `{model: GFS, field: wind}`. The [`Selector`] walks the dimension graph
//! from its roots, extending the assignment one dimension at a time with
//! variables that have resources in context, and stops at the first
//! assignment its [`SelectionPolicy`] accepts. The result is the set of
//! *selected variables*.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::{ListenerId, Observers, SelectionEvent};
use crate::graph::NodeId;
use crate::registry::Catalog;
use crate::resource::Resource;
use crate::search::{first_success, SearchProblem};
use crate::timeline::TimeAxis;
use crate::variable::Variable;

/// Configuration for a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Try any available variable when the requested one is missing or
    /// a dimension is not requested at all.
    pub adaptive: bool,

    /// Collection ids that pin a timeline. An assignment covering all of
    /// them is usable even when no resource backs it.
    pub time_defining: Vec<String>,

    /// Name of the time set reported to the time axis.
    pub time_set: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            time_defining: Vec::new(),
            time_set: "default".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CATALOG_ADAPTIVE") {
            config.adaptive = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CATALOG_TIME_DEFINING") {
            config.time_defining = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(val) = std::env::var("CATALOG_TIME_SET") {
            if !val.is_empty() {
                config.time_set = val;
            }
        }

        config
    }
}

/// Ordering and acceptance rules for a selector.
pub trait SelectionPolicy {
    /// Whether `selection`, whose newest member is `last`, is good enough.
    ///
    /// By default the node of `last` must store a resource defined by the
    /// whole selection.
    fn is_acceptable(&self, catalog: &Catalog, selection: &[Variable], last: &Variable) -> bool {
        catalog
            .node_index(last.collection())
            .is_some_and(|index| index.has_resources_by_variables(false, selection))
    }

    /// Order of variables tried when no specific one was requested.
    /// By default, collection insertion order.
    fn compare(&self, catalog: &Catalog, a: &Variable, b: &Variable) -> Ordering {
        collection_position(catalog, a).cmp(&collection_position(catalog, b))
    }
}

/// Insertion order, accept as soon as a resource backs the selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl SelectionPolicy for DefaultPolicy {}

/// Prefer the most recently inserted variables, e.g. the newest run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestFirstPolicy;

impl SelectionPolicy for LatestFirstPolicy {
    fn compare(&self, catalog: &Catalog, a: &Variable, b: &Variable) -> Ordering {
        collection_position(catalog, b).cmp(&collection_position(catalog, a))
    }
}

fn collection_position(catalog: &Catalog, variable: &Variable) -> Option<usize> {
    catalog
        .graph()
        .collection(variable.collection())
        .and_then(|c| c.position(variable))
}

/// Maps display variables to selected variables and tracks what is visible.
pub struct Selector {
    config: SelectorConfig,
    policy: Box<dyn SelectionPolicy>,
    display_variables: Vec<Variable>,
    selected: Vec<Variable>,
    visible_resource: Option<Arc<Resource>>,
    selected_time: Option<DateTime<Utc>>,
    available_times: Vec<DateTime<Utc>>,
    observers: Observers<SelectionEvent>,
}

impl Selector {
    pub fn new(config: SelectorConfig) -> Self {
        Self::with_policy(config, DefaultPolicy)
    }

    pub fn with_policy<P>(config: SelectorConfig, policy: P) -> Self
    where
        P: SelectionPolicy + 'static,
    {
        Self {
            config,
            policy: Box::new(policy),
            display_variables: Vec::new(),
            selected: Vec::new(),
            visible_resource: None,
            selected_time: None,
            available_times: Vec::new(),
            observers: Observers::new(),
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn display_variables(&self) -> &[Variable] {
        &self.display_variables
    }

    /// Replace the requested variables. Takes effect on the next refresh.
    pub fn set_display_variables<I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = Variable>,
    {
        self.display_variables = variables.into_iter().collect();
    }

    /// The current assignment, ordered along its graph path.
    pub fn selected_variables(&self) -> &[Variable] {
        &self.selected
    }

    pub fn visible_resource(&self) -> Option<&Arc<Resource>> {
        self.visible_resource.as_ref()
    }

    pub fn selected_time(&self) -> Option<DateTime<Utc>> {
        self.selected_time
    }

    /// Times with a resource for the current assignment.
    pub fn available_times(&self) -> &[DateTime<Utc>] {
        &self.available_times
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SelectionEvent) + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Compute an assignment for the current display variables without
    /// changing any state.
    pub fn select(&self, catalog: &Catalog) -> Option<Vec<Variable>> {
        let graph = catalog.graph();
        if let Some(unknown) = self
            .display_variables
            .iter()
            .find(|v| !graph.collection(v.collection()).is_some_and(|c| c.contains(v)))
        {
            debug!(variable = %unknown, "Display variable is not part of the dimension graph");
            return None;
        }

        let time_defining: Vec<NodeId> = self
            .config
            .time_defining
            .iter()
            .filter_map(|id| {
                let node = graph.node_by_collection_id(id);
                if node.is_none() {
                    debug!(collection = %id, "Ignoring unknown time-defining collection");
                }
                node
            })
            .collect();

        let problem = Assignment {
            catalog,
            selector: self,
            time_defining,
        };
        let found = first_success(&problem, &graph.roots(), Vec::new());
        if found.is_none() {
            debug!(
                display = ?self.display_variables.iter().map(Variable::id).collect::<Vec<_>>(),
                "No assignment found"
            );
        }
        found
    }

    /// Recompute the assignment, available times and visible resource,
    /// notifying listeners and the time axis of what changed.
    ///
    /// Returns true if an assignment was found.
    pub fn refresh(&mut self, catalog: &Catalog, axis: Option<&mut dyn TimeAxis>) -> bool {
        let selected = self.select(catalog).unwrap_or_default();
        let found = !selected.is_empty();
        if selected != self.selected {
            info!(
                selected = ?selected.iter().map(Variable::id).collect::<Vec<_>>(),
                "Selected variables changed"
            );
            self.selected = selected;
            self.observers.notify(&SelectionEvent::SelectedVariablesChanged {
                selected: self.selected.clone(),
            });
        }

        let (all_times, enabled) = self.times(catalog);
        if enabled != self.available_times {
            self.available_times = enabled.clone();
            self.observers.notify(&SelectionEvent::AvailableTimesChanged {
                times: enabled.clone(),
            });
        }
        if let Some(axis) = axis {
            axis.set_times_of_set(&self.config.time_set, all_times);
            axis.set_enabled_times_of_set(&self.config.time_set, enabled);
        }

        self.update_visible_resource(catalog);
        found
    }

    /// Choose the instant whose resource should be visible.
    pub fn set_selected_time(&mut self, catalog: &Catalog, time: Option<DateTime<Utc>>) {
        self.selected_time = time;
        self.update_visible_resource(catalog);
    }

    /// All times for the time-defining part of the assignment, and the
    /// times backed by a resource for the whole assignment.
    fn times(&self, catalog: &Catalog) -> (Vec<DateTime<Utc>>, Vec<DateTime<Utc>>) {
        if self.selected.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let enabled = catalog.get_times_by_variables(&self.selected);
        let pinned: Vec<Variable> = if self.config.time_defining.is_empty() {
            self.selected.clone()
        } else {
            self.selected
                .iter()
                .filter(|v| {
                    let id = catalog.graph().collection_id(v.collection());
                    self.config.time_defining.iter().any(|t| t == id)
                })
                .cloned()
                .collect()
        };
        let mut all: BTreeSet<DateTime<Utc>> = catalog
            .get_all_times_by_variables(&pinned)
            .into_iter()
            .collect();
        all.extend(enabled.iter().copied());
        (all.into_iter().collect(), enabled)
    }

    fn update_visible_resource(&mut self, catalog: &Catalog) {
        let visible = if self.selected.is_empty() {
            None
        } else {
            catalog
                .get_resources_by_variables(&self.selected)
                .into_iter()
                .find(|r| r.datetime() == self.selected_time)
        };
        if visible != self.visible_resource {
            self.visible_resource = visible;
            self.observers.notify(&SelectionEvent::VisibleResourceChanged {
                resource: self.visible_resource.clone(),
            });
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("config", &self.config)
            .field("display_variables", &self.display_variables)
            .field("selected", &self.selected)
            .field("visible_resource", &self.visible_resource)
            .field("selected_time", &self.selected_time)
            .finish_non_exhaustive()
    }
}

/// The selection search over the dimension graph.
struct Assignment<'a> {
    catalog: &'a Catalog,
    selector: &'a Selector,
    time_defining: Vec<NodeId>,
}

impl SearchProblem for Assignment<'_> {
    type Node = NodeId;
    type Candidate = Variable;
    type State = Vec<Variable>;

    fn candidates(&self, node: NodeId, state: &Vec<Variable>) -> Vec<Variable> {
        let available = self.catalog.get_available_variables(node, state);
        let mut ordered: Vec<Variable> = self
            .selector
            .display_variables
            .iter()
            .filter(|v| v.collection() == node && available.contains(v))
            .cloned()
            .collect();
        if self.selector.config.adaptive {
            let mut rest: Vec<Variable> = available
                .into_iter()
                .filter(|v| !ordered.contains(v))
                .collect();
            rest.sort_by(|a, b| self.selector.policy.compare(self.catalog, a, b));
            ordered.extend(rest);
        }
        ordered
    }

    fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.catalog.graph().children(node).to_vec()
    }

    fn extend(&self, state: &Vec<Variable>, candidate: &Variable) -> Vec<Variable> {
        let mut next = state.clone();
        next.push(candidate.clone());
        next
    }

    fn is_accepted(&self, state: &Vec<Variable>, last: &Variable) -> bool {
        self.selector.policy.is_acceptable(self.catalog, state, last)
    }

    fn is_usable_fallback(&self, state: &Vec<Variable>) -> bool {
        !self.time_defining.is_empty()
            && self
                .time_defining
                .iter()
                .all(|node| state.iter().any(|v| v.collection() == *node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DimensionGraph;

    /// models -> fields, with GFS/ICON x temp/wind except ICON wind.
    fn catalog() -> (Catalog, NodeId, NodeId) {
        let mut graph = DimensionGraph::new();
        let models = graph.add_collection("models").unwrap();
        let fields = graph.add_collection("fields").unwrap();
        graph.append_child(models, &[fields]).unwrap();
        let mut resources = Vec::new();
        for (model, field) in [("GFS", "temp"), ("GFS", "wind"), ("ICON", "temp")] {
            let m = graph.get_or_insert_variable(models, model).unwrap();
            let f = graph.get_or_insert_variable(fields, field).unwrap();
            resources.push(Resource::new([m, f]));
        }
        let mut catalog = Catalog::new(graph);
        catalog.append(resources);
        (catalog, models, fields)
    }

    #[test]
    fn test_default_config() {
        let config = SelectorConfig::default();
        assert!(config.adaptive);
        assert!(config.time_defining.is_empty());
        assert_eq!(config.time_set, "default");
    }

    #[test]
    fn test_policies_order_by_insertion() {
        let (catalog, models, _) = catalog();
        let gfs = catalog.graph().variable(models, "GFS").unwrap();
        let icon = catalog.graph().variable(models, "ICON").unwrap();
        assert_eq!(DefaultPolicy.compare(&catalog, &gfs, &icon), Ordering::Less);
        assert_eq!(LatestFirstPolicy.compare(&catalog, &gfs, &icon), Ordering::Greater);
    }

    #[test]
    fn test_requested_variable_is_tried_first() {
        let (catalog, models, fields) = catalog();
        let wind = catalog.graph().variable(fields, "wind").unwrap();
        let mut selector = Selector::new(SelectorConfig::default());
        selector.set_display_variables([wind]);

        let selected = selector.select(&catalog).unwrap();
        let ids: Vec<&str> = selected.iter().map(Variable::id).collect();
        assert_eq!(ids, vec!["GFS", "wind"]);
        assert_eq!(selected[0].collection(), models);
    }

    #[test]
    fn test_adaptive_skips_unbacked_combination() {
        let (catalog, models, fields) = catalog();
        let icon = catalog.graph().variable(models, "ICON").unwrap();
        let wind = catalog.graph().variable(fields, "wind").unwrap();
        let mut selector = Selector::new(SelectorConfig::default());
        selector.set_display_variables([icon, wind]);

        // ICON is tried first and has no wind, so the field is substituted
        let selected = selector.select(&catalog).unwrap();
        let ids: Vec<&str> = selected.iter().map(Variable::id).collect();
        assert_eq!(ids, vec!["ICON", "temp"]);
    }

    #[test]
    fn test_refresh_clears_selection_when_nothing_fits() {
        let (mut catalog, models, fields) = catalog();
        let mut selector = Selector::new(SelectorConfig {
            adaptive: false,
            ..SelectorConfig::default()
        });
        let gfs = catalog.graph().variable(models, "GFS").unwrap();
        let wind = catalog.graph().variable(fields, "wind").unwrap();
        selector.set_display_variables([gfs.clone(), wind.clone()]);
        assert!(selector.refresh(&catalog, None));

        let backing = Resource::new([gfs, wind]);
        catalog.remove([&backing]);
        assert!(!selector.refresh(&catalog, None));
        assert!(selector.selected_variables().is_empty());
        assert!(selector.visible_resource().is_none());
    }
}
