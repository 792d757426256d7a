//! Viewer: a catalog, its selectors ("containers") and a shared timeline.
//!
//! Every mutation goes through the viewer, which refreshes the selectors
//! once per batch after the catalog is consistent.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::graph::DimensionGraph;
use crate::registry::Catalog;
use crate::resource::Resource;
use crate::selector::Selector;
use crate::timeline::Timeline;
use crate::variable::Variable;

#[derive(Debug)]
pub struct Viewer {
    catalog: Catalog,
    timeline: Timeline,
    containers: Vec<Selector>,
}

impl Viewer {
    pub fn new(graph: DimensionGraph) -> Self {
        Self::from_catalog(Catalog::new(graph))
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            timeline: Timeline::new(),
            containers: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Schema access for creating variables.
    pub fn graph_mut(&mut self) -> &mut DimensionGraph {
        self.catalog.graph_mut()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Add a selector and compute its first assignment. Returns its index.
    pub fn add_container(&mut self, selector: Selector) -> usize {
        self.containers.push(selector);
        let idx = self.containers.len() - 1;
        self.refresh_container(idx);
        idx
    }

    pub fn container(&self, idx: usize) -> Option<&Selector> {
        self.containers.get(idx)
    }

    /// Mutable access, e.g. to subscribe to selection events.
    pub fn container_mut(&mut self, idx: usize) -> Option<&mut Selector> {
        self.containers.get_mut(idx)
    }

    pub fn containers(&self) -> &[Selector] {
        &self.containers
    }

    pub fn append<I>(&mut self, resources: I) -> usize
    where
        I: IntoIterator<Item = Resource>,
    {
        let added = self.catalog.append(resources);
        if added > 0 {
            self.refresh_all();
        }
        added
    }

    pub fn remove<'a, I>(&mut self, resources: I) -> usize
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        let removed = self.catalog.remove(resources);
        if removed > 0 {
            self.refresh_all();
        }
        removed
    }

    /// Change what a container asks for. Returns false for an unknown index.
    pub fn set_display_variables<I>(&mut self, idx: usize, variables: I) -> bool
    where
        I: IntoIterator<Item = Variable>,
    {
        let Some(selector) = self.containers.get_mut(idx) else {
            return false;
        };
        selector.set_display_variables(variables);
        self.refresh_container(idx);
        true
    }

    /// Select an instant on the timeline and show it in every container.
    pub fn select_time(&mut self, time: DateTime<Utc>) -> bool {
        if !self.timeline.select(time) {
            return false;
        }
        self.propagate_time();
        true
    }

    pub fn select_next_time(&mut self) -> Option<DateTime<Utc>> {
        let next = self.timeline.select_next_enabled();
        self.propagate_time();
        next
    }

    pub fn select_previous_time(&mut self) -> Option<DateTime<Utc>> {
        let previous = self.timeline.select_previous_enabled();
        self.propagate_time();
        previous
    }

    /// Resource currently shown by a container.
    pub fn visible_resource(&self, idx: usize) -> Option<&Arc<Resource>> {
        self.containers.get(idx).and_then(Selector::visible_resource)
    }

    fn refresh_all(&mut self) {
        for idx in 0..self.containers.len() {
            self.refresh_container(idx);
        }
    }

    fn refresh_container(&mut self, idx: usize) {
        if let Some(selector) = self.containers.get_mut(idx) {
            selector.refresh(&self.catalog, Some(&mut self.timeline));
        }
        if self.timeline.selected().is_none() {
            self.timeline.select_first_enabled();
        }
        self.propagate_time();
    }

    fn propagate_time(&mut self) {
        let time = self.timeline.selected();
        for selector in self.containers.iter_mut() {
            if selector.selected_time() != time || selector.visible_resource().is_none() {
                selector.set_selected_time(&self.catalog, time);
            }
        }
    }
}
