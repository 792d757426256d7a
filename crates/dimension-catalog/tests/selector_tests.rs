//! Integration tests for adaptive selection and the viewer timeline.

use std::cell::RefCell;
use std::rc::Rc;

use dimension_catalog::{
    Catalog, LatestFirstPolicy, Resource, SelectionEvent, SelectionPolicy, Selector,
    SelectorConfig, TimeAxis, Timeline, Variable, Viewer,
};
use test_utils::{
    assert_variable_ids, forecast_series, reference_time, resource, resource_grid,
    standard_schema, time, values, Dimensions,
};

/// Models A and B, run t0, fields temp and wind; only wind has a level.
fn scenario_catalog() -> (Catalog, Dimensions) {
    let (mut graph, d) = standard_schema();
    let mut resources = Vec::new();
    for model in ["A", "B"] {
        resources.push(resource(
            &mut graph,
            &[(d.models, model), (d.runs, "t0"), (d.fields, "temp")],
        ));
        resources.push(resource(
            &mut graph,
            &[(d.models, model), (d.runs, "t0"), (d.fields, "wind"), (d.levels, "10m")],
        ));
    }
    let mut catalog = Catalog::new(graph);
    catalog.append(resources);
    (catalog, d)
}

fn grid_catalog() -> (Catalog, Dimensions) {
    let (mut graph, d) = standard_schema();
    let resources = resource_grid(
        &mut graph,
        &[d.models, d.runs, d.fields, d.levels],
        &[&values::MODELS, &values::RUNS, &values::FIELDS, &values::LEVELS],
        |_| false,
    );
    let mut catalog = Catalog::new(graph);
    catalog.append(resources);
    (catalog, d)
}

fn vars(catalog: &Catalog, pairs: &[(dimension_catalog::NodeId, &str)]) -> Vec<Variable> {
    pairs
        .iter()
        .map(|&(node, id)| catalog.graph().variable(node, id).unwrap())
        .collect()
}

fn selector(adaptive: bool) -> Selector {
    Selector::new(SelectorConfig {
        adaptive,
        ..SelectorConfig::default()
    })
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_adaptive_selection_completes_partial_request() {
    let (catalog, d) = scenario_catalog();
    let mut selector = selector(true);
    selector.set_display_variables(vars(&catalog, &[(d.models, "A"), (d.fields, "wind")]));

    assert!(selector.refresh(&catalog, None));
    assert_variable_ids!(selector.selected_variables(), ["A", "t0", "wind", "10m"]);
}

#[test]
fn test_strict_selection_without_level_fails() {
    let (catalog, d) = scenario_catalog();
    let mut selector = selector(false);
    selector.set_display_variables(vars(&catalog, &[(d.models, "A"), (d.fields, "wind")]));

    assert!(selector.select(&catalog).is_none());
    assert!(!selector.refresh(&catalog, None));
    assert!(selector.selected_variables().is_empty());
    assert!(selector.visible_resource().is_none());
}

#[test]
fn test_strict_selection_with_full_request() {
    let (catalog, d) = scenario_catalog();
    let mut selector = selector(false);
    selector.set_display_variables(vars(
        &catalog,
        &[(d.models, "B"), (d.runs, "t0"), (d.fields, "temp")],
    ));

    let selected = selector.select(&catalog).unwrap();
    assert_variable_ids!(selected, ["B", "t0", "temp"]);
}

#[test]
fn test_empty_request_picks_first_backed_assignment() {
    let (catalog, _) = grid_catalog();
    let mut selector = selector(true);
    assert!(selector.refresh(&catalog, None));
    assert_variable_ids!(selector.selected_variables(), ["GFS", "00Z", "temperature", "2m"]);
}

#[test]
fn test_unbacked_request_falls_back_when_adaptive() {
    let (mut graph, d) = standard_schema();
    let gfs_only = resource(
        &mut graph,
        &[(d.models, "GFS"), (d.runs, "00Z"), (d.fields, "wind"), (d.levels, "10m")],
    );
    let icon = graph.get_or_insert_variable(d.models, "ICON").unwrap();
    let mut catalog = Catalog::new(graph);
    catalog.append([gfs_only]);

    let mut adaptive = selector(true);
    adaptive.set_display_variables([icon.clone()]);
    assert_variable_ids!(adaptive.select(&catalog).unwrap(), ["GFS", "00Z", "wind", "10m"]);

    let mut strict = selector(false);
    strict.set_display_variables([icon]);
    assert!(strict.select(&catalog).is_none());
}

#[test]
fn test_unknown_display_variable_yields_no_assignment() {
    let (catalog, _) = grid_catalog();
    let (mut other, od) = standard_schema();
    let ecmwf = other.get_or_insert_variable(od.models, "ECMWF").unwrap();

    let mut selector = selector(true);
    selector.set_display_variables([ecmwf]);
    assert!(selector.select(&catalog).is_none());
}

#[test]
fn test_value_outside_collection_is_never_substituted() {
    let (catalog, d) = grid_catalog();
    let ecmwf = Variable::new(d.models, "ECMWF");
    assert!(catalog.graph().variable(d.models, "ECMWF").is_none());

    for adaptive in [true, false] {
        let mut selector = selector(adaptive);
        selector.set_display_variables([ecmwf.clone()]);
        assert!(selector.select(&catalog).is_none());
        assert!(!selector.refresh(&catalog, None));
        assert!(selector.selected_variables().is_empty());
    }
}

#[test]
fn test_empty_catalog_yields_no_assignment() {
    let (graph, _) = standard_schema();
    let catalog = Catalog::new(graph);
    assert!(selector(true).select(&catalog).is_none());
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_selection_is_independent_of_append_order() {
    let build = |reverse: bool| {
        let (mut graph, d) = standard_schema();
        let mut resources = resource_grid(
            &mut graph,
            &[d.models, d.runs, d.fields, d.levels],
            &[&values::MODELS, &values::RUNS, &values::FIELDS, &values::LEVELS],
            |combo| combo[0] == "GFS" && combo[1] == "00Z",
        );
        if reverse {
            resources.reverse();
        }
        let mut catalog = Catalog::new(graph);
        catalog.append(resources);
        (catalog, d)
    };

    let (forward, d) = build(false);
    let (backward, _) = build(true);
    let wanted_forward = vars(&forward, &[(d.fields, "wind")]);
    let wanted_backward = vars(&backward, &[(d.fields, "wind")]);

    let mut a = selector(true);
    a.set_display_variables(wanted_forward);
    let mut b = selector(true);
    b.set_display_variables(wanted_backward);

    let first = a.select(&forward).unwrap();
    assert_eq!(a.select(&forward).unwrap(), first);
    assert_eq!(b.select(&backward).unwrap(), first);
    assert_variable_ids!(first, ["GFS", "06Z", "wind", "2m"]);
}

// =============================================================================
// Policy Tests
// =============================================================================

#[test]
fn test_latest_first_policy() {
    let (catalog, _) = grid_catalog();
    let selector = Selector::with_policy(SelectorConfig::default(), LatestFirstPolicy);
    assert_variable_ids!(
        selector.select(&catalog).unwrap(),
        ["ICON", "12Z", "precipitation", "850hPa"]
    );
}

/// Accepts as soon as a model is chosen.
struct ModelOnly;

impl SelectionPolicy for ModelOnly {
    fn is_acceptable(&self, _catalog: &Catalog, selection: &[Variable], _last: &Variable) -> bool {
        !selection.is_empty()
    }
}

#[test]
fn test_custom_acceptance_stops_early() {
    let (catalog, d) = grid_catalog();
    let mut selector = Selector::with_policy(SelectorConfig::default(), ModelOnly);
    selector.set_display_variables(vars(&catalog, &[(d.models, "ICON")]));
    assert_variable_ids!(selector.select(&catalog).unwrap(), ["ICON"]);
}

#[test]
fn test_time_defining_fallback() {
    let (mut graph, d) = standard_schema();
    let base = resource(
        &mut graph,
        &[(d.models, "GFS"), (d.runs, "00Z"), (d.fields, "wind"), (d.levels, "10m")],
    );
    let series = forecast_series(&base, reference_time(), &[0, 6]);
    let mut catalog = Catalog::new(graph);
    catalog.append(series.iter().cloned());
    let wanted = vars(&catalog, &[(d.models, "GFS"), (d.runs, "00Z")]);

    let mut plain = selector(false);
    plain.set_display_variables(wanted.clone());
    assert!(plain.select(&catalog).is_none());

    let mut pinned = Selector::new(SelectorConfig {
        adaptive: false,
        time_defining: vec!["models".to_string(), "runs".to_string()],
        time_set: "gfs".to_string(),
    });
    pinned.set_display_variables(wanted);
    let mut timeline = Timeline::new();
    assert!(pinned.refresh(&catalog, Some(&mut timeline as &mut dyn TimeAxis)));

    assert_variable_ids!(pinned.selected_variables(), ["GFS", "00Z"]);
    // every instant of the run is listed, none is backed at this depth
    assert_eq!(
        timeline.times_of_set("gfs"),
        series.iter().filter_map(Resource::datetime).collect::<Vec<_>>()
    );
    assert!(timeline.enabled_times().is_empty());
    assert!(pinned.visible_resource().is_none());
}

// =============================================================================
// Event Tests
// =============================================================================

#[test]
fn test_selection_events_fire_on_change_only() {
    let (catalog, d) = scenario_catalog();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);

    let mut selector = selector(true);
    selector.subscribe(move |event| {
        let name = match event {
            SelectionEvent::SelectedVariablesChanged { .. } => "selected",
            SelectionEvent::VisibleResourceChanged { .. } => "visible",
            SelectionEvent::AvailableTimesChanged { .. } => "times",
        };
        sink.borrow_mut().push(name);
    });
    selector.set_display_variables(vars(&catalog, &[(d.fields, "wind")]));

    selector.refresh(&catalog, None);
    // timeless resources are visible while no time is selected
    assert_eq!(*log.borrow(), vec!["selected", "visible"]);
    let visible = selector.visible_resource().unwrap();
    assert_eq!(visible.variables(), selector.selected_variables());

    selector.refresh(&catalog, None);
    assert_eq!(log.borrow().len(), 2);

    selector.set_display_variables(vars(&catalog, &[(d.models, "B"), (d.fields, "wind")]));
    selector.refresh(&catalog, None);
    assert_eq!(
        *log.borrow(),
        vec!["selected", "visible", "selected", "visible"]
    );
}

// =============================================================================
// Viewer Tests
// =============================================================================

fn forecast_viewer() -> (Viewer, Dimensions, Vec<Resource>) {
    let (mut graph, d) = standard_schema();
    let wind = resource(
        &mut graph,
        &[(d.models, "GFS"), (d.runs, "00Z"), (d.fields, "wind"), (d.levels, "10m")],
    );
    let temperature = resource(
        &mut graph,
        &[(d.models, "GFS"), (d.runs, "00Z"), (d.fields, "temperature"), (d.levels, "2m")],
    );
    let hours = time::FORECAST_HOURS;
    let wind_series = forecast_series(&wind, reference_time(), &hours);
    let mut viewer = Viewer::new(graph);
    viewer.append(wind_series.iter().cloned());
    viewer.append(forecast_series(&temperature, reference_time(), &hours[..2]));
    (viewer, d, wind_series)
}

#[test]
fn test_viewer_selects_first_enabled_time() {
    let (mut viewer, d, wind_series) = forecast_viewer();
    let wanted = vars(viewer.catalog(), &[(d.fields, "wind")]);
    let idx = viewer.add_container(selector(true));
    assert!(viewer.set_display_variables(idx, wanted));

    assert_eq!(viewer.timeline().selected(), wind_series[0].datetime());
    assert_eq!(viewer.timeline().enabled_times().len(), 4);
    assert_eq!(
        viewer.visible_resource(idx).map(|r| (**r).clone()),
        Some(wind_series[0].clone())
    );
    assert!(!viewer.set_display_variables(idx + 1, Vec::new()));
}

#[test]
fn test_viewer_steps_through_time() {
    let (mut viewer, d, wind_series) = forecast_viewer();
    let wanted = vars(viewer.catalog(), &[(d.fields, "wind")]);
    let mut container = selector(true);
    container.set_display_variables(wanted);
    let idx = viewer.add_container(container);

    assert_eq!(viewer.select_next_time(), wind_series[1].datetime());
    assert_eq!(
        viewer.visible_resource(idx).map(|r| r.uri().map(String::from)),
        Some(wind_series[1].uri().map(String::from))
    );

    // removing the visible instant hides it and disables that time
    assert_eq!(viewer.remove([&wind_series[1]]), 1);
    assert!(viewer.visible_resource(idx).is_none());
    assert!(!viewer.timeline().is_enabled(wind_series[1].datetime().unwrap()));

    assert_eq!(viewer.select_next_time(), wind_series[2].datetime());
    assert_eq!(
        viewer.visible_resource(idx).map(|r| (**r).clone()),
        Some(wind_series[2].clone())
    );
    assert_eq!(viewer.select_previous_time(), wind_series[0].datetime());
}

#[test]
fn test_viewer_keeps_containers_on_shared_time() {
    let (mut viewer, d, wind_series) = forecast_viewer();
    let wind = vars(viewer.catalog(), &[(d.fields, "wind")]);
    let temperature = vars(viewer.catalog(), &[(d.fields, "temperature")]);

    let mut first = Selector::new(SelectorConfig {
        time_set: "wind".to_string(),
        ..SelectorConfig::default()
    });
    first.set_display_variables(wind);
    let mut second = Selector::new(SelectorConfig {
        time_set: "temperature".to_string(),
        ..SelectorConfig::default()
    });
    second.set_display_variables(temperature);
    let a = viewer.add_container(first);
    let b = viewer.add_container(second);

    assert_eq!(viewer.timeline().times_of_set("temperature").len(), 2);
    assert!(viewer.select_time(wind_series[3].datetime().unwrap()));
    assert!(viewer.visible_resource(a).is_some());
    // no temperature at +12h
    assert!(viewer.visible_resource(b).is_none());
    assert_eq!(viewer.container(b).unwrap().selected_time(), wind_series[3].datetime());
}
