//! Resource generators for building catalogs in tests.
//!
//! Generators create variables on demand, so a bare schema from
//! [`standard_schema`](crate::standard_schema) is enough to start with.

use chrono::{DateTime, Utc};
use dimension_catalog::{DimensionGraph, NodeId, Resource, ValidTime};

/// Builds one resource from `(collection, value)` pairs.
pub fn resource(graph: &mut DimensionGraph, pairs: &[(NodeId, &str)]) -> Resource {
    Resource::new(
        pairs
            .iter()
            .map(|&(node, value)| graph.get_or_insert_variable(node, value).unwrap()),
    )
}

/// Creates one resource per combination of `values`, the cartesian product
/// taken over `dims` in order.
///
/// Combinations for which `exclude` returns true are skipped. The callback
/// sees the values in `dims` order.
///
/// # Example
///
/// ```
/// use test_utils::{resource_grid, standard_schema};
///
/// let (mut graph, d) = standard_schema();
/// let resources = resource_grid(
///     &mut graph,
///     &[d.models, d.fields],
///     &[&["GFS", "ICON"], &["temperature", "wind"]],
///     |combo| combo == ["ICON", "wind"],
/// );
/// assert_eq!(resources.len(), 3);
/// ```
pub fn resource_grid<F>(
    graph: &mut DimensionGraph,
    dims: &[NodeId],
    values: &[&[&str]],
    exclude: F,
) -> Vec<Resource>
where
    F: Fn(&[&str]) -> bool,
{
    assert_eq!(dims.len(), values.len(), "one value list per dimension");
    let mut combos: Vec<Vec<&str>> = vec![Vec::new()];
    for options in values {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                options.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(*value);
                    next
                })
            })
            .collect();
    }

    combos
        .into_iter()
        .filter(|combo| !exclude(combo))
        .map(|combo| {
            let pairs: Vec<(NodeId, &str)> =
                dims.iter().copied().zip(combo.iter().copied()).collect();
            resource(graph, &pairs)
        })
        .collect()
}

/// Copies of `base` at each forecast hour of one run, with a URI per step.
pub fn forecast_series(
    base: &Resource,
    reference_time: DateTime<Utc>,
    hours: &[u32],
) -> Vec<Resource> {
    hours
        .iter()
        .map(|&hour| {
            let valid = ValidTime::new(reference_time, hour);
            Resource::builder()
                .variables(base.variables().iter().cloned())
                .valid_time(valid)
                .uri(format!("mem://{}/f{:03}", valid.run_label(), hour))
                .build()
        })
        .collect()
}
