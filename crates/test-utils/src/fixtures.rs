//! Common test fixtures for catalog tests.
//!
//! The standard schema mirrors a forecast catalog:
//!
//! ```text
//! models -> runs -> fields -> levels --------> thresholds
//!                          \-> accumulations -/
//! ```

use chrono::{DateTime, TimeZone, Utc};
use dimension_catalog::{DimensionGraph, NodeId};

/// Variable values used across tests.
pub mod values {
    pub const MODELS: [&str; 2] = ["GFS", "ICON"];
    pub const RUNS: [&str; 3] = ["00Z", "06Z", "12Z"];
    pub const FIELDS: [&str; 3] = ["temperature", "wind", "precipitation"];
    pub const LEVELS: [&str; 3] = ["2m", "10m", "850hPa"];
    pub const ACCUMULATIONS: [&str; 2] = ["1h", "6h"];
    pub const THRESHOLDS: [&str; 2] = ["p50", "p90"];
}

/// Common time constants.
pub mod time {
    /// Reference time used by forecast series
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";

    /// Forecast hours of a short series
    pub const FORECAST_HOURS: [u32; 4] = [0, 3, 6, 12];
}

/// Node ids of the standard schema.
#[derive(Debug, Clone, Copy)]
pub struct Dimensions {
    pub models: NodeId,
    pub runs: NodeId,
    pub fields: NodeId,
    pub levels: NodeId,
    pub accumulations: NodeId,
    pub thresholds: NodeId,
}

/// The standard forecast schema, with no variables yet.
pub fn standard_schema() -> (DimensionGraph, Dimensions) {
    let mut graph = DimensionGraph::new();
    let dims = Dimensions {
        models: graph.add_collection("models").unwrap(),
        runs: graph.add_collection("runs").unwrap(),
        fields: graph.add_collection("fields").unwrap(),
        levels: graph.add_collection("levels").unwrap(),
        accumulations: graph.add_collection("accumulations").unwrap(),
        thresholds: graph.add_collection("thresholds").unwrap(),
    };
    graph.append_child(dims.models, &[dims.runs]).unwrap();
    graph.append_child(dims.runs, &[dims.fields]).unwrap();
    graph
        .append_child(dims.fields, &[dims.levels, dims.accumulations])
        .unwrap();
    graph.append_child(dims.levels, &[dims.thresholds]).unwrap();
    graph
        .append_child(dims.accumulations, &[dims.thresholds])
        .unwrap();
    (graph, dims)
}

/// [`time::REFERENCE_TIME`] as a datetime.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}
