//! Resource inventory files.
//!
//! An inventory is a YAML list of resources, each naming one value per
//! collection plus an optional instant and location:
//!
//! ```yaml
//! - variables: {models: GFS, runs: "00Z", fields: wind, levels: 10m}
//!   reference_time: "2024-01-15T00:00:00Z"
//!   forecast_hour: 6
//!   uri: "s3://forecasts/gfs/00Z/wind10m/f006.png"
//! ```
//!
//! `datetime` may be given directly instead of a reference time and
//! forecast hour.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dimension_catalog::{
    parse_iso8601, CatalogError, CatalogResult, DimensionGraph, Resource, ValidTime,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Collection id to variable id.
    pub variables: BTreeMap<String, String>,

    #[serde(default)]
    pub datetime: Option<String>,

    #[serde(default)]
    pub reference_time: Option<String>,

    #[serde(default)]
    pub forecast_hour: Option<u32>,

    #[serde(default)]
    pub uri: Option<String>,
}

impl InventoryEntry {
    /// Build the resource, creating variables that are not yet known.
    pub fn to_resource(&self, graph: &mut DimensionGraph) -> CatalogResult<Resource> {
        let mut builder = Resource::builder();
        for (collection, value) in &self.variables {
            let node = graph
                .node_by_collection_id(collection)
                .ok_or_else(|| CatalogError::UnknownCollection(collection.clone()))?;
            builder = builder.variable(graph.get_or_insert_variable(node, value)?);
        }

        match (&self.datetime, &self.reference_time) {
            (Some(datetime), _) => {
                builder = builder.datetime(parse_iso8601(datetime)?);
            }
            (None, Some(reference)) => {
                let reference = parse_iso8601(reference)?;
                builder = builder
                    .valid_time(ValidTime::new(reference, self.forecast_hour.unwrap_or(0)));
            }
            (None, None) => {
                if self.forecast_hour.is_some() {
                    return Err(CatalogError::InvalidTime(
                        "forecast_hour requires reference_time".to_string(),
                    ));
                }
            }
        }

        if let Some(uri) = &self.uri {
            builder = builder.uri(uri.clone());
        }
        Ok(builder.build())
    }
}

pub fn load_inventory(path: &Path) -> Result<Vec<InventoryEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read inventory: {}", path.display()))?;
    parse_inventory(&content)
        .with_context(|| format!("Failed to parse inventory: {}", path.display()))
}

pub fn parse_inventory(content: &str) -> Result<Vec<InventoryEntry>> {
    let entries: Vec<InventoryEntry> = serde_yaml::from_str(content)?;
    Ok(entries)
}

/// Convert every entry, failing on the first invalid one.
pub fn to_resources(
    entries: &[InventoryEntry],
    graph: &mut DimensionGraph,
) -> Result<Vec<Resource>> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            entry
                .to_resource(graph)
                .with_context(|| format!("Invalid inventory entry #{}", idx))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dimension_catalog::SchemaConfig;

    fn graph() -> DimensionGraph {
        SchemaConfig::from_yaml(
            "collections:\n  - id: models\n    children: [fields]\n  - id: fields\n",
        )
        .unwrap()
        .build()
        .unwrap()
    }

    #[test]
    fn test_entry_with_valid_time() {
        let entries = parse_inventory(
            r#"
- variables: {models: GFS, fields: wind}
  reference_time: "2024-01-15T00:00:00Z"
  forecast_hour: 6
  uri: "mem://wind"
"#,
        )
        .unwrap();
        let mut graph = graph();
        let resource = entries[0].to_resource(&mut graph).unwrap();

        assert_eq!(resource.variables().len(), 2);
        assert_eq!(
            resource.datetime(),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap())
        );
        assert_eq!(resource.uri(), Some("mem://wind"));
        let fields = graph.node_by_collection_id("fields").unwrap();
        assert!(graph.variable(fields, "wind").is_some());
    }

    #[test]
    fn test_entry_without_time() {
        let entries = parse_inventory("- variables: {models: GFS}\n").unwrap();
        let resource = entries[0].to_resource(&mut graph()).unwrap();
        assert_eq!(resource.datetime(), None);
        assert_eq!(resource.uri(), None);
    }

    #[test]
    fn test_unknown_collection_rejected() {
        let entries = parse_inventory("- variables: {ensembles: p01}\n").unwrap();
        let err = entries[0].to_resource(&mut graph()).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCollection(id) if id == "ensembles"));
    }

    #[test]
    fn test_bad_datetime_rejected() {
        let entries =
            parse_inventory("- variables: {models: GFS}\n  datetime: yesterday\n").unwrap();
        let err = entries[0].to_resource(&mut graph()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTime(_)));
    }

    #[test]
    fn test_forecast_hour_needs_reference() {
        let entries =
            parse_inventory("- variables: {models: GFS}\n  forecast_hour: 3\n").unwrap();
        assert!(entries[0].to_resource(&mut graph()).is_err());
    }

    #[test]
    fn test_to_resources_reports_entry() {
        let entries =
            parse_inventory("- variables: {models: GFS}\n- variables: {bogus: x}\n").unwrap();
        let err = to_resources(&entries, &mut graph()).unwrap_err();
        assert!(format!("{:#}", err).contains("entry #1"));
    }
}
