//! Dimension schema configuration.
//!
//! The schema is wired once at startup from YAML:
//!
//! ```yaml
//! collections:
//!   - id: models
//!     variables: [GFS, ICON]
//!     children: [runs]
//!   - id: runs
//!     children: [fields]
//!   - id: fields
//! ```
//!
//! Collections are created in file order; `children` may reference
//! collections declared further down.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CatalogError, CatalogResult};
use crate::graph::DimensionGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub id: String,

    /// Variables known up front. More are created as resources arrive.
    #[serde(default)]
    pub variables: Vec<String>,

    /// Ids of child collections.
    #[serde(default)]
    pub children: Vec<String>,
}

impl SchemaConfig {
    /// Load a schema from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogError::Io(format!("Failed to read schema {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> CatalogResult<Self> {
        let config: SchemaConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ids are unique and children refer to declared collections.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.collections.is_empty() {
            return Err(CatalogError::config("schema declares no collections"));
        }
        for (idx, collection) in self.collections.iter().enumerate() {
            if collection.id.trim().is_empty() {
                return Err(CatalogError::config(format!(
                    "collection #{} has an empty id",
                    idx
                )));
            }
            if self.collections[..idx].iter().any(|c| c.id == collection.id) {
                return Err(CatalogError::config(format!(
                    "collection '{}' is declared twice",
                    collection.id
                )));
            }
            for child in &collection.children {
                if !self.collections.iter().any(|c| &c.id == child) {
                    return Err(CatalogError::config(format!(
                        "collection '{}' lists unknown child '{}'",
                        collection.id, child
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the dimension graph.
    pub fn build(&self) -> CatalogResult<DimensionGraph> {
        self.validate()?;
        let mut graph = DimensionGraph::new();
        for collection in &self.collections {
            let node = graph.add_collection(&collection.id)?;
            for variable in &collection.variables {
                graph.get_or_insert_variable(node, variable)?;
            }
        }
        for collection in &self.collections {
            let parent = graph
                .node_by_collection_id(&collection.id)
                .ok_or_else(|| CatalogError::UnknownCollection(collection.id.clone()))?;
            let children = collection
                .children
                .iter()
                .map(|id| {
                    graph
                        .node_by_collection_id(id)
                        .ok_or_else(|| CatalogError::UnknownCollection(id.clone()))
                })
                .collect::<CatalogResult<Vec<_>>>()?;
            graph.append_child(parent, &children).map_err(|e| match e {
                CatalogError::CycleDetected { parent, child } => CatalogError::config(format!(
                    "edge {} -> {} would create a cycle",
                    parent, child
                )),
                other => other,
            })?;
        }
        info!(
            collections = graph.len(),
            roots = graph.roots().len(),
            "Dimension schema built"
        );
        Ok(graph)
    }
}
