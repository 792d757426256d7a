//! Incrementally indexed catalog of forecast resources.
//!
//! Resources (rendered fields, tiles, files) are addressed by one variable
//! per dimension: model, run, field, level and so on. The dimensions form a
//! directed acyclic graph declared once at startup ([`SchemaConfig`]). The
//! [`Catalog`] stores every resource at the deepest dimension its variables
//! reach and answers questions such as "which runs exist for model GFS and
//! field temperature". A [`Selector`] turns a partial wish into a complete,
//! resource-backed assignment, and the [`Viewer`] keeps several selectors
//! and a shared [`Timeline`] in step.

pub mod error;
pub mod events;
pub mod graph;
pub mod index;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod search;
pub mod selector;
pub mod time;
pub mod timeline;
pub mod tree;
pub mod variable;
pub mod viewer;

pub use error::{CatalogError, CatalogResult};
pub use events::{CatalogEvent, ListenerId, Observers, SelectionEvent};
pub use graph::{DimensionGraph, DimensionNode, NodeId};
pub use index::NodeIndex;
pub use registry::{Catalog, CatalogStats};
pub use resource::{Resource, ResourceBuilder};
pub use schema::{CollectionConfig, SchemaConfig};
pub use search::{first_success, SearchProblem};
pub use selector::{DefaultPolicy, LatestFirstPolicy, SelectionPolicy, Selector, SelectorConfig};
pub use time::{parse_iso8601, TimeParseError, ValidTime};
pub use timeline::{TimeAxis, Timeline};
pub use tree::{PathTree, TreeId};
pub use variable::{Variable, VariableCollection};
pub use viewer::Viewer;
