//! Dimension catalog command-line front end.
//!
//! Builds a catalog from a YAML dimension schema and a YAML resource
//! inventory, then answers an availability query and/or runs a selection,
//! printing the result as JSON on stdout. Logs go to stderr.

mod inventory;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use dimension_catalog::{
    parse_iso8601, Catalog, CatalogStats, DimensionGraph, Resource, SchemaConfig, Selector,
    SelectorConfig, Variable, Viewer,
};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "catalog-cli")]
#[command(about = "Query a forecast resource catalog")]
struct Args {
    /// Dimension schema file (YAML)
    #[arg(short, long, env = "CATALOG_SCHEMA")]
    schema: PathBuf,

    /// Resource inventory file (YAML)
    #[arg(short, long, env = "CATALOG_INVENTORY")]
    inventory: PathBuf,

    /// Requested variable as collection=value (repeatable)
    #[arg(long = "select", value_parser = parse_assignment)]
    select: Vec<(String, String)>,

    /// Only use the requested variables, never substitute others
    #[arg(long)]
    no_adaptive: bool,

    /// Collections that pin the timeline (comma separated)
    #[arg(long, value_delimiter = ',')]
    time_defining: Vec<String>,

    /// List the variables of this collection available for the selection
    #[arg(long)]
    available: Option<String>,

    /// Instant to show (ISO 8601), defaults to the first available one
    #[arg(long)]
    time: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize)]
struct Report {
    stats: CatalogStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<Availability>,
    selection: SelectionReport,
}

#[derive(Debug, Serialize)]
struct Availability {
    collection: String,
    variables: Vec<Variable>,
}

#[derive(Debug, Serialize)]
struct SelectionReport {
    selected: Vec<SelectedVariable>,
    times: Vec<DateTime<Utc>>,
    selected_time: Option<DateTime<Utc>>,
    visible: Option<Resource>,
}

#[derive(Debug, Serialize)]
struct SelectedVariable {
    collection: String,
    id: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let report = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((collection, value)) if !collection.trim().is_empty() && !value.trim().is_empty() => {
            Ok((collection.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected collection=value, got '{}'", s)),
    }
}

fn run(args: &Args) -> Result<Report> {
    let mut graph = SchemaConfig::load(&args.schema)
        .and_then(|config| config.build())
        .with_context(|| format!("Invalid schema: {}", args.schema.display()))?;

    let entries = inventory::load_inventory(&args.inventory)?;
    let resources = inventory::to_resources(&entries, &mut graph)?;
    let wanted = resolve_selection(&graph, &args.select)?;

    let mut catalog = Catalog::new(graph);
    let added = catalog.append(resources);
    if added < entries.len() {
        warn!(
            entries = entries.len(),
            added,
            "Some inventory entries were duplicates or fit no dimension path"
        );
    }
    info!(resources = catalog.len(), "Catalog loaded");

    let available = match &args.available {
        Some(collection) => {
            let node = catalog
                .get_node_by_variable_collection(collection)
                .with_context(|| format!("Unknown collection: {}", collection))?;
            Some(Availability {
                collection: collection.clone(),
                variables: catalog.get_available_variables(node, &wanted),
            })
        }
        None => None,
    };

    let mut config = SelectorConfig::from_env();
    if args.no_adaptive {
        config.adaptive = false;
    }
    if !args.time_defining.is_empty() {
        config.time_defining = args.time_defining.clone();
    }

    let stats = catalog.stats();
    let mut viewer = Viewer::from_catalog(catalog);
    let mut selector = Selector::new(config);
    selector.set_display_variables(wanted);
    let idx = viewer.add_container(selector);

    if let Some(time) = &args.time {
        let time = parse_iso8601(time).with_context(|| format!("Invalid --time: {}", time))?;
        if !viewer.select_time(time) {
            warn!(%time, "Requested time is not on the timeline");
        }
    }

    let container = viewer
        .container(idx)
        .context("Selector was not registered")?;
    let graph = viewer.catalog().graph();
    let selection = SelectionReport {
        selected: container
            .selected_variables()
            .iter()
            .map(|v| SelectedVariable {
                collection: graph.collection_id(v.collection()).to_string(),
                id: v.id().to_string(),
            })
            .collect(),
        times: container.available_times().to_vec(),
        selected_time: container.selected_time(),
        visible: container.visible_resource().map(|r| (**r).clone()),
    };

    Ok(Report {
        stats,
        available,
        selection,
    })
}

/// Map `--select` pairs to variables.
///
/// An unknown collection is an error. An unknown value is passed through
/// without being added to its collection, so the selection finds no
/// assignment for it.
fn resolve_selection(graph: &DimensionGraph, pairs: &[(String, String)]) -> Result<Vec<Variable>> {
    let mut variables = Vec::with_capacity(pairs.len());
    for (collection, value) in pairs {
        let Some(node) = graph.node_by_collection_id(collection) else {
            bail!("Unknown collection in --select: {}", collection);
        };
        let variable = graph.variable(node, value).unwrap_or_else(|| {
            warn!(collection = %collection, value = %value, "Requested variable is not in the catalog");
            Variable::new(node, value.as_str())
        });
        variables.push(variable);
    }
    Ok(variables)
}
