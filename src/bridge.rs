//! Conversion between a [`GraphCollection`] and [`ExchangeGraph`]s, and the directory-level
//! import and export built on it.
use crate::collection::GraphCollection;
use crate::graph::{AttrValue, Attributes, EdgeKey, ExchangeGraph};
use crate::graphml::{read_graphml_file, write_graphml_file};
use crate::HgcError;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension given to exported graph files. Files with this extension or `graphml` are
/// picked up on import.
pub const GRAPH_EXTENSION: &str = "gml";
const IMPORT_EXTENSIONS: [&str; 2] = [GRAPH_EXTENSION, "graphml"];

pub const DEFAULT_NODE_LABEL_KEY: &str = "hgc-node-label";
pub const DEFAULT_EDGE_LABEL_KEY: &str = "hgc-edge-label";

/// Attribute keys holding node and edge labels in exchange graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelKeys {
    pub node: String,
    pub edge: String,
}

impl LabelKeys {
    pub fn new(node: impl Into<String>, edge: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            edge: edge.into(),
        }
    }
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_LABEL_KEY, DEFAULT_EDGE_LABEL_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ElementKind {
    Node,
    Edge,
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Label keys that were absent during a batch of pushes, per element kind, together with
/// how many elements were defaulted.
#[derive(Debug, Default)]
struct MissingLabels {
    keys: BTreeSet<(ElementKind, String)>,
    defaulted: usize,
}

impl MissingLabels {
    fn record(&mut self, kind: ElementKind, key: &str) {
        self.keys.insert((kind, key.to_string()));
        self.defaulted += 1;
    }

    fn report(&self) {
        if self.keys.is_empty() {
            return;
        }
        let keys = self
            .keys
            .iter()
            .map(|(kind, key)| format!("{kind} attribute \"{key}\""))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            "Graph format warning: {keys} missing on {} element(s); labels defaulted to 0. \
            Set the matching label key if the graphs use another attribute name.",
            self.defaulted
        );
    }
}

struct ResolvedGraph {
    nodes: Vec<i64>,
    edges: Vec<(usize, usize, f64)>,
}

/// Pushes one exchange graph into the collection under `name` and reinitializes the
/// collection. Node ids are the nodes' insertion positions in `graph`.
///
/// Missing label attributes default to 0 and are reported in a single warning. Labels
/// that are present but not numeric fail the push, in which case nothing is added.
///
/// # Returns
/// * The id of the new graph in the collection.
pub fn push_graph(
    collection: &mut dyn GraphCollection,
    graph: &ExchangeGraph,
    name: &str,
    keys: &LabelKeys,
) -> Result<usize, HgcError> {
    let mut missing = MissingLabels::default();
    let id = push_into(collection, graph, name, keys, &mut missing)?;
    collection.reinitialize()?;
    missing.report();
    Ok(id)
}

fn push_into(
    collection: &mut dyn GraphCollection,
    graph: &ExchangeGraph,
    name: &str,
    keys: &LabelKeys,
    missing: &mut MissingLabels,
) -> Result<usize, HgcError> {
    let resolved = resolve_labels(graph, name, keys, missing)?;
    let id = collection.add_graph(name);
    for (node_id, label) in resolved.nodes.into_iter().enumerate() {
        collection.add_node(id, node_id, label)?;
    }
    for (from, to, label) in resolved.edges {
        collection.add_edge(id, from, to, label)?;
    }
    debug!(graph = name, id, "pushed graph");
    Ok(id)
}

fn resolve_labels(
    graph: &ExchangeGraph,
    name: &str,
    keys: &LabelKeys,
    missing: &mut MissingLabels,
) -> Result<ResolvedGraph, HgcError> {
    let mut nodes = Vec::with_capacity(graph.node_count());
    for (node_id, attributes) in graph.nodes() {
        let label = match attributes.get(&keys.node) {
            None => {
                missing.record(ElementKind::Node, &keys.node);
                0
            }
            Some(value) => value
                .to_int()
                .ok_or_else(|| invalid_value(name, format!("node {node_id}"), &keys.node, value))?,
        };
        nodes.push(label);
    }

    let edge_keys = graph.edge_keys();
    let triples = edge_keys.first().is_some_and(|key| key.len() == 3);
    let mut edges = Vec::with_capacity(edge_keys.len());
    for key in &edge_keys {
        let (source, target) = key.endpoints();
        let lookup = if triples {
            EdgeKey::Triple(source.to_string(), target.to_string(), 0)
        } else {
            EdgeKey::Pair(source.to_string(), target.to_string())
        };
        let attributes = graph.edge_attributes(&lookup);
        let label = match attributes.and_then(|attributes| attributes.get(&keys.edge)) {
            None => {
                missing.record(ElementKind::Edge, &keys.edge);
                0.0
            }
            Some(value) => value.to_float().ok_or_else(|| {
                invalid_value(name, format!("edge ({source}, {target})"), &keys.edge, value)
            })?,
        };
        let (Some(from), Some(to)) = (graph.node_position(source), graph.node_position(target))
        else {
            return Err(HgcError::UnknownEntity(format!(
                "edge ({source}, {target}) of graph \"{name}\" has an endpoint outside the graph"
            )));
        };
        edges.push((from, to, label));
    }
    Ok(ResolvedGraph { nodes, edges })
}

fn invalid_value(graph: &str, element: String, key: &str, value: &AttrValue) -> HgcError {
    HgcError::InvalidAttributeValue {
        graph: graph.to_string(),
        element,
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Builds the exchange form of one graph of the collection: integer node labels under
/// `keys.node` and float edge labels under `keys.edge` for every adjacent pair.
pub fn pull_graph(
    collection: &dyn GraphCollection,
    graph_id: usize,
    keys: &LabelKeys,
) -> Result<ExchangeGraph, HgcError> {
    let data = collection.graph(graph_id)?;
    let mut graph = ExchangeGraph::new();
    for (node_id, label) in data.node_labels.iter().enumerate() {
        graph.add_node(
            node_id.to_string(),
            Attributes::from([(keys.node.clone(), AttrValue::Int(*label))]),
        );
    }
    for (i, row) in data.adjacency.iter().enumerate() {
        for (j, &adjacent) in row.iter().enumerate().skip(i) {
            if !adjacent {
                continue;
            }
            let label = data.edge_labels.get(&(i, j)).copied().unwrap_or_default();
            graph.add_edge(
                i.to_string(),
                j.to_string(),
                Attributes::from([(keys.edge.clone(), AttrValue::Float(label))]),
            );
        }
    }
    Ok(graph)
}

/// Writes every graph of the collection to `<out_dir>/export/<graph name>.gml`, creating
/// the directory when needed.
///
/// # Returns
/// * The written paths, in graph id order.
pub fn export_collection(
    collection: &dyn GraphCollection,
    out_dir: impl AsRef<Path>,
    keys: &LabelKeys,
) -> Result<Vec<PathBuf>, HgcError> {
    let export_dir = out_dir.as_ref().join("export");
    fs::create_dir_all(&export_dir)?;
    let mut written = Vec::with_capacity(collection.graph_count());
    for graph_id in 0..collection.graph_count() {
        let name = collection.graph_name(graph_id)?;
        let path = export_dir.join(format!("{name}.{GRAPH_EXTENSION}"));
        write_graphml_file(&pull_graph(collection, graph_id, keys)?, &path)?;
        written.push(path);
    }
    info!("Exported {} graph(s) to {}", written.len(), export_dir.display());
    Ok(written)
}

/// Pushes every graph file in `dir` into the collection, in file name order. A graph is
/// named after its file name up to the last `.`.
///
/// # Returns
/// * The ids of the imported graphs.
pub fn import_directory(
    collection: &mut dyn GraphCollection,
    dir: impl AsRef<Path>,
    keys: &LabelKeys,
) -> Result<Vec<usize>, HgcError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| HgcError::unreadable(dir, e))? {
        let path = entry.map_err(|e| HgcError::unreadable(dir, e))?.path();
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMPORT_EXTENSIONS.contains(&ext));
        if recognized && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut missing = MissingLabels::default();
    let mut ids = Vec::with_capacity(files.len());
    for path in &files {
        let graph = read_graphml_file(path)?;
        ids.push(push_into(collection, &graph, &graph_name(path), keys, &mut missing)?);
    }
    collection.reinitialize()?;
    missing.report();
    info!("Imported {} graph(s) from {}", ids.len(), dir.display());
    Ok(ids)
}

fn graph_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.rfind('.') {
        Some(dot) => file_name[..dot].to_string(),
        None => file_name,
    }
}
